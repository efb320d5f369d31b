use phaseguard_phasing::{ValidationError, VotingModelKind};
use phaseguard_types::{AccountId, Height, HoldingId};
use thiserror::Error;

/// A transaction's phasing does not satisfy its sender's control.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ControlViolation {
    #[error("account {account} is under phasing-only control but the transaction is not phased")]
    NotPhased { account: AccountId },

    #[error("voting model {found} does not match the controlled model {expected}")]
    VotingModelMismatch {
        expected: VotingModelKind,
        found: VotingModelKind,
    },

    #[error("quorum {found} is below the controlled quorum {required}")]
    QuorumTooLow { required: u64, found: u64 },

    #[error("min balance {found} is below the controlled min balance {required}")]
    MinBalanceTooLow { required: u64, found: u64 },

    #[error("holding {found} does not match the controlled holding {expected}")]
    HoldingMismatch { expected: HoldingId, found: HoldingId },

    #[error("whitelist is missing controlled account {missing}")]
    WhitelistNotSuperset { missing: AccountId },
}

impl ControlViolation {
    /// Stable error code surfaced at the submission boundary.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotPhased { .. } => 201,
            Self::VotingModelMismatch { .. } => 202,
            Self::QuorumTooLow { .. } => 203,
            Self::MinBalanceTooLow { .. } => 204,
            Self::HoldingMismatch { .. } => 205,
            Self::WhitelistNotSuperset { .. } => 206,
        }
    }
}

/// Reasons a transaction is refused by the control layer.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("invalid phasing parameters: {0}")]
    Validation(#[from] ValidationError),

    #[error("control violation: {0}")]
    Violation(#[from] ControlViolation),

    #[error("account {account} already updated its control at height {height}")]
    DuplicateControlUpdate { account: AccountId, height: Height },
}

impl ControlError {
    /// Stable error code surfaced at the submission boundary.
    pub fn code(&self) -> u16 {
        match self {
            Self::Validation(e) => e.code(),
            Self::Violation(v) => v.code(),
            Self::DuplicateControlUpdate { .. } => 300,
        }
    }
}
