use crate::model::VotingModelKind;
use phaseguard_types::{AccountId, Height};
use thiserror::Error;

/// Malformed or inconsistent phasing parameters. The transaction carrying
/// them is never admitted.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid voting model code {0}")]
    InvalidVotingModel(i8),

    #[error("quorum is required for voting model {0}")]
    MissingQuorum(VotingModelKind),

    #[error("quorum {quorum} out of range 1..={max}")]
    QuorumOutOfRange { quorum: i64, max: u64 },

    #[error("holding id is required for voting model {0}")]
    MissingHolding(VotingModelKind),

    #[error("holding id is not allowed for voting model {0}")]
    UnexpectedHolding(VotingModelKind),

    #[error(
        "min balance model {code} with min balance {min_balance} is invalid for voting model {voting}"
    )]
    InvalidMinBalanceModel {
        voting: VotingModelKind,
        code: i8,
        min_balance: i64,
    },

    #[error("whitelist has {len} entries, at most {max} allowed")]
    WhitelistTooLarge { len: usize, max: usize },

    #[error("account {0} appears more than once in the whitelist")]
    DuplicateWhitelistEntry(AccountId),

    #[error("whitelist contains the reserved zero account id")]
    InvalidWhitelistEntry,

    #[error("whitelist is not allowed for voting model {0}")]
    IncompatibleWhitelistWithModel(VotingModelKind),

    #[error("finality height {finality} outside {min}..={max}")]
    InvalidFinalityHeight {
        finality: Height,
        min: Height,
        max: Height,
    },
}

impl ValidationError {
    /// Stable error code surfaced at the submission boundary.
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidVotingModel(_) => 101,
            Self::MissingQuorum(_) => 102,
            Self::QuorumOutOfRange { .. } => 103,
            Self::MissingHolding(_) => 104,
            Self::UnexpectedHolding(_) => 105,
            Self::InvalidMinBalanceModel { .. } => 106,
            Self::WhitelistTooLarge { .. } => 107,
            Self::DuplicateWhitelistEntry(_) => 108,
            Self::InvalidWhitelistEntry => 109,
            Self::IncompatibleWhitelistWithModel(_) => 110,
            Self::InvalidFinalityHeight { .. } => 111,
        }
    }
}
