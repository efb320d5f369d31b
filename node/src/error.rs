use phaseguard_control::ControlError;
use phaseguard_phasing::PhasingState;
use phaseguard_store::StoreError;
use phaseguard_types::{Height, TransactionId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("height {height} does not follow the last processed height {last}")]
    HeightOutOfOrder { last: Height, height: Height },
}

/// Why a transaction in a block was refused. Refused transactions have no effect.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransactionRejection {
    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("transaction {0} is already known")]
    Duplicate(TransactionId),
}

impl TransactionRejection {
    /// Stable error code surfaced at the submission boundary.
    pub fn code(&self) -> u16 {
        match self {
            Self::Control(e) => e.code(),
            Self::Duplicate(_) => 502,
        }
    }
}

/// Why a vote in a block was refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum VoteRejected {
    #[error("transaction {transaction} is not a pending phased transaction")]
    UnknownTransaction { transaction: TransactionId },

    #[error("transaction {transaction} is already final ({state:?})")]
    TransactionFinal {
        transaction: TransactionId,
        state: PhasingState,
    },

    #[error("vote cast at {cast} included at height {height}")]
    WrongHeight { cast: Height, height: Height },
}

impl VoteRejected {
    pub fn code(&self) -> u16 {
        match self {
            Self::UnknownTransaction { .. } => 500,
            Self::TransactionFinal { .. } => 501,
            Self::WrongHeight { .. } => 503,
        }
    }
}
