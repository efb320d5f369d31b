//! Read-only chain state accessor.

use phaseguard_types::{AccountId, Height, HoldingId};
use thiserror::Error;

/// The accessor could not answer for the requested height.
///
/// Evaluation of whatever depended on the answer is deferred to the next
/// height; it is never treated as a failed vote.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StateAccessError {
    #[error("balance state unavailable at height {height}")]
    Unavailable { height: Height },

    #[error("holding {holding} state unavailable at height {height}")]
    HoldingUnavailable { holding: HoldingId, height: Height },
}

impl StateAccessError {
    /// Stable error code surfaced at the submission boundary.
    pub fn code(&self) -> u16 {
        match self {
            Self::Unavailable { .. } => 400,
            Self::HoldingUnavailable { .. } => 401,
        }
    }
}

/// Balances and account existence as seen at a given height.
pub trait StateAccessor {
    /// Native balance of `account` at `height`.
    fn balance(&self, account: AccountId, height: Height) -> Result<u64, StateAccessError>;

    /// Balance of `holding` held by `account` at `height`.
    fn holding_balance(
        &self,
        holding: HoldingId,
        account: AccountId,
        height: Height,
    ) -> Result<u64, StateAccessError>;

    /// Whether `account` exists on chain.
    fn account_exists(&self, account: AccountId) -> bool;
}

impl<T: StateAccessor + ?Sized> StateAccessor for &T {
    fn balance(&self, account: AccountId, height: Height) -> Result<u64, StateAccessError> {
        (**self).balance(account, height)
    }

    fn holding_balance(
        &self,
        holding: HoldingId,
        account: AccountId,
        height: Height,
    ) -> Result<u64, StateAccessError> {
        (**self).holding_balance(holding, account, height)
    }

    fn account_exists(&self, account: AccountId) -> bool {
        (**self).account_exists(account)
    }
}
