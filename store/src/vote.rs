//! Phasing vote storage trait.

use crate::StoreError;
use phaseguard_types::{AccountId, Height, TransactionId};
use serde::{Deserialize, Serialize};

/// A persisted `(voter, height cast)` row under a transaction id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub transaction: TransactionId,
    pub voter: AccountId,
    pub height_cast: Height,
}

/// Read side of the append-only phasing vote table.
pub trait VoteStore {
    /// All votes cast on a transaction, in append order.
    fn get_votes(&self, transaction: &TransactionId) -> Result<Vec<VoteRecord>, StoreError>;
}

impl<T: VoteStore + ?Sized> VoteStore for &T {
    fn get_votes(&self, transaction: &TransactionId) -> Result<Vec<VoteRecord>, StoreError> {
        (**self).get_votes(transaction)
    }
}
