//! Phased transaction storage trait.

use crate::StoreError;
use phaseguard_types::TransactionId;

/// A persisted phased transaction, pending or finished.
///
/// `data` is opaque to the store; the node owns its encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhasedRow {
    pub transaction: TransactionId,
    pub data: Vec<u8>,
}

/// Read side of the phased transaction table.
pub trait PhasedStore {
    /// Every stored phased transaction, in ascending id order.
    fn iter_phased(&self) -> Result<Vec<PhasedRow>, StoreError>;
}

impl<T: PhasedStore + ?Sized> PhasedStore for &T {
    fn iter_phased(&self) -> Result<Vec<PhasedRow>, StoreError> {
        (**self).iter_phased()
    }
}
