//! Account control storage trait.

use crate::StoreError;
use phaseguard_types::AccountId;

/// One persisted change to the `account → phasing params` table.
///
/// `data` holds the serialized params; `None` deletes the row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlRow {
    pub account: AccountId,
    pub data: Option<Vec<u8>>,
}

/// Read side of the phasing-only account control table.
///
/// Rows are written through [`HeightStore::commit_height`](crate::HeightStore::commit_height).
pub trait ControlStore {
    /// All stored controls, in ascending account order.
    fn iter_controls(&self) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError>;
}

impl<T: ControlStore + ?Sized> ControlStore for &T {
    fn iter_controls(&self) -> Result<Vec<(AccountId, Vec<u8>)>, StoreError> {
        (**self).iter_controls()
    }
}
