//! Atomic per-height writes.
//!
//! A height touches three tables: controls, votes and phased transactions.
//! They are written together so that a crash or a failed write never
//! leaves one table ahead of the others.

use crate::{ControlRow, ControlStore, PhasedRow, PhasedStore, StoreError, VoteRecord, VoteStore};
use phaseguard_types::Height;

/// Everything one processed height persists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeightWrite {
    pub height: Height,
    /// Control upserts and deletes.
    pub controls: Vec<ControlRow>,
    /// Votes to append.
    pub votes: Vec<VoteRecord>,
    /// Phased transactions to insert or overwrite.
    pub phased: Vec<PhasedRow>,
}

/// A store that persists whole heights.
pub trait HeightStore: ControlStore + VoteStore + PhasedStore {
    /// The last height committed, if any.
    fn last_height(&self) -> Result<Option<Height>, StoreError>;

    /// Write every row of `write` and record its height, or write nothing.
    fn commit_height(&self, write: &HeightWrite) -> Result<(), StoreError>;
}

impl<T: HeightStore + ?Sized> HeightStore for &T {
    fn last_height(&self) -> Result<Option<Height>, StoreError> {
        (**self).last_height()
    }

    fn commit_height(&self, write: &HeightWrite) -> Result<(), StoreError> {
        (**self).commit_height(write)
    }
}
