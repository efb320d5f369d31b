//! Abstract state and storage traits for phaseguard.
//!
//! Chain state (balances, account existence) and persistence of control,
//! vote and phased transaction rows are owned by collaborators outside the
//! core. Every backend (a node's database, in-memory doubles for testing)
//! implements these traits; the rest of the workspace depends only on the
//! traits.

pub mod control;
pub mod error;
pub mod height;
pub mod phased;
pub mod state;
pub mod vote;

pub use control::{ControlRow, ControlStore};
pub use error::StoreError;
pub use height::{HeightStore, HeightWrite};
pub use phased::{PhasedRow, PhasedStore};
pub use state::{StateAccessError, StateAccessor};
pub use vote::{VoteRecord, VoteStore};
