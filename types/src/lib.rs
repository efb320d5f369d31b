//! Fundamental types for phaseguard.
//!
//! This crate defines the primitives shared across every other crate in the
//! workspace: account, holding and transaction identifiers, block heights and
//! native amount bounds.

pub mod amount;
pub mod height;
pub mod id;

pub use amount::MAX_BALANCE;
pub use height::Height;
pub use id::{AccountId, HoldingId, TransactionId};
