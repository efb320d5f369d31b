//! Nullable infrastructure for deterministic testing.
//!
//! The core only reaches chain state and persistence through the traits in
//! `phaseguard-store`. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (balances per height, unavailable
//!   heights, failing writes)
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod state;
pub mod store;

pub use state::NullState;
pub use store::NullStore;
