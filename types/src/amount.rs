//! Native currency amount bounds.
//!
//! Balances are plain `u64` counts of the smallest native unit. Holding
//! (asset/currency) balances use the holding's own smallest unit.

/// Number of base units in one whole native coin.
const ONE_COIN: u64 = 100_000_000;

/// Total native supply in base units. No single balance, and no quorum
/// expressed in balance units, can exceed this.
pub const MAX_BALANCE: u64 = 1_000_000_000 * ONE_COIN;
