//! Block height type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A block height. Heights are processed strictly in increasing order.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Height(u32);

impl Height {
    /// The genesis height.
    pub const GENESIS: Self = Self(0);

    pub const fn new(height: u32) -> Self {
        Self(height)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// The height immediately after this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// This height advanced by `blocks`, saturating at `u32::MAX`.
    pub fn advance(&self, blocks: u32) -> Self {
        Self(self.0.saturating_add(blocks))
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for Height {
    fn from(height: u32) -> Self {
        Self(height)
    }
}
