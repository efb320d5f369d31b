//! Voting model and min-balance model kinds.
//!
//! The kinds carry the stable byte codes used on the wire and at the
//! boundary API. [`VotingModel`] is the validated form, carrying the holding
//! id for the models that are weighted by a holding.

use phaseguard_types::HoldingId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How votes on a phased transaction are weighted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VotingModelKind {
    /// No phasing. As a control this clears the account's restriction.
    None,
    /// One account, one vote.
    Account,
    /// Weighted by native balance.
    Balance,
    /// Weighted by balance of an asset.
    Asset,
    /// Weighted by balance of a currency.
    Currency,
}

impl VotingModelKind {
    pub fn code(&self) -> i8 {
        match self {
            Self::None => -1,
            Self::Account => 0,
            Self::Balance => 1,
            Self::Asset => 2,
            Self::Currency => 3,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(Self::None),
            0 => Some(Self::Account),
            1 => Some(Self::Balance),
            2 => Some(Self::Asset),
            3 => Some(Self::Currency),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Account => "ACCOUNT",
            Self::Balance => "BALANCE",
            Self::Asset => "ASSET",
            Self::Currency => "CURRENCY",
        }
    }

    /// Whether the model is weighted by a holding and so needs a holding id.
    pub fn requires_holding(&self) -> bool {
        matches!(self, Self::Asset | Self::Currency)
    }

    /// The only min-balance model (besides NONE) this voting model accepts.
    pub fn implied_min_balance_model(&self) -> MinBalanceModelKind {
        match self {
            Self::None => MinBalanceModelKind::None,
            Self::Account | Self::Balance => MinBalanceModelKind::Balance,
            Self::Asset => MinBalanceModelKind::Asset,
            Self::Currency => MinBalanceModelKind::Currency,
        }
    }
}

impl fmt::Display for VotingModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.as_str(), self.code())
    }
}

/// Which balance a voter must hold at least `min_balance` of to be eligible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MinBalanceModelKind {
    None,
    Balance,
    Asset,
    Currency,
}

impl MinBalanceModelKind {
    pub fn code(&self) -> i8 {
        match self {
            Self::None => 0,
            Self::Balance => 1,
            Self::Asset => 2,
            Self::Currency => 3,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Balance),
            2 => Some(Self::Asset),
            3 => Some(Self::Currency),
            _ => None,
        }
    }
}

impl fmt::Display for MinBalanceModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Balance => "BALANCE",
            Self::Asset => "ASSET",
            Self::Currency => "CURRENCY",
        };
        write!(f, "{}({})", name, self.code())
    }
}

/// A validated voting model with its per-model data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VotingModel {
    None,
    Account,
    Balance,
    Asset(HoldingId),
    Currency(HoldingId),
}

impl VotingModel {
    pub fn kind(&self) -> VotingModelKind {
        match self {
            Self::None => VotingModelKind::None,
            Self::Account => VotingModelKind::Account,
            Self::Balance => VotingModelKind::Balance,
            Self::Asset(_) => VotingModelKind::Asset,
            Self::Currency(_) => VotingModelKind::Currency,
        }
    }

    pub fn holding(&self) -> Option<HoldingId> {
        match self {
            Self::Asset(holding) | Self::Currency(holding) => Some(*holding),
            Self::None | Self::Account | Self::Balance => None,
        }
    }
}
