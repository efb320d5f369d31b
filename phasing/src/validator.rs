//! Building validated [`PhasingParams`] from raw fields.
//!
//! The checks run in a fixed order so that a given bad input always fails
//! with the same error:
//! 1. whitelist structure (size bound, zero ids, duplicates)
//! 2. voting model and min-balance model codes
//! 3. the NONE model carries nothing else
//! 4. quorum presence and range
//! 5. holding matrix
//! 6. min-balance matrix

use crate::error::ValidationError;
use crate::model::{MinBalanceModelKind, VotingModel, VotingModelKind};
use crate::params::PhasingParams;
use crate::whitelist::Whitelist;
use phaseguard_types::{AccountId, Height, HoldingId, MAX_BALANCE};
use serde::{Deserialize, Serialize};

/// Largest quorum accepted for any voting model.
pub const MAX_QUORUM: u64 = MAX_BALANCE;

/// Unvalidated phasing fields, as they arrive in an attachment or phasing clause.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPhasingFields {
    pub voting_model: i8,
    #[serde(default)]
    pub quorum: i64,
    #[serde(default)]
    pub min_balance: i64,
    #[serde(default)]
    pub min_balance_model: i8,
    /// Asset or currency id. Zero means absent.
    #[serde(default)]
    pub holding: Option<u64>,
    #[serde(default)]
    pub whitelisted: Vec<u64>,
}

impl Default for RawPhasingFields {
    fn default() -> Self {
        Self {
            voting_model: VotingModelKind::None.code(),
            quorum: 0,
            min_balance: 0,
            min_balance_model: MinBalanceModelKind::None.code(),
            holding: None,
            whitelisted: Vec::new(),
        }
    }
}

/// The `control*` request fields of a set-phasing-only call.
///
/// `controlWhitelisted` may repeat; it decodes as a list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFields {
    #[serde(rename = "controlVotingModel")]
    pub voting_model: i8,
    #[serde(rename = "controlQuorum", default)]
    pub quorum: i64,
    #[serde(rename = "controlMinBalance", default)]
    pub min_balance: i64,
    #[serde(rename = "controlMinBalanceModel", default)]
    pub min_balance_model: i8,
    #[serde(rename = "controlHolding", default)]
    pub holding: Option<u64>,
    #[serde(rename = "controlWhitelisted", default)]
    pub whitelisted: Vec<u64>,
}

impl From<ControlFields> for RawPhasingFields {
    fn from(fields: ControlFields) -> Self {
        Self {
            voting_model: fields.voting_model,
            quorum: fields.quorum,
            min_balance: fields.min_balance,
            min_balance_model: fields.min_balance_model,
            holding: fields.holding,
            whitelisted: fields.whitelisted,
        }
    }
}

impl TryFrom<RawPhasingFields> for PhasingParams {
    type Error = ValidationError;

    fn try_from(raw: RawPhasingFields) -> Result<Self, Self::Error> {
        validate(&raw)
    }
}

/// Validate raw fields into [`PhasingParams`].
pub fn validate(raw: &RawPhasingFields) -> Result<PhasingParams, ValidationError> {
    let whitelist = Whitelist::try_from_ids(raw.whitelisted.iter().copied().map(AccountId::new))?;

    let kind = VotingModelKind::from_code(raw.voting_model)
        .ok_or(ValidationError::InvalidVotingModel(raw.voting_model))?;
    let invalid_min_balance = || ValidationError::InvalidMinBalanceModel {
        voting: kind,
        code: raw.min_balance_model,
        min_balance: raw.min_balance,
    };
    let min_balance_model =
        MinBalanceModelKind::from_code(raw.min_balance_model).ok_or_else(invalid_min_balance)?;
    let holding = raw.holding.filter(|h| *h != 0).map(HoldingId::new);

    if kind == VotingModelKind::None {
        if raw.quorum != 0 {
            return Err(ValidationError::QuorumOutOfRange {
                quorum: raw.quorum,
                max: 0,
            });
        }
        if raw.min_balance != 0 || min_balance_model != MinBalanceModelKind::None {
            return Err(invalid_min_balance());
        }
        if holding.is_some() {
            return Err(ValidationError::UnexpectedHolding(kind));
        }
        if !whitelist.is_empty() {
            return Err(ValidationError::IncompatibleWhitelistWithModel(kind));
        }
        return Ok(PhasingParams::none());
    }

    let quorum = validate_quorum(kind, raw.quorum, &whitelist)?;

    let voting = match (kind, holding) {
        (VotingModelKind::Account, None) => VotingModel::Account,
        (VotingModelKind::Balance, None) => VotingModel::Balance,
        (VotingModelKind::Asset, Some(h)) => VotingModel::Asset(h),
        (VotingModelKind::Currency, Some(h)) => VotingModel::Currency(h),
        (VotingModelKind::Asset | VotingModelKind::Currency, None) => {
            return Err(ValidationError::MissingHolding(kind));
        }
        (VotingModelKind::None | VotingModelKind::Account | VotingModelKind::Balance, Some(_)) => {
            return Err(ValidationError::UnexpectedHolding(kind));
        }
        (VotingModelKind::None, None) => return Ok(PhasingParams::none()),
    };

    let min_balance = if min_balance_model == MinBalanceModelKind::None {
        if raw.min_balance != 0 {
            return Err(invalid_min_balance());
        }
        None
    } else {
        if min_balance_model != kind.implied_min_balance_model() || raw.min_balance <= 0 {
            return Err(invalid_min_balance());
        }
        Some(raw.min_balance as u64)
    };

    Ok(PhasingParams::from_parts(voting, quorum, min_balance, whitelist))
}

fn validate_quorum(
    kind: VotingModelKind,
    quorum: i64,
    whitelist: &Whitelist,
) -> Result<u64, ValidationError> {
    if quorum == 0 {
        return Err(ValidationError::MissingQuorum(kind));
    }
    if quorum < 0 || quorum as u64 > MAX_QUORUM {
        return Err(ValidationError::QuorumOutOfRange {
            quorum,
            max: MAX_QUORUM,
        });
    }
    // A by-account vote restricted to a whitelist can never collect more
    // votes than the whitelist has members.
    if kind == VotingModelKind::Account
        && !whitelist.is_empty()
        && quorum as u64 > whitelist.len() as u64
    {
        return Err(ValidationError::QuorumOutOfRange {
            quorum,
            max: whitelist.len() as u64,
        });
    }
    Ok(quorum as u64)
}

/// Check that a phased transaction submitted at `current` finishes within
/// `[current + min_duration, current + max_duration]`.
pub fn validate_finality(
    current: Height,
    finality: Height,
    min_duration: u32,
    max_duration: u32,
) -> Result<(), ValidationError> {
    let min = current.advance(min_duration);
    let max = current.advance(max_duration);
    if finality < min || finality > max {
        return Err(ValidationError::InvalidFinalityHeight { finality, min, max });
    }
    Ok(())
}
