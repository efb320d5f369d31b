//! Validated phasing parameters.

use crate::model::{MinBalanceModelKind, VotingModel, VotingModelKind};
use crate::validator::RawPhasingFields;
use crate::whitelist::Whitelist;
use phaseguard_types::HoldingId;
use serde::{Deserialize, Serialize};

/// Phasing parameters that passed validation.
///
/// Values are only produced by [`crate::validate`]; deserialization goes
/// through the same path, so a decoded value is always consistent:
/// - `quorum > 0` unless the model is NONE
/// - a holding id exactly for ASSET and CURRENCY
/// - a positive min balance exactly when a min-balance model is set
/// - NONE carries nothing else
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPhasingFields", into = "RawPhasingFields")]
pub struct PhasingParams {
    voting: VotingModel,
    quorum: u64,
    min_balance: Option<u64>,
    whitelist: Whitelist,
}

impl PhasingParams {
    pub(crate) fn from_parts(
        voting: VotingModel,
        quorum: u64,
        min_balance: Option<u64>,
        whitelist: Whitelist,
    ) -> Self {
        Self {
            voting,
            quorum,
            min_balance,
            whitelist,
        }
    }

    /// The NONE parameters. As a control update these clear the control.
    pub fn none() -> Self {
        Self::from_parts(VotingModel::None, 0, None, Whitelist::empty())
    }

    pub fn is_none(&self) -> bool {
        self.voting == VotingModel::None
    }

    pub fn voting_model(&self) -> VotingModel {
        self.voting
    }

    pub fn voting_model_kind(&self) -> VotingModelKind {
        self.voting.kind()
    }

    pub fn quorum(&self) -> u64 {
        self.quorum
    }

    /// Minimum balance a voter must hold, `0` when unrestricted.
    pub fn min_balance(&self) -> u64 {
        self.min_balance.unwrap_or(0)
    }

    /// Minimum balance threshold, if a min-balance model is set.
    pub fn min_balance_threshold(&self) -> Option<u64> {
        self.min_balance
    }

    pub fn min_balance_model(&self) -> MinBalanceModelKind {
        match self.min_balance {
            Some(_) => self.voting.kind().implied_min_balance_model(),
            None => MinBalanceModelKind::None,
        }
    }

    pub fn holding(&self) -> Option<HoldingId> {
        self.voting.holding()
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Encode back into raw fields. Validating the result yields `self`.
    pub fn to_raw(&self) -> RawPhasingFields {
        RawPhasingFields {
            voting_model: self.voting_model_kind().code(),
            quorum: self.quorum as i64,
            min_balance: self.min_balance() as i64,
            min_balance_model: self.min_balance_model().code(),
            holding: self.holding().map(|h| h.get()),
            whitelisted: self.whitelist.iter().map(|a| a.get()).collect(),
        }
    }
}

impl Default for PhasingParams {
    fn default() -> Self {
        Self::none()
    }
}

impl From<PhasingParams> for RawPhasingFields {
    fn from(params: PhasingParams) -> Self {
        params.to_raw()
    }
}
