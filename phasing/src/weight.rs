//! Vote weight per voting model.
//!
//! | model | eligible voter | weight |
//! |---|---|---|
//! | ACCOUNT | whitelist member, or any existing account when no whitelist | 1 |
//! | BALANCE | native balance ≥ min balance | native balance |
//! | ASSET / CURRENCY | holding balance ≥ min balance | holding balance |
//!
//! A non-empty whitelist restricts every model. Balances are read at the
//! evaluation height, never cached from the height a vote was cast.

use crate::model::VotingModel;
use crate::params::PhasingParams;
use phaseguard_store::{StateAccessError, StateAccessor};
use phaseguard_types::{AccountId, Height};

/// Weight `voter` contributes under `params` at `height`; zero when ineligible.
pub fn voter_weight<S: StateAccessor>(
    params: &PhasingParams,
    voter: AccountId,
    state: &S,
    height: Height,
) -> Result<u64, StateAccessError> {
    let whitelist = params.whitelist();
    if !whitelist.is_empty() && !whitelist.contains(voter) {
        return Ok(0);
    }
    let min_balance = params.min_balance_threshold();

    match params.voting_model() {
        VotingModel::None => Ok(0),
        VotingModel::Account => {
            if whitelist.is_empty() && !state.account_exists(voter) {
                return Ok(0);
            }
            if let Some(min) = min_balance {
                if state.balance(voter, height)? < min {
                    return Ok(0);
                }
            }
            Ok(1)
        }
        VotingModel::Balance => Ok(above_threshold(
            state.balance(voter, height)?,
            min_balance,
        )),
        VotingModel::Asset(holding) | VotingModel::Currency(holding) => Ok(above_threshold(
            state.holding_balance(holding, voter, height)?,
            min_balance,
        )),
    }
}

fn above_threshold(balance: u64, min_balance: Option<u64>) -> u64 {
    match min_balance {
        Some(min) if balance < min => 0,
        _ => balance,
    }
}
