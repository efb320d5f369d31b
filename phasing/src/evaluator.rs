//! The phasing state machine: PENDING → APPROVED | EXPIRED.
//!
//! A pending transaction is re-evaluated at every height. Cumulative
//! eligible weight is recomputed from scratch each time, so a voter whose
//! balance drops stops counting at the next evaluation. Both terminal states
//! are final; evaluating a terminal transaction changes nothing.

use crate::params::PhasingParams;
use crate::vote::VoteTally;
use crate::weight::voter_weight;
use phaseguard_store::{StateAccessError, StateAccessor};
use phaseguard_types::{AccountId, Height, TransactionId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a phased transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhasingState {
    /// Waiting for quorum.
    Pending,
    /// Quorum was reached at `at`; the transaction may apply.
    Approved { at: Height },
    /// Finality height passed without quorum.
    Expired { at: Height },
}

impl PhasingState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A phased transaction waiting on its vote. Serializable with its state so
/// a node can persist it across restarts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPhasedTransaction {
    pub id: TransactionId,
    pub sender: AccountId,
    pub params: PhasingParams,
    pub finality_height: Height,
    state: PhasingState,
}

impl PendingPhasedTransaction {
    pub fn new(
        id: TransactionId,
        sender: AccountId,
        params: PhasingParams,
        finality_height: Height,
    ) -> Self {
        Self {
            id,
            sender,
            params,
            finality_height,
            state: PhasingState::Pending,
        }
    }

    pub fn state(&self) -> PhasingState {
        self.state
    }
}

/// Outcome of one evaluation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub state: PhasingState,
    /// Cumulative eligible weight counted in this pass (zero if the
    /// transaction was already terminal).
    pub weight: u64,
    /// Whether this pass moved the transaction out of PENDING.
    pub transitioned: bool,
}

/// Tallies votes against a transaction's voting model.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuorumEvaluator;

impl QuorumEvaluator {
    /// Cumulative eligible weight of the votes cast up to `height`.
    pub fn tally<S: StateAccessor>(
        &self,
        params: &PhasingParams,
        votes: &VoteTally,
        state: &S,
        height: Height,
    ) -> Result<u64, StateAccessError> {
        let mut total = 0u64;
        for voter in votes.voters_as_of(height) {
            total = total.saturating_add(voter_weight(params, voter, state, height)?);
        }
        Ok(total)
    }

    /// Evaluate `tx` at `height`.
    ///
    /// Approval is checked first, including at the finality height itself.
    /// On a [`StateAccessError`] the transaction stays PENDING and the caller
    /// retries at the next height, even past finality.
    pub fn evaluate<S: StateAccessor>(
        &self,
        tx: &mut PendingPhasedTransaction,
        votes: &VoteTally,
        state: &S,
        height: Height,
    ) -> Result<Evaluation, StateAccessError> {
        if tx.state.is_terminal() {
            return Ok(Evaluation {
                state: tx.state,
                weight: 0,
                transitioned: false,
            });
        }

        let weight = self.tally(&tx.params, votes, state, height)?;
        let next = if weight >= tx.params.quorum() {
            PhasingState::Approved { at: height }
        } else if height >= tx.finality_height {
            PhasingState::Expired { at: height }
        } else {
            PhasingState::Pending
        };
        tx.state = next;

        Ok(Evaluation {
            state: next,
            weight,
            transitioned: next.is_terminal(),
        })
    }
}
