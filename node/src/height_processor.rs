//! Per-height processing of transactions and phasing votes.
//!
//! A block is handled in five steps:
//! 1. Gate and admit each transaction in order. Unphased `SetPhasingOnly`
//!    updates are staged in the height's control batch; phased transactions
//!    are queued for registration, a phased `SetPhasingOnly` keeping its new
//!    control aside until the vote passes.
//! 2. Screen the block's votes. Only votes on known, still pending
//!    transactions are kept.
//! 3. Evaluate every pending phased transaction at this height. An approved
//!    `SetPhasingOnly` stages its control in the same batch; an expired one
//!    never does.
//! 4. Persist the control changes, votes and new or finished phased
//!    transactions in one atomic store write.
//! 5. Commit the batch and the pool. A storage failure aborts the height
//!    with nothing changed.
//!
//! All of a height's control updates become visible together, so every
//! transaction in the block is gated against the controls as they stood
//! before the block.

use std::collections::{BTreeMap, HashMap, HashSet};

use phaseguard_control::{
    Attachment, ControlChange, ControlError, ControlReader, ControlRegistry, Transaction,
    TransactionGate,
};
use phaseguard_phasing::{
    validate_finality, Evaluation, PendingPhasedTransaction, PhasingParams, PhasingState,
    QuorumEvaluator, ValidationError, Vote, VoteTally, VotingModelKind,
};
use phaseguard_store::{
    HeightStore, HeightWrite, PhasedRow, StateAccessError, StateAccessor, StoreError, VoteRecord,
};
use phaseguard_types::{AccountId, Height, TransactionId};
use serde::{Deserialize, Serialize};

use crate::config::NodeConfig;
use crate::error::{NodeError, TransactionRejection, VoteRejected};
use crate::metrics::NodeMetrics;
use crate::tracing_spans::{evaluation_span, height_process_span, transaction_admit_span};

/// The part of a block the node processes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub height: Height,
    /// Transactions in block order.
    pub transactions: Vec<Transaction>,
    /// Votes included in this block. Each must be cast at `height`.
    pub votes: Vec<Vote>,
}

/// What happened to one transaction of a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionOutcome {
    Accepted {
        id: TransactionId,
        control_update: bool,
        phased: bool,
    },
    Rejected {
        id: TransactionId,
        error: TransactionRejection,
    },
}

impl TransactionOutcome {
    pub fn id(&self) -> TransactionId {
        match self {
            Self::Accepted { id, .. } | Self::Rejected { id, .. } => *id,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Stable code of the rejection, if the transaction was refused.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected { error, .. } => Some(error.code()),
        }
    }
}

/// A phased transaction leaving PENDING.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub id: TransactionId,
    pub state: PhasingState,
    /// Eligible weight counted in the transitioning evaluation.
    pub weight: u64,
}

/// Everything a processed height did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeightReport {
    pub height: Height,
    pub transactions: Vec<TransactionOutcome>,
    pub recorded_votes: usize,
    pub rejected_votes: Vec<(Vote, VoteRejected)>,
    pub control_changes: Vec<ControlChange>,
    pub transitions: Vec<Transition>,
    /// Approved `SetPhasingOnly` transactions whose control could not be
    /// applied at their approval height.
    pub rejected_control_updates: Vec<(TransactionId, ControlError)>,
    /// Evaluations that could not run for lack of chain state. These
    /// transactions stay pending and are retried at the next height.
    pub deferred: Vec<(TransactionId, StateAccessError)>,
}

impl HeightReport {
    pub fn outcome(&self, id: TransactionId) -> Option<&TransactionOutcome> {
        self.transactions.iter().find(|outcome| outcome.id() == id)
    }

    pub fn approved(&self) -> impl Iterator<Item = TransactionId> + '_ {
        self.transitions
            .iter()
            .filter(|t| matches!(t.state, PhasingState::Approved { .. }))
            .map(|t| t.id)
    }

    pub fn expired(&self) -> impl Iterator<Item = TransactionId> + '_ {
        self.transitions
            .iter()
            .filter(|t| matches!(t.state, PhasingState::Expired { .. }))
            .map(|t| t.id)
    }
}

/// The persisted form of a phased transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct PhasedRecord {
    tx: PendingPhasedTransaction,
    /// New control of a phased `SetPhasingOnly`, applied on approval.
    control_update: Option<PhasingParams>,
}

impl PhasedRecord {
    fn to_row(&self) -> Result<PhasedRow, StoreError> {
        let data = bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(PhasedRow {
            transaction: self.tx.id,
            data,
        })
    }

    fn from_row(row: &PhasedRow) -> Result<Self, StoreError> {
        let record: Self = bincode::deserialize(&row.data).map_err(|e| {
            StoreError::Corruption(format!("phased transaction {}: {e}", row.transaction))
        })?;
        if record.tx.id != row.transaction {
            return Err(StoreError::Corruption(format!(
                "phased transaction {} is stored under {}",
                record.tx.id, row.transaction
            )));
        }
        Ok(record)
    }
}

#[derive(Clone, Debug)]
struct PendingEntry {
    record: PhasedRecord,
    tally: VoteTally,
}

/// Single writer over the control registry and the phased transaction pool.
pub struct HeightProcessor<S, D> {
    state: S,
    store: D,
    config: NodeConfig,
    registry: ControlRegistry,
    pending: BTreeMap<TransactionId, PendingEntry>,
    finished: HashMap<TransactionId, PhasingState>,
    last_height: Option<Height>,
    metrics: Option<NodeMetrics>,
}

impl<S, D> HeightProcessor<S, D>
where
    S: StateAccessor,
    D: HeightStore,
{
    /// Build a processor, restoring the controls, the phased transactions
    /// with their votes, and the last height persisted in `store`.
    pub fn new(state: S, store: D, config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let registry = ControlRegistry::load(&store)?;
        let last_height = store.last_height()?;

        let mut pending = BTreeMap::new();
        let mut finished = HashMap::new();
        for row in store.iter_phased()? {
            let record = PhasedRecord::from_row(&row)?;
            let id = record.tx.id;
            let phase = record.tx.state();
            if phase.is_terminal() {
                finished.insert(id, phase);
                continue;
            }
            let votes: Vec<Vote> = store
                .get_votes(&id)?
                .into_iter()
                .map(|r| Vote {
                    transaction: r.transaction,
                    voter: r.voter,
                    height_cast: r.height_cast,
                })
                .collect();
            let tally = VoteTally::from_votes(id, &votes);
            pending.insert(id, PendingEntry { record, tally });
        }
        tracing::info!(
            last_height = ?last_height,
            pending = pending.len(),
            finished = finished.len(),
            "restored phased transactions"
        );

        let metrics = config.enable_metrics.then(NodeMetrics::new);
        if let Some(metrics) = &metrics {
            metrics.controlled_accounts.set(registry.len() as i64);
            metrics.pending_transactions.set(pending.len() as i64);
        }
        Ok(Self {
            state,
            store,
            config,
            registry,
            pending,
            finished,
            last_height,
            metrics,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn metrics(&self) -> Option<&NodeMetrics> {
        self.metrics.as_ref()
    }

    pub fn last_height(&self) -> Option<Height> {
        self.last_height
    }

    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    /// Handle for readers on other threads.
    pub fn control_reader(&self) -> ControlReader {
        self.registry.reader()
    }

    /// The committed control of `account`.
    pub fn control(&self, account: AccountId) -> Option<PhasingParams> {
        self.registry.get(account)
    }

    /// Current state of a phased transaction, if the node has seen it.
    pub fn phasing_state(&self, id: TransactionId) -> Option<PhasingState> {
        self.pending
            .get(&id)
            .map(|entry| entry.record.tx.state())
            .or_else(|| self.finished.get(&id).copied())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Check a transaction at submission, against the committed controls,
    /// as if it were included at the next height.
    ///
    /// Passing does not guarantee inclusion: a second control update from
    /// the same sender in the same block is only caught there.
    pub fn check_submission(&self, tx: &Transaction) -> Result<(), TransactionRejection> {
        if self.pending.contains_key(&tx.id) || self.finished.contains_key(&tx.id) {
            return Err(TransactionRejection::Duplicate(tx.id));
        }
        let height = self.last_height.map_or(Height::GENESIS, |h| h.next());
        let gate = TransactionGate::new(self.registry.snapshot());
        admit(&gate, tx, height, &self.config)?;
        Ok(())
    }

    /// Process one block. Heights must strictly increase.
    pub fn process_height(&mut self, block: Block) -> Result<HeightReport, NodeError> {
        let height = block.height;
        let span = height_process_span(height, block.transactions.len(), block.votes.len());
        let _enter = span.enter();

        if let Some(last) = self.last_height {
            if height <= last {
                return Err(NodeError::HeightOutOfOrder { last, height });
            }
        }

        let gate = TransactionGate::new(self.registry.snapshot());
        let mut batch = self.registry.begin_batch(height);
        let mut outcomes = Vec::with_capacity(block.transactions.len());
        // New phased transactions, then copies of pending ones this height changes.
        let mut touched: BTreeMap<TransactionId, PendingEntry> = BTreeMap::new();
        let mut seen = HashSet::new();

        for tx in &block.transactions {
            let _tx_span = transaction_admit_span(tx.id).entered();
            let known = !seen.insert(tx.id)
                || self.pending.contains_key(&tx.id)
                || self.finished.contains_key(&tx.id);
            let result = if known {
                Err(TransactionRejection::Duplicate(tx.id))
            } else {
                admit(&gate, tx, height, &self.config)
                    .and_then(|()| match (&tx.attachment, &tx.phasing) {
                        (Attachment::SetPhasingOnly(params), None) => {
                            batch.apply(tx.sender, params.clone())
                        }
                        _ => Ok(()),
                    })
                    .map_err(TransactionRejection::from)
            };

            match result {
                Ok(()) => {
                    if let Some(clause) = &tx.phasing {
                        let control_update = match &tx.attachment {
                            Attachment::SetPhasingOnly(params) => Some(params.clone()),
                            Attachment::Other => None,
                        };
                        touched.insert(
                            tx.id,
                            PendingEntry {
                                record: PhasedRecord {
                                    tx: PendingPhasedTransaction::new(
                                        tx.id,
                                        tx.sender,
                                        clause.params.clone(),
                                        clause.finality_height,
                                    ),
                                    control_update,
                                },
                                tally: VoteTally::new(tx.id),
                            },
                        );
                    }
                    outcomes.push(TransactionOutcome::Accepted {
                        id: tx.id,
                        control_update: tx.is_control_update(),
                        phased: tx.phasing.is_some(),
                    });
                }
                Err(error) => {
                    tracing::info!(
                        tx = %tx.id,
                        sender = %tx.sender,
                        code = error.code(),
                        %error,
                        "transaction rejected"
                    );
                    outcomes.push(TransactionOutcome::Rejected { id: tx.id, error });
                }
            }
        }
        let admitted = touched.len();

        let mut accepted_votes = Vec::new();
        let mut rejected_votes = Vec::new();
        for vote in &block.votes {
            let verdict = if vote.height_cast != height {
                Err(VoteRejected::WrongHeight {
                    cast: vote.height_cast,
                    height,
                })
            } else if let Some(state) = self.finished.get(&vote.transaction) {
                Err(VoteRejected::TransactionFinal {
                    transaction: vote.transaction,
                    state: *state,
                })
            } else if let Some(entry) = touched.get_mut(&vote.transaction) {
                entry.tally.record(vote);
                Ok(())
            } else if let Some(entry) = self.pending.get(&vote.transaction) {
                let mut entry = entry.clone();
                entry.tally.record(vote);
                touched.insert(vote.transaction, entry);
                Ok(())
            } else {
                Err(VoteRejected::UnknownTransaction {
                    transaction: vote.transaction,
                })
            };
            match verdict {
                Ok(()) => accepted_votes.push(*vote),
                Err(rejection) => {
                    tracing::debug!(
                        tx = %vote.transaction,
                        voter = %vote.voter,
                        code = rejection.code(),
                        %rejection,
                        "vote rejected"
                    );
                    rejected_votes.push((*vote, rejection));
                }
            }
        }

        let (transitions, deferred) =
            evaluate_pending(&self.state, &self.pending, &mut touched, height);

        let mut rejected_control_updates = Vec::new();
        for id in transitions
            .iter()
            .filter(|t| matches!(t.state, PhasingState::Approved { .. }))
            .map(|t| t.id)
        {
            let Some(entry) = touched.get(&id) else {
                continue;
            };
            if let Some(params) = &entry.record.control_update {
                if let Err(error) = batch.apply(entry.record.tx.sender, params.clone()) {
                    tracing::info!(
                        tx = %id,
                        sender = %entry.record.tx.sender,
                        code = error.code(),
                        %error,
                        "approved control update not applied"
                    );
                    rejected_control_updates.push((id, error));
                }
            }
        }

        let write = HeightWrite {
            height,
            controls: batch
                .changes()
                .iter()
                .map(ControlChange::to_row)
                .collect::<Result<_, _>>()?,
            votes: accepted_votes
                .iter()
                .map(|vote| VoteRecord {
                    transaction: vote.transaction,
                    voter: vote.voter,
                    height_cast: vote.height_cast,
                })
                .collect(),
            // Pending rows only change when they are created or finish.
            phased: touched
                .iter()
                .filter(|(id, entry)| {
                    !self.pending.contains_key(*id) || entry.record.tx.state().is_terminal()
                })
                .map(|(_, entry)| entry.record.to_row())
                .collect::<Result<_, _>>()?,
        };
        self.store.commit_height(&write)?;
        let control_changes = batch.commit();

        for (id, entry) in touched {
            let state = entry.record.tx.state();
            if state.is_terminal() {
                self.pending.remove(&id);
                self.finished.insert(id, state);
            } else {
                self.pending.insert(id, entry);
            }
        }
        for transition in &transitions {
            tracing::info!(
                tx = %transition.id,
                state = ?transition.state,
                weight = transition.weight,
                "phased transaction finished"
            );
        }
        self.last_height = Some(height);

        let rejected_transactions = outcomes.iter().filter(|o| !o.is_accepted()).count();
        if let Some(metrics) = &self.metrics {
            metrics.heights_processed.inc();
            metrics
                .transactions_rejected
                .inc_by(rejected_transactions as u64);
            metrics.control_updates.inc_by(control_changes.len() as u64);
            metrics.votes_recorded.inc_by(accepted_votes.len() as u64);
            metrics.votes_rejected.inc_by(rejected_votes.len() as u64);
            for transition in &transitions {
                match transition.state {
                    PhasingState::Approved { .. } => metrics.approvals.inc(),
                    PhasingState::Expired { .. } => metrics.expiries.inc(),
                    PhasingState::Pending => {}
                }
            }
            metrics.deferred_evaluations.inc_by(deferred.len() as u64);
            metrics.pending_transactions.set(self.pending.len() as i64);
            metrics.controlled_accounts.set(self.registry.len() as i64);
        }

        tracing::info!(
            %height,
            accepted = outcomes.len() - rejected_transactions,
            rejected = rejected_transactions,
            admitted,
            votes = accepted_votes.len(),
            control_changes = control_changes.len(),
            transitions = transitions.len(),
            deferred = deferred.len(),
            pending = self.pending.len(),
            "height processed"
        );

        Ok(HeightReport {
            height,
            transactions: outcomes,
            recorded_votes: accepted_votes.len(),
            rejected_votes,
            control_changes,
            transitions,
            rejected_control_updates,
            deferred,
        })
    }
}

/// Evaluate every pending transaction at `height` without touching the pool.
///
/// Entries in `touched` shadow their committed counterpart in `pending`.
/// Transactions that reach a terminal state are copied into `touched` with
/// their new state.
fn evaluate_pending<S: StateAccessor>(
    state: &S,
    pending: &BTreeMap<TransactionId, PendingEntry>,
    touched: &mut BTreeMap<TransactionId, PendingEntry>,
    height: Height,
) -> (Vec<Transition>, Vec<(TransactionId, StateAccessError)>) {
    let untouched = pending.iter().filter(|(id, _)| !touched.contains_key(*id));
    let _span = evaluation_span(height, touched.len() + untouched.clone().count()).entered();
    let mut finished: Vec<(PendingPhasedTransaction, Evaluation)> = Vec::new();
    let mut deferred = Vec::new();

    for (id, entry) in touched.iter().chain(untouched) {
        let mut tx = entry.record.tx.clone();
        match QuorumEvaluator.evaluate(&mut tx, &entry.tally, state, height) {
            Ok(eval) if eval.transitioned => finished.push((tx, eval)),
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(tx = %id, %error, "phasing evaluation deferred");
                deferred.push((*id, error));
            }
        }
    }
    finished.sort_by_key(|(tx, _)| tx.id);
    deferred.sort_by_key(|(id, _)| *id);

    let mut transitions = Vec::with_capacity(finished.len());
    for (tx, eval) in finished {
        let id = tx.id;
        if !touched.contains_key(&id) {
            if let Some(entry) = pending.get(&id) {
                touched.insert(id, entry.clone());
            }
        }
        if let Some(entry) = touched.get_mut(&id) {
            entry.record.tx = tx;
        }
        transitions.push(Transition {
            id,
            state: eval.state,
            weight: eval.weight,
        });
    }
    (transitions, deferred)
}

/// Gate `tx` and check its phasing clause for inclusion at `height`.
fn admit(
    gate: &TransactionGate,
    tx: &Transaction,
    height: Height,
    config: &NodeConfig,
) -> Result<(), ControlError> {
    gate.check(tx)?;
    if let Some(clause) = &tx.phasing {
        if clause.params.is_none() {
            return Err(ValidationError::InvalidVotingModel(VotingModelKind::None.code()).into());
        }
        validate_finality(
            height,
            clause.finality_height,
            config.min_phasing_duration,
            config.max_phasing_duration,
        )?;
    }
    Ok(())
}
