//! End-to-end tests of the height processor:
//! control updates → gating → phased admission → votes → evaluation → persistence.
//!
//! Chain state and the store are the in-memory nullables; every test drives
//! the processor only through blocks, as a node would.

use phaseguard_control::{
    Attachment, ControlChange, ControlError, ControlViolation, PhasingClause, Transaction,
};
use phaseguard_node::{
    Block, HeightProcessor, NodeConfig, NodeError, TransactionOutcome, TransactionRejection,
    VoteRejected,
};
use phaseguard_nullables::{NullState, NullStore};
use phaseguard_phasing::{validate, PhasingParams, PhasingState, RawPhasingFields, Vote};
use phaseguard_store::{StoreError, VoteStore};
use phaseguard_types::{AccountId, Height, TransactionId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const X: AccountId = AccountId::new(100);
const A: AccountId = AccountId::new(1);
const B: AccountId = AccountId::new(2);
const C: AccountId = AccountId::new(3);

type Node<'a> = HeightProcessor<&'a NullState, &'a NullStore>;

struct Fixture {
    state: NullState,
    store: NullStore,
}

impl Fixture {
    fn new() -> Self {
        let state = NullState::new();
        for account in [A, B, C, X] {
            state.add_account(account);
        }
        Self {
            state,
            store: NullStore::new(),
        }
    }

    fn node(&self) -> Node<'_> {
        HeightProcessor::new(&self.state, &self.store, NodeConfig::default()).expect("processor")
    }
}

fn params(raw: RawPhasingFields) -> PhasingParams {
    validate(&raw).expect("valid params")
}

fn account_params(quorum: i64, whitelisted: &[AccountId]) -> PhasingParams {
    params(RawPhasingFields {
        voting_model: 0,
        quorum,
        whitelisted: whitelisted.iter().map(|a| a.get()).collect(),
        ..RawPhasingFields::default()
    })
}

fn plain(id: u64, sender: AccountId) -> Transaction {
    Transaction {
        id: TransactionId::new(id),
        sender,
        attachment: Attachment::Other,
        phasing: None,
    }
}

fn phased(id: u64, sender: AccountId, params: PhasingParams, finality: u32) -> Transaction {
    Transaction {
        phasing: Some(PhasingClause {
            params,
            finality_height: Height::new(finality),
        }),
        ..plain(id, sender)
    }
}

fn set_phasing_only(id: u64, sender: AccountId, control: PhasingParams) -> Transaction {
    Transaction {
        attachment: Attachment::SetPhasingOnly(control),
        ..plain(id, sender)
    }
}

fn vote(tx: u64, voter: AccountId, height: u32) -> Vote {
    Vote {
        transaction: TransactionId::new(tx),
        voter,
        height_cast: Height::new(height),
    }
}

fn block(height: u32, transactions: Vec<Transaction>, votes: Vec<Vote>) -> Block {
    Block {
        height: Height::new(height),
        transactions,
        votes,
    }
}

fn rejection(outcome: &TransactionOutcome) -> &TransactionRejection {
    match outcome {
        TransactionOutcome::Rejected { error, .. } => error,
        TransactionOutcome::Accepted { id, .. } => panic!("transaction {id} was accepted"),
    }
}

// ---------------------------------------------------------------------------
// 1. Control installation and gating
// ---------------------------------------------------------------------------

#[test]
fn account_control_rejects_plain_transaction() {
    let fx = Fixture::new();
    let mut node = fx.node();
    node.process_height(block(1, vec![set_phasing_only(1, X, account_params(1, &[]))], vec![]))
        .unwrap();
    assert_eq!(node.control(X), Some(account_params(1, &[])));

    let report = node
        .process_height(block(2, vec![plain(2, X)], vec![]))
        .unwrap();
    assert_eq!(
        rejection(&report.transactions[0]),
        &TransactionRejection::Control(ControlError::Violation(ControlViolation::NotPhased {
            account: X
        }))
    );
    assert_eq!(report.transactions[0].code(), Some(201));

    // Phasing that matches the control gets through.
    let report = node
        .process_height(block(3, vec![phased(3, X, account_params(1, &[]), 50)], vec![]))
        .unwrap();
    assert!(report.transactions[0].is_accepted());
    assert_eq!(node.phasing_state(TransactionId::new(3)), Some(PhasingState::Pending));
}

#[test]
fn controls_take_effect_after_their_height() {
    let fx = Fixture::new();
    let mut node = fx.node();
    let report = node
        .process_height(block(
            1,
            vec![set_phasing_only(1, X, account_params(1, &[])), plain(2, X)],
            vec![],
        ))
        .unwrap();
    assert!(report.transactions.iter().all(TransactionOutcome::is_accepted));
    assert_eq!(report.control_changes.len(), 1);
}

#[test]
fn duplicate_set_phasing_only_in_one_block() {
    let fx = Fixture::new();
    let mut node = fx.node();
    let report = node
        .process_height(block(
            4,
            vec![
                set_phasing_only(1, X, account_params(1, &[])),
                set_phasing_only(2, X, account_params(2, &[])),
            ],
            vec![],
        ))
        .unwrap();

    assert!(report.transactions[0].is_accepted());
    assert_eq!(
        rejection(&report.transactions[1]),
        &TransactionRejection::Control(ControlError::DuplicateControlUpdate {
            account: X,
            height: Height::new(4)
        })
    );
    assert_eq!(report.transactions[1].code(), Some(300));
    assert_eq!(node.control(X), Some(account_params(1, &[])));
    assert_eq!(fx.store.len(), 1);
}

#[test]
fn clearing_a_control_waits_for_approval() {
    let fx = Fixture::new();
    let mut node = fx.node();
    let strict = account_params(2, &[A, B, C]);
    node.process_height(block(1, vec![set_phasing_only(1, X, strict.clone())], vec![]))
        .unwrap();

    // An unphased clear is gated like any other transaction.
    let report = node
        .process_height(block(
            2,
            vec![set_phasing_only(2, X, PhasingParams::none())],
            vec![],
        ))
        .unwrap();
    assert_eq!(report.transactions[0].code(), Some(201));
    assert_eq!(node.control(X), Some(strict.clone()));

    let clear = Transaction {
        phasing: Some(PhasingClause {
            params: strict.clone(),
            finality_height: Height::new(40),
        }),
        ..set_phasing_only(3, X, PhasingParams::none())
    };
    let report = node.process_height(block(3, vec![clear], vec![])).unwrap();
    assert!(report.transactions[0].is_accepted());
    assert!(report.control_changes.is_empty());
    assert_eq!(node.control(X), Some(strict.clone()));
    assert_eq!(fx.store.len(), 1);

    // Still controlled while the clear is pending.
    let report = node
        .process_height(block(4, vec![plain(4, X)], vec![vote(3, A, 4)]))
        .unwrap();
    assert_eq!(report.transactions[0].code(), Some(201));
    assert_eq!(node.control(X), Some(strict));

    let report = node
        .process_height(block(5, vec![], vec![vote(3, B, 5)]))
        .unwrap();
    assert_eq!(report.approved().collect::<Vec<_>>(), vec![TransactionId::new(3)]);
    assert_eq!(
        report.control_changes,
        vec![ControlChange {
            account: X,
            params: None
        }]
    );
    assert_eq!(node.control(X), None);
    assert!(fx.store.is_empty());

    let report = node.process_height(block(6, vec![plain(6, X)], vec![])).unwrap();
    assert!(report.transactions[0].is_accepted());
}

#[test]
fn expired_control_update_is_never_applied() {
    let fx = Fixture::new();
    let mut node = fx.node();
    let strict = account_params(2, &[A, B, C]);
    node.process_height(block(1, vec![set_phasing_only(1, X, strict.clone())], vec![]))
        .unwrap();

    let clear = Transaction {
        phasing: Some(PhasingClause {
            params: strict.clone(),
            finality_height: Height::new(6),
        }),
        ..set_phasing_only(2, X, PhasingParams::none())
    };
    node.process_height(block(2, vec![clear], vec![vote(2, A, 2)]))
        .unwrap();
    for h in 3..6 {
        let report = node.process_height(block(h, vec![], vec![])).unwrap();
        assert!(report.transitions.is_empty());
    }

    let report = node.process_height(block(6, vec![], vec![])).unwrap();
    assert_eq!(report.expired().collect::<Vec<_>>(), vec![TransactionId::new(2)]);
    assert!(report.control_changes.is_empty());
    assert_eq!(node.control(X), Some(strict.clone()));
    assert_eq!(fx.store.len(), 1);

    let report = node.process_height(block(7, vec![plain(7, X)], vec![])).unwrap();
    assert_eq!(report.transactions[0].code(), Some(201));
    assert_eq!(node.control(X), Some(strict));
}

#[test]
fn approved_control_update_loses_to_same_height_update() {
    let fx = Fixture::new();
    let mut node = fx.node();
    let tighten = Transaction {
        phasing: Some(PhasingClause {
            params: account_params(1, &[A]),
            finality_height: Height::new(20),
        }),
        ..set_phasing_only(1, X, account_params(2, &[A, B]))
    };
    node.process_height(block(1, vec![tighten], vec![])).unwrap();
    assert_eq!(node.control(X), None);

    let report = node
        .process_height(block(
            2,
            vec![set_phasing_only(2, X, account_params(1, &[]))],
            vec![vote(1, A, 2)],
        ))
        .unwrap();
    assert!(report.transactions[0].is_accepted());
    assert_eq!(report.approved().collect::<Vec<_>>(), vec![TransactionId::new(1)]);
    assert_eq!(
        report.rejected_control_updates,
        vec![(
            TransactionId::new(1),
            ControlError::DuplicateControlUpdate {
                account: X,
                height: Height::new(2)
            }
        )]
    );
    assert_eq!(node.control(X), Some(account_params(1, &[])));
}

#[test]
fn submission_check_matches_block_admission() {
    let fx = Fixture::new();
    let mut node = fx.node();
    node.process_height(block(1, vec![set_phasing_only(1, X, account_params(1, &[]))], vec![]))
        .unwrap();
    assert_eq!(rejection_code(node.check_submission(&plain(2, X))), Some(201));
    assert!(node
        .check_submission(&phased(3, X, account_params(1, &[]), 30))
        .is_ok());
    // Finality is checked against the next height, 2.
    assert_eq!(
        rejection_code(node.check_submission(&phased(4, X, account_params(1, &[]), 2))),
        Some(111)
    );
}

fn rejection_code(result: Result<(), TransactionRejection>) -> Option<u16> {
    result.err().map(|e| e.code())
}

// ---------------------------------------------------------------------------
// 2. Voting and evaluation
// ---------------------------------------------------------------------------

#[test]
fn account_quorum_two_approves_on_second_distinct_voter() {
    let fx = Fixture::new();
    let mut node = fx.node();
    let tx = phased(7, X, account_params(2, &[A, B, C]), 100);
    node.process_height(block(1, vec![tx], vec![vote(7, C, 1)]))
        .unwrap();
    assert_eq!(node.phasing_state(TransactionId::new(7)), Some(PhasingState::Pending));

    // Voting again does not count twice.
    let report = node
        .process_height(block(2, vec![], vec![vote(7, C, 2)]))
        .unwrap();
    assert!(report.transitions.is_empty());

    let report = node
        .process_height(block(3, vec![], vec![vote(7, A, 3)]))
        .unwrap();
    assert_eq!(report.approved().collect::<Vec<_>>(), vec![TransactionId::new(7)]);
    assert_eq!(
        node.phasing_state(TransactionId::new(7)),
        Some(PhasingState::Approved { at: Height::new(3) })
    );
    assert_eq!(
        fx.store.get_votes(&TransactionId::new(7)).unwrap().len(),
        3
    );
}

#[test]
fn non_whitelisted_votes_carry_no_weight() {
    let fx = Fixture::new();
    let mut node = fx.node();
    let tx = phased(7, X, account_params(1, &[A]), 100);
    let report = node
        .process_height(block(1, vec![tx], vec![vote(7, B, 1), vote(7, C, 1)]))
        .unwrap();
    assert_eq!(report.recorded_votes, 2);
    assert!(report.transitions.is_empty());
}

#[test]
fn balance_vote_tracks_current_balances() {
    let fx = Fixture::new();
    fx.state.set_balance(A, Height::GENESIS, 600);
    fx.state.set_balance(B, Height::GENESIS, 350);
    fx.state.set_balance(A, Height::new(3), 100);
    fx.state.set_balance(B, Height::new(4), 900);
    let balance = params(RawPhasingFields {
        voting_model: 1,
        quorum: 1000,
        min_balance: 300,
        min_balance_model: 1,
        ..RawPhasingFields::default()
    });
    let mut node = fx.node();

    let report = node
        .process_height(block(
            2,
            vec![phased(9, X, balance, 50)],
            vec![vote(9, A, 2), vote(9, B, 2)],
        ))
        .unwrap();
    assert!(report.transitions.is_empty());

    // A drops below the min balance: 350 counts.
    let report = node.process_height(block(3, vec![], vec![])).unwrap();
    assert!(report.transitions.is_empty());

    // B alone now holds 900: still short.
    let report = node.process_height(block(4, vec![], vec![])).unwrap();
    assert!(report.transitions.is_empty());

    fx.state.set_balance(A, Height::new(5), 400);
    let report = node.process_height(block(5, vec![], vec![])).unwrap();
    assert_eq!(report.transitions[0].weight, 1300);
    assert_eq!(report.approved().count(), 1);
}

#[test]
fn expires_exactly_once_at_finality() {
    let fx = Fixture::new();
    let mut node = fx.node();
    node.process_height(block(
        1,
        vec![phased(5, X, account_params(2, &[A, B]), 4)],
        vec![vote(5, A, 1)],
    ))
    .unwrap();

    for h in 2..4 {
        let report = node.process_height(block(h, vec![], vec![])).unwrap();
        assert!(report.transitions.is_empty());
    }
    let report = node.process_height(block(4, vec![], vec![])).unwrap();
    assert_eq!(report.expired().collect::<Vec<_>>(), vec![TransactionId::new(5)]);
    assert_eq!(node.pending_len(), 0);

    // A late vote cannot revive it and no further transition is reported.
    let report = node
        .process_height(block(5, vec![], vec![vote(5, B, 5)]))
        .unwrap();
    assert!(report.transitions.is_empty());
    assert_eq!(
        report.rejected_votes[0].1,
        VoteRejected::TransactionFinal {
            transaction: TransactionId::new(5),
            state: PhasingState::Expired { at: Height::new(4) }
        }
    );
    assert_eq!(
        node.phasing_state(TransactionId::new(5)),
        Some(PhasingState::Expired { at: Height::new(4) })
    );
}

#[test]
fn quorum_reached_at_finality_height_approves() {
    let fx = Fixture::new();
    let mut node = fx.node();
    node.process_height(block(1, vec![phased(5, X, account_params(1, &[A]), 3)], vec![]))
        .unwrap();
    node.process_height(block(2, vec![], vec![])).unwrap();
    let report = node
        .process_height(block(3, vec![], vec![vote(5, A, 3)]))
        .unwrap();
    assert_eq!(report.approved().count(), 1);
    assert_eq!(report.expired().count(), 0);
}

#[test]
fn votes_for_unknown_transactions_are_rejected() {
    let fx = Fixture::new();
    let mut node = fx.node();
    let report = node
        .process_height(block(1, vec![plain(1, A)], vec![vote(1, B, 1), vote(99, B, 1)]))
        .unwrap();
    assert_eq!(report.recorded_votes, 0);
    assert_eq!(report.rejected_votes.len(), 2);
    assert!(report
        .rejected_votes
        .iter()
        .all(|(_, r)| matches!(r, VoteRejected::UnknownTransaction { .. })));
    assert!(fx.store.get_votes(&TransactionId::new(1)).unwrap().is_empty());
}

#[test]
fn unavailable_state_defers_evaluation_past_finality() {
    let fx = Fixture::new();
    fx.state.set_balance(A, Height::GENESIS, 5_000);
    let balance = params(RawPhasingFields {
        voting_model: 1,
        quorum: 1000,
        ..RawPhasingFields::default()
    });
    let mut node = fx.node();
    node.process_height(block(1, vec![phased(6, X, balance, 2)], vec![]))
        .unwrap();

    fx.state.make_unavailable(Height::new(2));
    let report = node
        .process_height(block(2, vec![], vec![vote(6, A, 2)]))
        .unwrap();
    assert_eq!(report.deferred.len(), 1);
    assert!(report.transitions.is_empty());
    assert_eq!(node.phasing_state(TransactionId::new(6)), Some(PhasingState::Pending));

    let report = node.process_height(block(3, vec![], vec![])).unwrap();
    assert_eq!(report.approved().count(), 1);
}

// ---------------------------------------------------------------------------
// 3. Persistence
// ---------------------------------------------------------------------------

#[test]
fn failed_persistence_changes_nothing() {
    let fx = Fixture::new();
    let mut node = fx.node();
    fx.store.set_fail_writes(true);
    let b = block(
        1,
        vec![
            set_phasing_only(1, X, account_params(1, &[])),
            phased(2, A, account_params(1, &[B]), 20),
        ],
        vec![],
    );
    let err = node.process_height(b.clone()).unwrap_err();
    assert!(matches!(err, NodeError::Store(StoreError::Backend(_))));
    assert_eq!(node.control(X), None);
    assert_eq!(node.phasing_state(TransactionId::new(2)), None);
    assert_eq!(node.last_height(), None);
    assert_eq!(fx.store.phased_count(), 0);

    fx.store.set_fail_writes(false);
    let report = node.process_height(b).unwrap();
    assert!(report.transactions.iter().all(TransactionOutcome::is_accepted));
    assert!(node.control(X).is_some());
}

#[test]
fn failed_vote_append_keeps_registry_unchanged() {
    let fx = Fixture::new();
    let mut node = fx.node();
    node.process_height(block(1, vec![phased(2, A, account_params(1, &[B]), 20)], vec![]))
        .unwrap();
    fx.store.set_fail_vote_writes(true);
    let err = node
        .process_height(block(
            2,
            vec![set_phasing_only(3, C, account_params(1, &[]))],
            vec![vote(2, B, 2)],
        ))
        .unwrap_err();
    assert!(matches!(err, NodeError::Store(_)));
    assert_eq!(node.control(C), None);
    assert_eq!(node.phasing_state(TransactionId::new(2)), Some(PhasingState::Pending));
    assert!(fx.store.is_empty());
    assert!(fx.store.get_votes(&TransactionId::new(2)).unwrap().is_empty());
    assert_eq!(node.last_height(), Some(Height::new(1)));

    drop(node);
    let node = fx.node();
    assert_eq!(node.control(C), None);
    assert_eq!(node.last_height(), Some(Height::new(1)));
    assert_eq!(node.phasing_state(TransactionId::new(2)), Some(PhasingState::Pending));
}

#[test]
fn controls_survive_a_restart() {
    let fx = Fixture::new();
    {
        let mut node = fx.node();
        node.process_height(block(
            1,
            vec![
                set_phasing_only(1, X, account_params(1, &[])),
                set_phasing_only(2, A, account_params(2, &[B, C])),
            ],
            vec![],
        ))
        .unwrap();
    }
    let node = fx.node();
    assert_eq!(node.registry().controlled_accounts(), vec![A, X]);
    assert_eq!(node.control(A), Some(account_params(2, &[B, C])));
}

#[test]
fn pending_transactions_survive_a_restart() {
    let fx = Fixture::new();
    let loosen = Transaction {
        phasing: Some(PhasingClause {
            params: account_params(2, &[A, B, C]),
            finality_height: Height::new(50),
        }),
        ..set_phasing_only(7, X, account_params(1, &[]))
    };
    {
        let mut node = fx.node();
        node.process_height(block(
            1,
            vec![loosen, phased(5, A, account_params(1, &[B]), 2)],
            vec![vote(7, A, 1)],
        ))
        .unwrap();
        let report = node.process_height(block(2, vec![], vec![])).unwrap();
        assert_eq!(report.expired().collect::<Vec<_>>(), vec![TransactionId::new(5)]);
    }

    let mut node = fx.node();
    assert_eq!(node.last_height(), Some(Height::new(2)));
    assert_eq!(node.pending_len(), 1);
    assert_eq!(node.phasing_state(TransactionId::new(7)), Some(PhasingState::Pending));
    assert_eq!(
        node.phasing_state(TransactionId::new(5)),
        Some(PhasingState::Expired { at: Height::new(2) })
    );
    assert!(matches!(
        node.process_height(block(2, vec![], vec![])),
        Err(NodeError::HeightOutOfOrder { .. })
    ));

    // A's vote from before the restart still counts toward the quorum of two.
    let report = node
        .process_height(block(3, vec![], vec![vote(7, C, 3), vote(5, B, 3)]))
        .unwrap();
    assert_eq!(report.approved().collect::<Vec<_>>(), vec![TransactionId::new(7)]);
    assert!(matches!(
        report.rejected_votes[0].1,
        VoteRejected::TransactionFinal { .. }
    ));
    assert_eq!(node.control(X), Some(account_params(1, &[])));

    drop(node);
    let node = fx.node();
    assert_eq!(node.pending_len(), 0);
    assert_eq!(
        node.phasing_state(TransactionId::new(7)),
        Some(PhasingState::Approved { at: Height::new(3) })
    );
    assert_eq!(node.control(X), Some(account_params(1, &[])));
}

#[test]
fn readers_on_other_threads_see_committed_controls() {
    let fx = Fixture::new();
    let mut node = fx.node();
    let reader = node.control_reader();
    node.process_height(block(1, vec![set_phasing_only(1, X, account_params(1, &[]))], vec![]))
        .unwrap();
    let seen = std::thread::spawn(move || reader.get(X)).join().unwrap();
    assert_eq!(seen, Some(account_params(1, &[])));
}
