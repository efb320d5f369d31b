use proptest::prelude::*;

use phaseguard_nullables::NullState;
use phaseguard_phasing::{
    validate, MinBalanceModelKind, PendingPhasedTransaction, PhasingParams, PhasingState,
    QuorumEvaluator, RawPhasingFields, Vote, VoteTally, VotingModelKind, MAX_WHITELIST_SIZE,
};
use phaseguard_types::{AccountId, Height, TransactionId};

fn raw_fields() -> impl Strategy<Value = RawPhasingFields> {
    (
        -2i8..5,
        -3i64..2_000,
        -3i64..200,
        -1i8..5,
        prop::option::of(0u64..4),
        prop::collection::vec(0u64..16, 0..MAX_WHITELIST_SIZE + 3),
    )
        .prop_map(
            |(voting_model, quorum, min_balance, min_balance_model, holding, whitelisted)| {
                RawPhasingFields {
                    voting_model,
                    quorum,
                    min_balance,
                    min_balance_model,
                    holding,
                    whitelisted,
                }
            },
        )
}

fn vote(tx: TransactionId, voter: u64, h: u32) -> Vote {
    Vote {
        transaction: tx,
        voter: AccountId::new(voter),
        height_cast: Height::new(h),
    }
}

proptest! {
    /// Every accepted parameter set satisfies the structural invariants.
    #[test]
    fn accepted_params_are_consistent(raw in raw_fields()) {
        if let Ok(p) = validate(&raw) {
            let kind = p.voting_model_kind();
            prop_assert_eq!(p.quorum() > 0, kind != VotingModelKind::None);
            prop_assert_eq!(p.holding().is_some(), kind.requires_holding());
            prop_assert_eq!(
                p.min_balance_model() == MinBalanceModelKind::None,
                p.min_balance() == 0
            );
            prop_assert!(p.whitelist().len() <= MAX_WHITELIST_SIZE);
            if kind == VotingModelKind::None {
                prop_assert_eq!(&p, &PhasingParams::none());
            }
        }
    }

    /// Accepted params decode back to themselves through raw fields and bincode.
    #[test]
    fn accepted_params_encode_decode_identity(raw in raw_fields()) {
        if let Ok(p) = validate(&raw) {
            prop_assert_eq!(validate(&p.to_raw()).unwrap(), p.clone());
            let bytes = bincode::serialize(&p).unwrap();
            let decoded: PhasingParams = bincode::deserialize(&bytes).unwrap();
            prop_assert_eq!(decoded, p);
        }
    }

    /// Validation is a pure function of its input.
    #[test]
    fn validation_is_deterministic(raw in raw_fields()) {
        prop_assert_eq!(validate(&raw), validate(&raw));
    }

    /// ACCOUNT, quorum 2, whitelist {A, B, C}: one vote never approves, any
    /// two distinct whitelisted votes do, whatever the order.
    #[test]
    fn account_quorum_two_needs_two_distinct_voters(
        order in Just(vec![1u64, 2, 3]).prop_shuffle(),
        repeat_first in 1usize..4,
    ) {
        let tx = TransactionId::new(5);
        let params = validate(&RawPhasingFields {
            voting_model: 0,
            quorum: 2,
            whitelisted: vec![1, 2, 3],
            ..RawPhasingFields::default()
        }).unwrap();
        let state = NullState::new();
        let mut pending = PendingPhasedTransaction::new(tx, AccountId::new(9), params, Height::new(100));
        let mut tally = VoteTally::new(tx);

        for i in 0..repeat_first {
            tally.record(&vote(tx, order[0], 10 + i as u32));
        }
        let eval = QuorumEvaluator.evaluate(&mut pending, &tally, &state, Height::new(20)).unwrap();
        prop_assert_eq!(eval.state, PhasingState::Pending);

        tally.record(&vote(tx, order[1], 21));
        let eval = QuorumEvaluator.evaluate(&mut pending, &tally, &state, Height::new(21)).unwrap();
        prop_assert_eq!(eval.state, PhasingState::Approved { at: Height::new(21) });
    }

    /// BALANCE: approval tracks the current sum of eligible balances.
    #[test]
    fn balance_model_approves_on_current_balance(
        a in 0u64..1_500,
        b in 0u64..1_500,
    ) {
        let tx = TransactionId::new(6);
        let params = validate(&RawPhasingFields {
            voting_model: 1,
            quorum: 1000,
            ..RawPhasingFields::default()
        }).unwrap();
        let state = NullState::new();
        state.set_balance(AccountId::new(1), Height::GENESIS, a);
        state.set_balance(AccountId::new(2), Height::GENESIS, b);
        let mut pending = PendingPhasedTransaction::new(tx, AccountId::new(9), params, Height::new(100));
        let tally = VoteTally::from_votes(tx, &[vote(tx, 1, 1), vote(tx, 2, 1)]);
        let eval = QuorumEvaluator.evaluate(&mut pending, &tally, &state, Height::new(1)).unwrap();
        if a + b >= 1000 {
            prop_assert_eq!(eval.state, PhasingState::Approved { at: Height::new(1) });
        } else {
            prop_assert_eq!(eval.state, PhasingState::Pending);
        }
    }
}

#[test]
fn balance_drop_below_min_balance_removes_prior_vote() {
    let tx = TransactionId::new(7);
    let params = validate(&RawPhasingFields {
        voting_model: 1,
        quorum: 1000,
        min_balance: 300,
        min_balance_model: 1,
        ..RawPhasingFields::default()
    })
    .unwrap();
    let state = NullState::new();
    let a = AccountId::new(1);
    let b = AccountId::new(2);
    state.set_balance(a, Height::GENESIS, 600);
    state.set_balance(b, Height::GENESIS, 350);
    // A spends down to below the min balance at height 11.
    state.set_balance(a, Height::new(11), 200);

    let mut pending = PendingPhasedTransaction::new(tx, AccountId::new(9), params, Height::new(50));
    let mut tally = VoteTally::from_votes(tx, &[vote(tx, 1, 10), vote(tx, 2, 10)]);

    let eval = QuorumEvaluator
        .evaluate(&mut pending, &tally, &state, Height::new(10))
        .unwrap();
    assert_eq!(eval.weight, 950);
    assert_eq!(eval.state, PhasingState::Pending);

    // B tops up; A would put the sum over quorum but no longer qualifies.
    state.set_balance(b, Height::new(11), 700);
    let eval = QuorumEvaluator
        .evaluate(&mut pending, &tally, &state, Height::new(11))
        .unwrap();
    assert_eq!(eval.weight, 700);
    assert_eq!(eval.state, PhasingState::Pending);

    // Re-voting does not add weight; only a fresh balance does.
    tally.record(&vote(tx, 2, 12));
    state.set_balance(b, Height::new(12), 1000);
    let eval = QuorumEvaluator
        .evaluate(&mut pending, &tally, &state, Height::new(12))
        .unwrap();
    assert_eq!(eval.weight, 1000);
    assert_eq!(eval.state, PhasingState::Approved { at: Height::new(12) });
}

#[test]
fn none_params_have_neutral_fields_and_round_trip() {
    let p = PhasingParams::none();
    assert_eq!(p.quorum(), 0);
    assert_eq!(p.min_balance(), 0);
    assert_eq!(p.min_balance_model(), MinBalanceModelKind::None);
    assert!(p.holding().is_none());
    assert!(p.whitelist().is_empty());
    let bytes = bincode::serialize(&p).unwrap();
    assert_eq!(bincode::deserialize::<PhasingParams>(&bytes).unwrap(), p);
}

#[test]
fn decoding_inconsistent_bytes_fails_validation() {
    let bad = RawPhasingFields {
        voting_model: 2,
        quorum: 10,
        ..RawPhasingFields::default()
    };
    let bytes = bincode::serialize(&bad).unwrap();
    assert!(bincode::deserialize::<PhasingParams>(&bytes).is_err());
}
