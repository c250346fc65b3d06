use proptest::prelude::*;

use verigate_types::{ResponseCode, SessionId, VerifierId};
use verigate_verification::{Verdict, VerificationState};

fn code_strategy() -> impl Strategy<Value = ResponseCode> {
    prop_oneof![
        Just(ResponseCode::Allow),
        Just(ResponseCode::AllowWithoutSufficient),
        Just(ResponseCode::REJECT),
        (-5i32..5).prop_map(ResponseCode::from_raw),
    ]
}

/// A waiver clears the sufficient pool, so a pool that has already failed
/// stays failed while one that has not is waived. Order matters there.
fn code_strategy_without_waiver() -> impl Strategy<Value = ResponseCode> {
    prop_oneof![
        Just(ResponseCode::Allow),
        Just(ResponseCode::REJECT),
        Just(ResponseCode::Other(0)),
        Just(ResponseCode::Other(3)),
    ]
}

/// Required ids 0..r, sufficient ids 100..100+s, optional id 1000.
fn build(required: u32, sufficient: u32, optional: bool) -> VerificationState {
    let mut state = VerificationState::new(SessionId::new(1));
    for i in 0..required {
        state.add_required_verifier(VerifierId::new(i));
    }
    for i in 0..sufficient {
        state.add_sufficient_verifier(VerifierId::new(100 + i));
    }
    if optional {
        state.add_optional_verifier(VerifierId::new(1000));
    }
    state
}

fn responders(required: u32, sufficient: u32, optional: bool) -> Vec<VerifierId> {
    let mut ids: Vec<VerifierId> = (0..required).map(VerifierId::new).collect();
    ids.extend((0..sufficient).map(|i| VerifierId::new(100 + i)));
    if optional {
        ids.push(VerifierId::new(1000));
    }
    ids
}

type Answers = Vec<(VerifierId, ResponseCode)>;

/// A roster, one answer per verifier, and the same answers in a shuffled order.
fn arrival_orders() -> impl Strategy<Value = (u32, u32, bool, Answers, Answers)> {
    (0u32..4, 0u32..4, any::<bool>()).prop_flat_map(|(required, sufficient, optional)| {
        let ids = responders(required, sufficient, optional);
        prop::collection::vec(code_strategy_without_waiver(), ids.len()).prop_flat_map(
            move |codes| {
                let answers: Answers = ids.iter().copied().zip(codes).collect();
                (
                    Just(required),
                    Just(sufficient),
                    Just(optional),
                    Just(answers.clone()),
                    Just(answers).prop_shuffle(),
                )
            },
        )
    })
}

proptest! {
    /// Once every verifier has answered, the verdict does not depend on arrival order.
    #[test]
    fn verdict_independent_of_arrival_order(
        (required, sufficient, optional, answers, shuffled_answers) in arrival_orders(),
    ) {
        let mut in_order = build(required, sufficient, optional);
        for &(id, code) in &answers {
            in_order.record_response(id, code);
        }

        let mut shuffled = build(required, sufficient, optional);
        for &(id, code) in &shuffled_answers {
            shuffled.record_response(id, code);
        }

        prop_assert!(in_order.is_verification_complete());
        prop_assert!(shuffled.is_verification_complete());
        prop_assert_eq!(in_order.verdict(), shuffled.verdict());
    }

    /// One rejecting required verifier means the install is never allowed.
    #[test]
    fn required_rejection_is_final(
        required in 1u32..5,
        rejecter in 0u32..5,
        sufficient in 0u32..3,
        replay in prop::collection::vec((0u32..5, code_strategy()), 0..10),
    ) {
        let rejecter = rejecter % required;
        let mut state = build(required, sufficient, false);
        state.record_response(VerifierId::new(rejecter), ResponseCode::REJECT);
        for (id, code) in replay {
            state.record_response(VerifierId::new(id), code);
        }
        for id in 0..required {
            state.record_response(VerifierId::new(id), ResponseCode::Allow);
        }
        prop_assert!(!state.is_install_allowed());
        prop_assert_ne!(state.verdict(), Verdict::Allowed);
    }

    /// The timeout flag never goes back to false.
    #[test]
    fn timeout_extension_never_resets(
        ops in prop::collection::vec((any::<bool>(), 0u32..3, code_strategy()), 1..20),
    ) {
        let mut state = build(2, 2, true);
        let mut extended = false;
        for (extend, id, code) in ops {
            if extend {
                state.extend_timeout();
                extended = true;
            } else {
                state.record_response(VerifierId::new(id), code);
            }
            prop_assert_eq!(state.has_timeout_been_extended(), extended);
        }
    }

    /// Completion and allowance agree: a final verdict is Allowed exactly when install is allowed.
    #[test]
    fn verdict_matches_queries(
        required in 0u32..3,
        sufficient in 0u32..3,
        optional in any::<bool>(),
        answers in prop::collection::vec((0u32..3, code_strategy()), 0..8),
    ) {
        let mut state = build(required, sufficient, optional);
        let ids = responders(required, sufficient, optional);
        for (idx, code) in answers {
            if let Some(&id) = ids.get(idx as usize) {
                state.record_response(id, code);
            }
        }
        match state.verdict() {
            Verdict::Pending => prop_assert!(!state.is_verification_complete()),
            Verdict::Allowed => prop_assert!(state.is_install_allowed()),
            Verdict::Rejected => prop_assert!(!state.is_install_allowed()),
        }
    }
}
