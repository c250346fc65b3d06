#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use verigate_types::{ResponseCode, SessionId, VerifierId, VerifierRole};
use verigate_verification::{Verdict, VerificationState};

#[derive(Arbitrary, Debug)]
enum Op {
    Register { uid: u8, role: u8 },
    Respond { uid: u8, code: i8 },
    ForcePass,
    Extend,
    Integrity { code: i8 },
}

// Drive the tracker with arbitrary registrations and responses.
// It must never panic, and the verdict must agree with the raw queries.
fuzz_target!(|ops: Vec<Op>| {
    let mut state = VerificationState::new(SessionId::new(0));
    let mut extended = false;

    for op in ops {
        match op {
            Op::Register { uid, role } => {
                let role = match role % 3 {
                    0 => VerifierRole::Required,
                    1 => VerifierRole::Sufficient,
                    _ => VerifierRole::Optional,
                };
                state.add_verifier(VerifierId::new(uid.into()), role);
            }
            Op::Respond { uid, code } => {
                let was_required = state.is_required_verifier(VerifierId::new(uid.into()));
                let outstanding = state.unresponded_required().len();
                state.record_response(
                    VerifierId::new(uid.into()),
                    ResponseCode::from_raw(code.into()),
                );
                assert!(state.unresponded_required().len() <= outstanding);
                if !was_required {
                    assert_eq!(state.unresponded_required().len(), outstanding);
                }
            }
            Op::ForcePass => {
                let outstanding = !state.unresponded_required().is_empty();
                assert_eq!(state.force_required_pass().is_err(), outstanding);
            }
            Op::Extend => {
                state.extend_timeout();
                extended = true;
            }
            Op::Integrity { code } => {
                state.set_integrity_verification_result(ResponseCode::from_raw(code.into()));
                assert!(state.is_integrity_verification_complete());
            }
        }

        assert_eq!(state.has_timeout_been_extended(), extended);
        match state.verdict() {
            Verdict::Pending => assert!(!state.is_verification_complete()),
            Verdict::Allowed => assert!(state.is_install_allowed()),
            Verdict::Rejected => assert!(!state.is_install_allowed()),
        }
    }
});
