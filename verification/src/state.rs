//! Verification consensus state for a single install session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, trace};
use verigate_types::{ResponseCode, SessionId, VerifierId, VerifierRole};

use crate::error::VerificationError;
use crate::outcome::{AxisReport, AxisStatus, ResponseDisposition, Verdict};
use crate::policy::PendingSufficientPolicy;

/// Tracks verifier agreement for one pending install.
///
/// A verification has zero or more required verifiers, zero or more sufficient
/// verifiers and at most one optional verifier. Only one of the sufficient
/// verifiers must answer affirmatively. With no sufficient verifiers the
/// sufficient axis is trivially complete.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationState {
    session: SessionId,
    policy: PendingSufficientPolicy,

    required: BTreeSet<VerifierId>,
    unresponded_required: BTreeSet<VerifierId>,
    required_complete: bool,
    required_passed: bool,

    sufficient: BTreeSet<VerifierId>,
    had_sufficient: bool,
    sufficient_complete: bool,
    sufficient_passed: bool,

    optional: Option<VerifierId>,
    optional_complete: bool,
    optional_passed: bool,

    timeout_extended: bool,

    /// The integrity code is kept for review only; it does not affect the verdict.
    integrity_result: Option<ResponseCode>,
}

impl VerificationState {
    pub fn new(session: SessionId) -> Self {
        Self::with_policy(session, PendingSufficientPolicy::default())
    }

    pub fn with_policy(session: SessionId, policy: PendingSufficientPolicy) -> Self {
        Self {
            session,
            policy,
            required: BTreeSet::new(),
            unresponded_required: BTreeSet::new(),
            required_complete: false,
            // Passing until a required verifier says otherwise.
            required_passed: true,
            sufficient: BTreeSet::new(),
            had_sufficient: false,
            sufficient_complete: false,
            sufficient_passed: false,
            optional: None,
            optional_complete: false,
            optional_passed: false,
            timeout_extended: false,
            integrity_result: None,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn policy(&self) -> PendingSufficientPolicy {
        self.policy
    }

    // ── Registration ────────────────────────────────────────────────────

    pub fn add_required_verifier(&mut self, id: VerifierId) {
        self.required.insert(id);
        self.unresponded_required.insert(id);
    }

    pub fn add_sufficient_verifier(&mut self, id: VerifierId) {
        self.sufficient.insert(id);
        self.had_sufficient = true;
    }

    /// Set the optional verifier. A second call replaces the first.
    pub fn add_optional_verifier(&mut self, id: VerifierId) {
        self.optional = Some(id);
    }

    pub fn add_verifier(&mut self, id: VerifierId, role: VerifierRole) {
        match role {
            VerifierRole::Required => self.add_required_verifier(id),
            VerifierRole::Sufficient => self.add_sufficient_verifier(id),
            VerifierRole::Optional => self.add_optional_verifier(id),
        }
    }

    pub fn is_required_verifier(&self, id: VerifierId) -> bool {
        self.required.contains(&id)
    }

    /// Membership in the sufficient pool as it stands now, after removals.
    pub fn is_sufficient_verifier(&self, id: VerifierId) -> bool {
        self.sufficient.contains(&id)
    }

    pub fn is_optional_verifier(&self, id: VerifierId) -> bool {
        self.optional == Some(id)
    }

    /// Whether `id` is a verifier of this session in any role.
    pub fn is_registered(&self, id: VerifierId) -> bool {
        self.is_required_verifier(id)
            || self.is_optional_verifier(id)
            || self.is_sufficient_verifier(id)
    }

    pub fn has_verifiers(&self) -> bool {
        !self.required.is_empty() || self.optional.is_some() || self.had_sufficient
    }

    pub fn unresponded_required(&self) -> Vec<VerifierId> {
        self.unresponded_required.iter().copied().collect()
    }

    pub fn sufficient_remaining(&self) -> Vec<VerifierId> {
        self.sufficient.iter().copied().collect()
    }

    pub fn optional_verifier(&self) -> Option<VerifierId> {
        self.optional
    }

    // ── Responses ───────────────────────────────────────────────────────

    /// Record a verifier's answer.
    ///
    /// Returns `true` if the response was counted. Unknown verifiers and
    /// verifiers that already answered return `false` and leave the state
    /// untouched.
    pub fn record_response(&mut self, id: VerifierId, code: ResponseCode) -> bool {
        self.apply_response(id, code).is_accepted()
    }

    /// Record a verifier's answer and report how it was handled.
    ///
    /// Roles are checked in order: required, then optional, then sufficient.
    pub fn apply_response(&mut self, id: VerifierId, code: ResponseCode) -> ResponseDisposition {
        if self.required.contains(&id) {
            if !self.unresponded_required.remove(&id) {
                return ResponseDisposition::Duplicate(VerifierRole::Required);
            }
            self.apply_required(id, code);
            return ResponseDisposition::Accepted(VerifierRole::Required);
        }

        if self.optional == Some(id) {
            if self.optional_complete {
                return ResponseDisposition::Duplicate(VerifierRole::Optional);
            }
            self.optional_complete = true;
            self.optional_passed = code == ResponseCode::Allow;
            debug!(
                session = %self.session,
                verifier = %id,
                %code,
                passed = self.optional_passed,
                "optional verifier answered"
            );
            return ResponseDisposition::Accepted(VerifierRole::Optional);
        }

        if self.sufficient.remove(&id) {
            if code == ResponseCode::Allow {
                self.sufficient_passed = true;
                self.sufficient_complete = true;
            }
            if self.sufficient.is_empty() {
                self.sufficient_complete = true;
            }
            debug!(
                session = %self.session,
                verifier = %id,
                %code,
                remaining = self.sufficient.len(),
                complete = self.sufficient_complete,
                "sufficient verifier answered"
            );
            return ResponseDisposition::Accepted(VerifierRole::Sufficient);
        }

        trace!(session = %self.session, verifier = %id, %code, "response from unknown verifier");
        ResponseDisposition::Unrecognized
    }

    fn apply_required(&mut self, id: VerifierId, code: ResponseCode) {
        match code {
            ResponseCode::AllowWithoutSufficient => {
                if !self.sufficient.is_empty() {
                    debug!(
                        session = %self.session,
                        verifier = %id,
                        waived = self.sufficient.len(),
                        "sufficient verifiers waived"
                    );
                }
                self.sufficient.clear();
            }
            ResponseCode::Allow => {}
            ResponseCode::Other(_) => self.required_passed = false,
        }
        if self.unresponded_required.is_empty() {
            self.required_complete = true;
        }
        debug!(
            session = %self.session,
            verifier = %id,
            %code,
            outstanding = self.unresponded_required.len(),
            passed = self.required_passed,
            "required verifier answered"
        );
    }

    /// Mark required verification as passed, overriding any rejection.
    ///
    /// Only valid once every required verifier has answered.
    pub fn force_required_pass(&mut self) -> Result<(), VerificationError> {
        if !self.unresponded_required.is_empty() {
            return Err(VerificationError::RequiredVerifiersOutstanding {
                remaining: self.unresponded_required.len(),
            });
        }
        self.required_passed = true;
        self.required_complete = true;
        debug!(session = %self.session, "required verification forced to pass");
        Ok(())
    }

    // ── Decision ────────────────────────────────────────────────────────

    /// Whether every verifier the decision depends on has answered.
    ///
    /// The integrity axis is not included; see [`Self::are_all_verifications_complete`].
    pub fn is_verification_complete(&self) -> bool {
        if !self.required.is_empty() && !self.required_complete {
            return false;
        }
        if self.optional.is_some() && !self.optional_complete {
            return false;
        }
        if self.sufficient.is_empty() {
            return true;
        }
        self.sufficient_complete
    }

    /// Whether the install may proceed.
    ///
    /// Before [`Self::is_verification_complete`] holds, the answer depends on
    /// the [`PendingSufficientPolicy`].
    pub fn is_install_allowed(&self) -> bool {
        if self.policy == PendingSufficientPolicy::FailClosed && !self.is_verification_complete() {
            return false;
        }
        if !self.required.is_empty() && (!self.required_complete || !self.required_passed) {
            return false;
        }
        if self.optional.is_some() && !self.optional_passed {
            return false;
        }
        if self.sufficient_complete {
            return self.sufficient_passed;
        }
        true
    }

    pub fn verdict(&self) -> Verdict {
        if !self.is_verification_complete() {
            Verdict::Pending
        } else if self.is_install_allowed() {
            Verdict::Allowed
        } else {
            Verdict::Rejected
        }
    }

    // ── Timeout and integrity ───────────────────────────────────────────

    /// Mark the timeout as extended. Once set it stays set.
    pub fn extend_timeout(&mut self) {
        if !self.timeout_extended {
            self.timeout_extended = true;
        }
    }

    pub fn has_timeout_been_extended(&self) -> bool {
        self.timeout_extended
    }

    /// Record the integrity check result. Any code completes the integrity axis.
    pub fn set_integrity_verification_result(&mut self, code: ResponseCode) {
        self.integrity_result = Some(code);
    }

    pub fn is_integrity_verification_complete(&self) -> bool {
        self.integrity_result.is_some()
    }

    pub fn integrity_result(&self) -> Option<ResponseCode> {
        self.integrity_result
    }

    pub fn are_all_verifications_complete(&self) -> bool {
        self.is_integrity_verification_complete() && self.is_verification_complete()
    }

    // ── Reporting ───────────────────────────────────────────────────────

    pub fn axis_report(&self) -> AxisReport {
        let required = if self.required.is_empty() {
            AxisStatus::Absent
        } else if !self.required_complete {
            AxisStatus::Pending
        } else if self.required_passed {
            AxisStatus::Passed
        } else {
            AxisStatus::Failed
        };

        let sufficient = if !self.had_sufficient {
            AxisStatus::Absent
        } else if self.sufficient_complete {
            if self.sufficient_passed {
                AxisStatus::Passed
            } else {
                AxisStatus::Failed
            }
        } else if self.sufficient.is_empty() {
            // Waived by AllowWithoutSufficient.
            AxisStatus::Passed
        } else {
            AxisStatus::Pending
        };

        let optional = match self.optional {
            None => AxisStatus::Absent,
            Some(_) if !self.optional_complete => AxisStatus::Pending,
            Some(_) if self.optional_passed => AxisStatus::Passed,
            Some(_) => AxisStatus::Failed,
        };

        let integrity = if self.is_integrity_verification_complete() {
            AxisStatus::Complete
        } else {
            AxisStatus::Pending
        };

        AxisReport {
            required,
            sufficient,
            optional,
            integrity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u32) -> VerifierId {
        VerifierId::new(n)
    }

    fn state() -> VerificationState {
        VerificationState::new(SessionId::new(1))
    }

    // ── Initial state ───────────────────────────────────────────────────

    #[test]
    fn empty_state_is_complete_and_allowed() {
        let s = state();
        assert!(s.is_verification_complete());
        assert!(s.is_install_allowed());
        assert!(!s.has_verifiers());
        assert!(!s.has_timeout_been_extended());
        assert!(!s.are_all_verifications_complete());
    }

    #[test]
    fn membership_queries() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        s.add_sufficient_verifier(uid(2));
        s.add_optional_verifier(uid(3));

        assert!(s.is_required_verifier(uid(1)));
        assert!(!s.is_required_verifier(uid(2)));
        assert!(s.is_sufficient_verifier(uid(2)));
        assert!(s.is_optional_verifier(uid(3)));
        assert!(s.is_registered(uid(3)));
        assert!(!s.is_registered(uid(4)));
    }

    #[test]
    fn duplicate_required_registration_is_harmless() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        s.add_required_verifier(uid(1));
        assert_eq!(s.unresponded_required(), vec![uid(1)]);
        assert!(s.record_response(uid(1), ResponseCode::Allow));
        assert!(s.is_verification_complete());
    }

    // ── Required axis ───────────────────────────────────────────────────

    #[test]
    fn required_completes_when_all_answer() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        s.add_required_verifier(uid(2));

        assert!(s.record_response(uid(1), ResponseCode::Allow));
        assert!(!s.is_verification_complete());
        assert!(!s.is_install_allowed());

        assert!(s.record_response(uid(2), ResponseCode::Allow));
        assert!(s.is_verification_complete());
        assert!(s.is_install_allowed());
        assert_eq!(s.verdict(), Verdict::Allowed);
    }

    #[test]
    fn one_required_rejection_is_sticky() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        s.add_required_verifier(uid(2));

        s.record_response(uid(1), ResponseCode::REJECT);
        s.record_response(uid(2), ResponseCode::Allow);
        assert!(s.is_verification_complete());
        assert!(!s.is_install_allowed());
        assert_eq!(s.axis_report().required, AxisStatus::Failed);
    }

    #[test]
    fn repeated_required_answer_cannot_flip_verdict() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        assert!(s.record_response(uid(1), ResponseCode::Allow));

        assert_eq!(
            s.apply_response(uid(1), ResponseCode::REJECT),
            ResponseDisposition::Duplicate(VerifierRole::Required)
        );
        assert!(s.is_install_allowed());
    }

    #[test]
    fn allow_without_sufficient_waives_pool() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        s.add_sufficient_verifier(uid(10));
        s.add_sufficient_verifier(uid(11));

        s.record_response(uid(1), ResponseCode::AllowWithoutSufficient);
        assert!(s.sufficient_remaining().is_empty());
        assert!(!s.record_response(uid(10), ResponseCode::Allow));
        assert!(s.is_verification_complete());
        assert!(s.is_install_allowed());
        assert_eq!(s.axis_report().sufficient, AxisStatus::Passed);
    }

    #[test]
    fn waiver_after_sufficient_rejection_still_allows() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        s.add_sufficient_verifier(uid(10));
        s.add_sufficient_verifier(uid(11));

        s.record_response(uid(10), ResponseCode::REJECT);
        s.record_response(uid(1), ResponseCode::AllowWithoutSufficient);
        assert_eq!(s.verdict(), Verdict::Allowed);
    }

    // ── Force pass ──────────────────────────────────────────────────────

    #[test]
    fn force_pass_rejected_while_outstanding() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        s.add_required_verifier(uid(2));
        s.record_response(uid(1), ResponseCode::Allow);

        assert_eq!(
            s.force_required_pass(),
            Err(VerificationError::RequiredVerifiersOutstanding { remaining: 1 })
        );
        assert!(!s.is_verification_complete());
    }

    #[test]
    fn force_pass_overrides_rejection() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        s.record_response(uid(1), ResponseCode::REJECT);
        assert!(!s.is_install_allowed());

        s.force_required_pass().unwrap();
        assert!(s.is_install_allowed());
        assert_eq!(s.axis_report().required, AxisStatus::Passed);
    }

    // ── Optional axis ───────────────────────────────────────────────────

    #[test]
    fn optional_requires_plain_allow() {
        let mut s = state();
        s.add_optional_verifier(uid(7));
        s.record_response(uid(7), ResponseCode::AllowWithoutSufficient);
        assert!(s.is_verification_complete());
        assert!(!s.is_install_allowed());
        assert_eq!(s.axis_report().optional, AxisStatus::Failed);
    }

    #[test]
    fn optional_answers_once() {
        let mut s = state();
        s.add_optional_verifier(uid(7));
        assert!(s.record_response(uid(7), ResponseCode::Allow));
        assert_eq!(
            s.apply_response(uid(7), ResponseCode::REJECT),
            ResponseDisposition::Duplicate(VerifierRole::Optional)
        );
        assert!(s.is_install_allowed());
    }

    #[test]
    fn second_optional_registration_replaces_first() {
        let mut s = state();
        s.add_optional_verifier(uid(7));
        s.add_optional_verifier(uid(8));
        assert_eq!(s.optional_verifier(), Some(uid(8)));
        assert!(!s.record_response(uid(7), ResponseCode::Allow));
        assert!(s.record_response(uid(8), ResponseCode::Allow));
    }

    #[test]
    fn required_role_takes_priority_over_optional() {
        let mut s = state();
        s.add_required_verifier(uid(3));
        s.add_optional_verifier(uid(3));
        assert_eq!(
            s.apply_response(uid(3), ResponseCode::Allow),
            ResponseDisposition::Accepted(VerifierRole::Required)
        );
        // The optional slot never got its answer.
        assert!(!s.is_verification_complete());
    }

    // ── Sufficient axis ─────────────────────────────────────────────────

    #[test]
    fn one_sufficient_allow_resolves_pool() {
        let mut s = state();
        s.add_sufficient_verifier(uid(10));
        s.add_sufficient_verifier(uid(11));
        s.add_sufficient_verifier(uid(12));

        s.record_response(uid(11), ResponseCode::Allow);
        assert!(s.is_verification_complete());
        assert!(s.is_install_allowed());
        // The others are still members and may still answer.
        assert!(s.is_sufficient_verifier(uid(10)));
        assert!(s.record_response(uid(10), ResponseCode::REJECT));
        assert!(s.is_install_allowed());
    }

    #[test]
    fn sufficient_response_counts_once() {
        let mut s = state();
        s.add_sufficient_verifier(uid(10));
        s.add_sufficient_verifier(uid(11));
        assert!(s.record_response(uid(10), ResponseCode::REJECT));
        assert_eq!(
            s.apply_response(uid(10), ResponseCode::Allow),
            ResponseDisposition::Unrecognized
        );
    }

    // ── Pending sufficient policy ───────────────────────────────────────

    #[test]
    fn fail_closed_denies_pending_sufficient() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        s.add_sufficient_verifier(uid(10));
        s.record_response(uid(1), ResponseCode::Allow);

        assert!(!s.is_verification_complete());
        assert!(!s.is_install_allowed());
        assert_eq!(s.verdict(), Verdict::Pending);
    }

    #[test]
    fn permissive_allows_pending_sufficient() {
        let mut s =
            VerificationState::with_policy(SessionId::new(1), PendingSufficientPolicy::Permissive);
        s.add_required_verifier(uid(1));
        s.add_sufficient_verifier(uid(10));
        s.record_response(uid(1), ResponseCode::Allow);

        assert!(!s.is_verification_complete());
        assert!(s.is_install_allowed());
        // The verdict still waits for completion.
        assert_eq!(s.verdict(), Verdict::Pending);
    }

    #[test]
    fn permissive_still_requires_required_completion() {
        let mut s =
            VerificationState::with_policy(SessionId::new(1), PendingSufficientPolicy::Permissive);
        s.add_required_verifier(uid(1));
        assert!(!s.is_install_allowed());
    }

    // ── Timeout and integrity ───────────────────────────────────────────

    #[test]
    fn timeout_extension_is_monotonic() {
        let mut s = state();
        s.extend_timeout();
        s.extend_timeout();
        assert!(s.has_timeout_been_extended());
    }

    #[test]
    fn any_integrity_code_completes_integrity() {
        let mut s = state();
        s.set_integrity_verification_result(ResponseCode::REJECT);
        assert!(s.is_integrity_verification_complete());
        assert!(s.are_all_verifications_complete());
        assert_eq!(s.integrity_result(), Some(ResponseCode::REJECT));
        assert!(s.is_install_allowed());
    }

    #[test]
    fn all_complete_needs_both_axes() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        s.set_integrity_verification_result(ResponseCode::Allow);
        assert!(!s.are_all_verifications_complete());
        s.record_response(uid(1), ResponseCode::Allow);
        assert!(s.are_all_verifications_complete());
    }

    #[test]
    fn report_for_fresh_session() {
        let mut s = state();
        s.add_required_verifier(uid(1));
        assert_eq!(
            s.axis_report(),
            AxisReport {
                required: AxisStatus::Pending,
                sufficient: AxisStatus::Absent,
                optional: AxisStatus::Absent,
                integrity: AxisStatus::Pending,
            }
        );
    }
}
