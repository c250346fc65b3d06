//! The verification service: every in-flight session behind a single lock.
//!
//! Verifier responses, extension requests and deadline ticks can arrive on
//! any task. Each call takes the lock, updates one session, queues events and
//! returns; nothing awaits while the lock is held.

use serde::Serialize;
use std::collections::{btree_map::Entry, BTreeMap};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use verigate_types::{ResponseCode, SessionId, Timestamp, VerifierId, VerifierRole};
use verigate_utils::{format_duration_ms, StatsCounter};
use verigate_verification::{AxisReport, ResponseDisposition, Verdict, VerificationState};

use crate::config::InstallerConfig;
use crate::error::InstallerError;
use crate::event::{RejectReason, VerificationEvent};

const STAT_NAMES: &[&str] = &[
    "sessions_started",
    "sessions_completed",
    "sessions_timed_out",
    "responses_accepted",
    "responses_duplicate",
    "responses_unrecognized",
    "responses_late",
    "timeouts_extended",
];

/// Result of feeding one response into a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseOutcome {
    /// `None` if the session had already timed out.
    pub disposition: Option<ResponseDisposition>,
    pub verdict: Verdict,
    /// Verifiers and integrity check are both done.
    pub all_complete: bool,
}

impl ResponseOutcome {
    pub fn recognized(&self) -> bool {
        self.disposition.is_some_and(|d| d.is_accepted())
    }
}

/// Final view of a session, handed out by [`VerificationService::finish_session`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session: SessionId,
    pub verdict: Verdict,
    pub axes: AxisReport,
    pub timed_out: bool,
    pub timeout_extended: bool,
    pub integrity_result: Option<ResponseCode>,
    pub started_at: Timestamp,
    pub deadline: Timestamp,
}

struct PendingSession {
    state: VerificationState,
    started_at: Timestamp,
    deadline: Timestamp,
    timed_out: bool,
    completion_reported: bool,
}

impl PendingSession {
    /// A timed-out session that is still missing answers is rejected.
    fn verdict(&self) -> Verdict {
        match self.state.verdict() {
            Verdict::Pending if self.timed_out => Verdict::Rejected,
            verdict => verdict,
        }
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            session: self.state.session(),
            verdict: self.verdict(),
            axes: self.state.axis_report(),
            timed_out: self.timed_out,
            timeout_extended: self.state.has_timeout_been_extended(),
            integrity_result: self.state.integrity_result(),
            started_at: self.started_at,
            deadline: self.deadline,
        }
    }
}

#[derive(Default)]
struct Inner {
    sessions: BTreeMap<SessionId, PendingSession>,
    pending_events: Vec<VerificationEvent>,
}

impl Inner {
    fn session_mut(&mut self, session: SessionId) -> Result<&mut PendingSession, InstallerError> {
        self.sessions
            .get_mut(&session)
            .ok_or(InstallerError::UnknownSession(session))
    }

    fn session(&self, session: SessionId) -> Result<&PendingSession, InstallerError> {
        self.sessions
            .get(&session)
            .ok_or(InstallerError::UnknownSession(session))
    }
}

/// Tracks every pending verification for one installer.
pub struct VerificationService {
    config: InstallerConfig,
    inner: Mutex<Inner>,
    stats: StatsCounter,
}

impl VerificationService {
    pub fn new(config: InstallerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
            stats: StatsCounter::new(STAT_NAMES),
        }
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Begin tracking a session. Returns its deadline.
    pub async fn start_session(
        &self,
        session: SessionId,
        verifiers: &[(VerifierId, VerifierRole)],
        now: Timestamp,
    ) -> Result<Timestamp, InstallerError> {
        let mut state =
            VerificationState::with_policy(session, self.config.pending_sufficient_policy);
        for &(id, role) in verifiers {
            if role == VerifierRole::Optional && state.optional_verifier().is_some() {
                warn!(%session, verifier = %id, "replacing registered optional verifier");
            }
            state.add_verifier(id, role);
        }
        if !state.has_verifiers() {
            return Err(InstallerError::NoVerifiers(session));
        }
        let deadline = now.saturating_add_ms(self.config.verification_timeout_ms);

        let mut inner = self.inner.lock().await;
        match inner.sessions.entry(session) {
            Entry::Occupied(_) => return Err(InstallerError::SessionExists(session)),
            Entry::Vacant(slot) => {
                slot.insert(PendingSession {
                    state,
                    started_at: now,
                    deadline,
                    timed_out: false,
                    completion_reported: false,
                });
            }
        }
        inner
            .pending_events
            .push(VerificationEvent::SessionStarted { session, deadline });
        self.stats.increment("sessions_started");

        info!(
            %session,
            verifiers = verifiers.len(),
            timeout = %format_duration_ms(self.config.verification_timeout_ms),
            "verification started"
        );
        Ok(deadline)
    }

    /// Feed one verifier response into a session.
    ///
    /// Unknown, repeated and late responses are not errors; they are logged,
    /// counted and reported as [`VerificationEvent::ResponseRejected`].
    pub async fn record_response(
        &self,
        session: SessionId,
        verifier: VerifierId,
        code: ResponseCode,
    ) -> Result<ResponseOutcome, InstallerError> {
        let mut inner = self.inner.lock().await;
        let pending = inner.session_mut(session)?;

        if pending.timed_out {
            let outcome = ResponseOutcome {
                disposition: None,
                verdict: pending.verdict(),
                all_complete: pending.state.are_all_verifications_complete(),
            };
            warn!(%session, %verifier, %code, "response after deadline ignored");
            self.stats.increment("responses_late");
            inner.pending_events.push(VerificationEvent::ResponseRejected {
                session,
                verifier,
                reason: RejectReason::TimedOut,
            });
            return Ok(outcome);
        }

        let disposition = pending.state.apply_response(verifier, code);
        let reason = match disposition {
            ResponseDisposition::Accepted(role) => {
                debug!(%session, %verifier, %role, %code, "response accepted");
                self.stats.increment("responses_accepted");
                None
            }
            ResponseDisposition::Duplicate(role) => {
                warn!(%session, %verifier, %role, %code, "duplicate response ignored");
                self.stats.increment("responses_duplicate");
                Some(RejectReason::Duplicate)
            }
            ResponseDisposition::Unrecognized => {
                warn!(%session, %verifier, %code, "response from unknown verifier ignored");
                self.stats.increment("responses_unrecognized");
                Some(RejectReason::Unrecognized)
            }
        };

        let outcome = ResponseOutcome {
            disposition: Some(disposition),
            verdict: pending.verdict(),
            all_complete: pending.state.are_all_verifications_complete(),
        };
        let completed = self.take_completion(pending);

        if let Some(reason) = reason {
            inner.pending_events.push(VerificationEvent::ResponseRejected {
                session,
                verifier,
                reason,
            });
        }
        if let Some(event) = completed {
            inner.pending_events.push(event);
        }
        Ok(outcome)
    }

    /// Handle a verifier's request for more time.
    ///
    /// Only the first extension of a session counts. Returns `false` when the
    /// request was ignored.
    pub async fn extend_timeout(
        &self,
        session: SessionId,
        verifier: VerifierId,
        extra_ms: u64,
        now: Timestamp,
    ) -> Result<bool, InstallerError> {
        if extra_ms > self.config.max_extension_ms {
            return Err(InstallerError::ExtensionLimit {
                session,
                max_ms: self.config.max_extension_ms,
            });
        }

        let mut inner = self.inner.lock().await;
        let pending = inner.session_mut(session)?;

        if !pending.state.is_registered(verifier) {
            warn!(%session, %verifier, "extension request from unknown verifier ignored");
            return Ok(false);
        }
        if pending.timed_out
            || pending.completion_reported
            || pending.state.has_timeout_been_extended()
        {
            debug!(%session, %verifier, "extension request ignored");
            return Ok(false);
        }

        pending.state.extend_timeout();
        pending.deadline = pending.deadline.max(now.saturating_add_ms(extra_ms));
        let new_deadline = pending.deadline;

        inner.pending_events.push(VerificationEvent::TimeoutExtended {
            session,
            new_deadline,
        });
        self.stats.increment("timeouts_extended");
        info!(
            %session,
            %verifier,
            extra = %format_duration_ms(extra_ms),
            "verification timeout extended"
        );
        Ok(true)
    }

    /// Record the integrity check result. Returns whether the session is now fully complete.
    pub async fn set_integrity_result(
        &self,
        session: SessionId,
        code: ResponseCode,
    ) -> Result<bool, InstallerError> {
        let mut inner = self.inner.lock().await;
        let pending = inner.session_mut(session)?;
        // The code is recorded but not judged here.
        pending.state.set_integrity_verification_result(code);
        debug!(%session, %code, "integrity verification complete");
        Ok(pending.state.are_all_verifications_complete())
    }

    /// Administrative override: pass the required axis of a session.
    ///
    /// Refused with [`InstallerError::SessionClosed`] once the session timed
    /// out or its completion was reported.
    pub async fn force_required_pass(&self, session: SessionId) -> Result<Verdict, InstallerError> {
        let mut inner = self.inner.lock().await;
        let pending = inner.session_mut(session)?;
        if pending.timed_out || pending.completion_reported {
            warn!(%session, verdict = ?pending.verdict(), "override on closed session refused");
            return Err(InstallerError::SessionClosed(session));
        }
        pending.state.force_required_pass()?;
        let verdict = pending.verdict();
        info!(%session, ?verdict, "required verification passed by override");
        if let Some(event) = self.take_completion(pending) {
            inner.pending_events.push(event);
        }
        Ok(verdict)
    }

    /// Time out every session whose deadline has passed.
    ///
    /// Silent required verifiers are answered with the configured default
    /// response. Returns the sessions that timed out, in id order.
    pub async fn expire(&self, now: Timestamp) -> Vec<SessionId> {
        // A timeout never waives the sufficient pool.
        let default = match self.config.default_timeout_response {
            ResponseCode::AllowWithoutSufficient => ResponseCode::Allow,
            code => code,
        };
        let mut inner = self.inner.lock().await;
        let mut expired = Vec::new();
        let mut events = Vec::new();

        for (&session, pending) in inner.sessions.iter_mut() {
            if pending.timed_out || pending.completion_reported || now < pending.deadline {
                continue;
            }
            let silent = pending.state.unresponded_required();
            for &verifier in &silent {
                pending.state.apply_response(verifier, default);
            }
            pending.timed_out = true;
            warn!(
                %session,
                silent_required = silent.len(),
                default = %default,
                waited = %format_duration_ms(pending.started_at.elapsed_since(now)),
                "verification timed out"
            );
            self.stats.increment("sessions_timed_out");
            events.push(VerificationEvent::SessionTimedOut { session });
            if let Some(event) = self.take_completion(pending) {
                events.push(event);
            }
            expired.push(session);
        }

        inner.pending_events.extend(events);
        expired
    }

    /// Emit the completion event once the verdict is final.
    fn take_completion(&self, pending: &mut PendingSession) -> Option<VerificationEvent> {
        let verdict = pending.verdict();
        if pending.completion_reported || !verdict.is_final() {
            return None;
        }
        pending.completion_reported = true;
        self.stats.increment("sessions_completed");
        let session = pending.state.session();
        info!(%session, ?verdict, timed_out = pending.timed_out, "verification complete");
        Some(VerificationEvent::SessionCompleted { session, verdict })
    }

    pub async fn verdict(&self, session: SessionId) -> Result<Verdict, InstallerError> {
        let inner = self.inner.lock().await;
        Ok(inner.session(session)?.verdict())
    }

    pub async fn axis_report(&self, session: SessionId) -> Result<AxisReport, InstallerError> {
        let inner = self.inner.lock().await;
        Ok(inner.session(session)?.state.axis_report())
    }

    pub async fn summary(&self, session: SessionId) -> Result<SessionSummary, InstallerError> {
        let inner = self.inner.lock().await;
        Ok(inner.session(session)?.summary())
    }

    /// Stop tracking a session and return its final summary.
    pub async fn finish_session(
        &self,
        session: SessionId,
    ) -> Result<SessionSummary, InstallerError> {
        let mut inner = self.inner.lock().await;
        let pending = inner
            .sessions
            .remove(&session)
            .ok_or(InstallerError::UnknownSession(session))?;
        let summary = pending.summary();
        info!(%session, verdict = ?summary.verdict, "verification session finished");
        Ok(summary)
    }

    /// Earliest deadline among sessions still waiting.
    pub async fn next_deadline(&self) -> Option<Timestamp> {
        let inner = self.inner.lock().await;
        inner
            .sessions
            .values()
            .filter(|p| !p.timed_out && !p.completion_reported)
            .map(|p| p.deadline)
            .min()
    }

    /// Drain pending events for the installer to process.
    pub async fn drain_events(&self) -> Vec<VerificationEvent> {
        let mut inner = self.inner.lock().await;
        std::mem::take(&mut inner.pending_events)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> BTreeMap<&'static str, u64> {
        self.stats.snapshot()
    }
}
