//! Events emitted by the service for the installer to act on.

use serde::Serialize;
use verigate_types::{SessionId, Timestamp, VerifierId};
use verigate_verification::Verdict;

/// Why a verifier response was not counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The verifier already answered.
    Duplicate,
    /// The verifier is not part of the session.
    Unrecognized,
    /// The session deadline already passed.
    TimedOut,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VerificationEvent {
    SessionStarted {
        session: SessionId,
        deadline: Timestamp,
    },
    ResponseRejected {
        session: SessionId,
        verifier: VerifierId,
        reason: RejectReason,
    },
    TimeoutExtended {
        session: SessionId,
        new_deadline: Timestamp,
    },
    SessionTimedOut {
        session: SessionId,
    },
    /// Emitted once per session, when its verdict becomes final.
    SessionCompleted {
        session: SessionId,
        verdict: Verdict,
    },
}

impl VerificationEvent {
    pub fn session(&self) -> SessionId {
        match self {
            Self::SessionStarted { session, .. }
            | Self::ResponseRejected { session, .. }
            | Self::TimeoutExtended { session, .. }
            | Self::SessionTimedOut { session }
            | Self::SessionCompleted { session, .. } => *session,
        }
    }
}
