use thiserror::Error;
use verigate_types::SessionId;

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("verification error: {0}")]
    Verification(#[from] verigate_verification::VerificationError),

    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    #[error("session {0} already exists")]
    SessionExists(SessionId),

    #[error("session {0} already has a final verdict")]
    SessionClosed(SessionId),

    #[error("session {0} has no verifiers")]
    NoVerifiers(SessionId),

    #[error("extension for {session} exceeds maximum of {max_ms}ms")]
    ExtensionLimit { session: SessionId, max_ms: u64 },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
