//! How [`VerificationState::is_install_allowed`](crate::VerificationState::is_install_allowed)
//! answers before verification is complete.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingSufficientPolicy {
    /// Deny while any axis is still waiting on a verifier.
    #[default]
    FailClosed,
    /// Treat a sufficient pool that has not resolved yet as non-blocking.
    /// Required and optional verifiers are still honoured.
    Permissive,
}
