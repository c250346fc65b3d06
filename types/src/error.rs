//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for parsing shared types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerigateError {
    #[error("invalid response code: {0}")]
    InvalidResponseCode(String),

    #[error("invalid verifier role: {0}")]
    InvalidRole(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}
