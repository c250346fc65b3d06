use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("required verifiers still outstanding: {remaining}")]
    RequiredVerifiersOutstanding { remaining: usize },
}
