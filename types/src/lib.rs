//! Fundamental types for package verification consensus.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! verifier and session identities, response codes, verifier roles, and timestamps.

pub mod error;
pub mod id;
pub mod response;
pub mod role;
pub mod time;

pub use error::VerigateError;
pub use id::{SessionId, VerifierId};
pub use response::ResponseCode;
pub use role::VerifierRole;
pub use time::Timestamp;
