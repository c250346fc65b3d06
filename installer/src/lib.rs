//! Installer-side verification service.
//!
//! Owns every in-flight verification behind one lock, feeds it verifier
//! responses, applies deadlines and extensions, and reports verdicts as events.

pub mod config;
pub mod error;
pub mod event;
pub mod service;

pub use config::InstallerConfig;
pub use error::InstallerError;
pub use event::{RejectReason, VerificationEvent};
pub use service::{ResponseOutcome, SessionSummary, VerificationService};
