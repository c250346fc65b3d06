//! Package verification consensus.
//!
//! An install waits on several independent verifiers before it may proceed:
//! 1. **Required** verifiers: every one must answer affirmatively.
//! 2. **Sufficient** verifiers: one approval from the pool is enough.
//! 3. An **optional** verifier: at most one, its rejection vetoes the install.
//! 4. An **integrity** check, tracked to completion on its own axis.
//!
//! [`VerificationState`] folds responses arriving in any order into a single
//! completion flag and a single allow/deny decision.

pub mod error;
pub mod outcome;
pub mod policy;
pub mod state;

pub use error::VerificationError;
pub use outcome::{AxisReport, AxisStatus, ResponseDisposition, Verdict};
pub use policy::PendingSufficientPolicy;
pub use state::VerificationState;
