//! Verdicts and per-axis status snapshots.

use serde::{Deserialize, Serialize};
use verigate_types::VerifierRole;

/// What happened to a single verifier response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseDisposition {
    /// The response was counted for the given role.
    Accepted(VerifierRole),
    /// The verifier already answered; the response was ignored.
    Duplicate(VerifierRole),
    /// The verifier is not (or no longer) part of this verification.
    Unrecognized,
}

impl ResponseDisposition {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// The combined install decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Still waiting on at least one verifier.
    Pending,
    /// Verification complete and the install may proceed.
    Allowed,
    /// Verification complete and the install must be aborted.
    Rejected,
}

impl Verdict {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Status of one verification axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisStatus {
    /// No verifier of this kind was registered.
    Absent,
    Pending,
    Passed,
    Failed,
    /// Finished without a pass/fail meaning (integrity).
    Complete,
}

/// Snapshot of all four axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisReport {
    pub required: AxisStatus,
    pub sufficient: AxisStatus,
    pub optional: AxisStatus,
    pub integrity: AxisStatus,
}
