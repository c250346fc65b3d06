//! Verifier roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::VerigateError;

/// How a verifier's answer counts toward the install decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifierRole {
    /// Must answer affirmatively. One rejection fails the install.
    Required,
    /// Member of a pool where one approval is enough.
    Sufficient,
    /// The single optional verifier. Its answer can veto.
    Optional,
}

impl VerifierRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Sufficient => "sufficient",
            Self::Optional => "optional",
        }
    }
}

impl fmt::Display for VerifierRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerifierRole {
    type Err = VerigateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "required" => Ok(Self::Required),
            "sufficient" => Ok(Self::Sufficient),
            "optional" => Ok(Self::Optional),
            _ => Err(VerigateError::InvalidRole(s.to_string())),
        }
    }
}
