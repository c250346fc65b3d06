//! Opaque identities for verifiers and install sessions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::VerigateError;

/// Identity of a verifier agent (the verifier package's uid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerifierId(u32);

impl VerifierId {
    pub const fn new(uid: u32) -> Self {
        Self(uid)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for VerifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uid:{}", self.0)
    }
}

impl From<u32> for VerifierId {
    fn from(uid: u32) -> Self {
        Self(uid)
    }
}

impl FromStr for VerifierId {
    type Err = VerigateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("uid:").unwrap_or(s);
        raw.parse::<u32>()
            .map(Self)
            .map_err(|_| VerigateError::InvalidId(s.to_string()))
    }
}

/// Identity of the install session a verification belongs to.
///
/// Owned by the installer; the tracker only carries it around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
