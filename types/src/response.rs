//! Verifier response codes.
//!
//! Verifier agents answer with a small integer. Only two values carry meaning
//! here; every other value is a failure and is kept verbatim for logging.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::VerigateError;

/// The answer a verifier gives for a pending install.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCode", into = "RawCode")]
pub enum ResponseCode {
    /// The package may be installed.
    Allow,
    /// The package may be installed, and the sufficient verifiers are waived.
    AllowWithoutSufficient,
    /// Any other code. Treated as a rejection.
    Other(i32),
}

impl ResponseCode {
    pub const RAW_ALLOW: i32 = 1;
    pub const RAW_ALLOW_WITHOUT_SUFFICIENT: i32 = 2;
    pub const RAW_REJECT: i32 = -1;

    /// The canonical rejection.
    pub const REJECT: Self = Self::Other(Self::RAW_REJECT);

    pub fn from_raw(raw: i32) -> Self {
        match raw {
            Self::RAW_ALLOW => Self::Allow,
            Self::RAW_ALLOW_WITHOUT_SUFFICIENT => Self::AllowWithoutSufficient,
            other => Self::Other(other),
        }
    }

    pub fn as_raw(&self) -> i32 {
        match self {
            Self::Allow => Self::RAW_ALLOW,
            Self::AllowWithoutSufficient => Self::RAW_ALLOW_WITHOUT_SUFFICIENT,
            Self::Other(raw) => *raw,
        }
    }

    /// Whether a required verifier giving this code keeps the required axis passing.
    pub fn is_affirmative(&self) -> bool {
        matches!(self, Self::Allow | Self::AllowWithoutSufficient)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::AllowWithoutSufficient => "allow_without_sufficient",
            Self::Other(Self::RAW_REJECT) => "reject",
            Self::Other(_) => "other",
        }
    }
}

impl From<i32> for ResponseCode {
    fn from(raw: i32) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(raw) if *raw != Self::RAW_REJECT => write!(f, "other({raw})"),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl FromStr for ResponseCode {
    type Err = VerigateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "allow_without_sufficient" => Ok(Self::AllowWithoutSufficient),
            "reject" => Ok(Self::REJECT),
            other => other
                .parse::<i32>()
                .map(Self::from_raw)
                .map_err(|_| VerigateError::InvalidResponseCode(s.to_string())),
        }
    }
}

/// Wire shape for config files: either a name or a raw integer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawCode {
    Raw(i32),
    Name(String),
}

impl TryFrom<RawCode> for ResponseCode {
    type Error = VerigateError;

    fn try_from(raw: RawCode) -> Result<Self, Self::Error> {
        match raw {
            RawCode::Raw(n) => Ok(Self::from_raw(n)),
            RawCode::Name(name) => name.parse(),
        }
    }
}

impl From<ResponseCode> for RawCode {
    fn from(code: ResponseCode) -> Self {
        match code {
            ResponseCode::Other(raw) if raw != ResponseCode::RAW_REJECT => RawCode::Raw(raw),
            named => RawCode::Name(named.as_str().to_string()),
        }
    }
}
