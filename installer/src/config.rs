//! Installer configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use verigate_types::ResponseCode;
use verigate_utils::LogFormat;
use verigate_verification::PendingSufficientPolicy;

use crate::InstallerError;

/// Configuration for the verification service.
///
/// Can be loaded from a TOML file via [`InstallerConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerConfig {
    /// How long a session waits for its verifiers, in milliseconds.
    #[serde(default = "default_verification_timeout_ms")]
    pub verification_timeout_ms: u64,

    /// Longest delay a single extension request may ask for, in milliseconds.
    #[serde(default = "default_max_extension_ms")]
    pub max_extension_ms: u64,

    /// Answer recorded for each silent required verifier when the deadline passes.
    #[serde(default = "default_timeout_response")]
    pub default_timeout_response: ResponseCode,

    /// Install decision while the sufficient pool has not resolved.
    #[serde(default)]
    pub pending_sufficient_policy: PendingSufficientPolicy,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_verification_timeout_ms() -> u64 {
    10_000
}

fn default_max_extension_ms() -> u64 {
    60 * 60 * 1000
}

fn default_timeout_response() -> ResponseCode {
    ResponseCode::REJECT
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl InstallerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, InstallerError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, InstallerError> {
        let config: Self = toml::from_str(s).map_err(|e| InstallerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, InstallerError> {
        toml::to_string_pretty(self).map_err(|e| InstallerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), InstallerError> {
        if self.verification_timeout_ms == 0 {
            return Err(InstallerError::Config(
                "verification_timeout_ms must be greater than zero".into(),
            ));
        }
        // Answering every silent required verifier with a waiver would empty
        // the sufficient pool and approve a session nobody answered.
        if self.default_timeout_response == ResponseCode::AllowWithoutSufficient {
            return Err(InstallerError::Config(
                "default_timeout_response must be \"allow\" or a rejection code".into(),
            ));
        }
        Ok(())
    }
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            verification_timeout_ms: default_verification_timeout_ms(),
            max_extension_ms: default_max_extension_ms(),
            default_timeout_response: default_timeout_response(),
            pending_sufficient_policy: PendingSufficientPolicy::default(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
