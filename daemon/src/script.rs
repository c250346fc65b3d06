//! Replay scripts: scripted sessions and timed verifier actions, in TOML.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::path::Path;

use verigate_types::{ResponseCode, SessionId, VerifierId, VerifierRole};

#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default, rename = "session")]
    pub sessions: Vec<ScriptedSession>,
}

#[derive(Debug, Deserialize)]
pub struct ScriptedSession {
    pub id: SessionId,
    pub verifiers: Vec<ScriptedVerifier>,
    /// Integrity result, delivered when the session starts.
    #[serde(default)]
    pub integrity: Option<ResponseCode>,
    #[serde(default, rename = "response")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct ScriptedVerifier {
    pub id: VerifierId,
    pub role: VerifierRole,
}

/// One verifier action, `after_ms` after the session starts.
#[derive(Debug, Deserialize)]
pub struct Step {
    pub verifier: VerifierId,
    #[serde(default)]
    pub after_ms: u64,
    #[serde(default)]
    pub code: Option<ResponseCode>,
    #[serde(default)]
    pub extend_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Respond(ResponseCode),
    Extend(u64),
}

impl Step {
    pub fn action(&self) -> anyhow::Result<Action> {
        match (self.code, self.extend_ms) {
            (Some(code), None) => Ok(Action::Respond(code)),
            (None, Some(ms)) => Ok(Action::Extend(ms)),
            _ => bail!(
                "step for {} must set exactly one of `code` or `extend_ms`",
                self.verifier
            ),
        }
    }
}

impl Script {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid script {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let script: Self = toml::from_str(s)?;
        for session in &script.sessions {
            for step in &session.steps {
                step.action()?;
            }
        }
        Ok(script)
    }
}
