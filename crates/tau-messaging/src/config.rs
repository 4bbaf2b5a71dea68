use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DEEP_LINK_SCHEME: &str = "tau";
pub const DEFAULT_EXPERIMENT_FEATURE_ID: &str = "messaging";

/// Host-level settings for a `MessageManager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Scheme prefixed to press actions of the form `://...`.
    pub deep_link_scheme: String,
    /// Feature id carried on exposure events.
    pub experiment_feature_id: String,
    /// Current app session; repeated displays within it count as one impression.
    pub session_id: Option<String>,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            deep_link_scheme: DEFAULT_DEEP_LINK_SCHEME.to_string(),
            experiment_feature_id: DEFAULT_EXPERIMENT_FEATURE_ID.to_string(),
            session_id: None,
        }
    }
}

impl MessagingConfig {
    pub fn validate(&self) -> Result<()> {
        let scheme = self.deep_link_scheme.as_str();
        let Some(first) = scheme.chars().next() else {
            bail!("deep_link_scheme cannot be empty");
        };
        if !first.is_ascii_alphabetic() {
            bail!("deep_link_scheme must start with an ASCII letter");
        }
        if scheme
            .chars()
            .any(|ch| !(ch.is_ascii_alphanumeric() || ch == '+' || ch == '-' || ch == '.'))
        {
            bail!("deep_link_scheme contains unsupported characters");
        }
        if self.experiment_feature_id.trim().is_empty() {
            bail!("experiment_feature_id cannot be empty");
        }
        Ok(())
    }
}
