//! Engine settings
//!
//! Settings are fixed once an engine is built. They can be set directly,
//! loaded from `LAYERED_CONFIG_*` environment variables, or read from a TOML
//! file:
//!
//! ```toml
//! aws_prefix = "BILLING_"
//! secretsmanager_prefix = "prod/billing"
//! aws_session_required = false
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_AWS_PREFIX: &str = "LAYERED_CONFIG_AWS_PREFIX";
pub const ENV_SECRETSMANAGER_PREFIX: &str = "LAYERED_CONFIG_SECRETSMANAGER_PREFIX";
pub const ENV_SESSION_REQUIRED: &str = "LAYERED_CONFIG_SESSION_REQUIRED";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Prepended to every AWS credential variable name
    pub aws_prefix: String,
    /// Prepended, with a `/`, to every secret identifier
    pub secretsmanager_prefix: Option<String>,
    /// Fail bootstrap unless a full session (keys, token, region) is available
    pub aws_session_required: bool,
}

impl EngineSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from `LAYERED_CONFIG_*` environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let session_required = match std::env::var(ENV_SESSION_REQUIRED) {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                ConfigError::Settings(format!("{} must be a boolean, got {:?}", ENV_SESSION_REQUIRED, raw))
            })?,
            Err(_) => false,
        };

        Ok(Self {
            aws_prefix: std::env::var(ENV_AWS_PREFIX).unwrap_or_default(),
            secretsmanager_prefix: std::env::var(ENV_SECRETSMANAGER_PREFIX).ok(),
            aws_session_required: session_required,
        })
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Set the credential variable prefix
    pub fn with_aws_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.aws_prefix = prefix.into();
        self
    }

    /// Set the secret identifier prefix
    pub fn with_secretsmanager_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.secretsmanager_prefix = Some(prefix.into());
        self
    }

    /// Require a complete AWS session at bootstrap
    pub fn with_session_required(mut self, required: bool) -> Self {
        self.aws_session_required = required;
        self
    }

    /// Full secret identifier for `key`
    ///
    /// A non-empty `prefix_override` wins over the configured prefix. An
    /// empty prefix counts as none.
    pub fn secret_id(&self, key: &str, prefix_override: Option<&str>) -> String {
        let prefix = prefix_override
            .filter(|p| !p.is_empty())
            .or(self.secretsmanager_prefix.as_deref())
            .filter(|p| !p.is_empty());

        match prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key.to_string(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
