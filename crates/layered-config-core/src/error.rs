//! Error types for configuration resolution
//!
//! Absence is not an error at this level: a missing environment variable or
//! secret only drives fallthrough to the next source. What surfaces here are
//! the conditions a caller has to act on.

use crate::providers::ProviderError;
use crate::value::ValueKind;
use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required value was found in no source and no hook was configured
    #[error("Required value not found (env: {}, secret: {})", .env.as_deref().unwrap_or("-"), .remote_key.as_deref().unwrap_or("-"))]
    RequiredNotFound {
        env: Option<String>,
        remote_key: Option<String>,
    },

    /// `write` was called without a value
    #[error("A value is required for write")]
    ValueRequired,

    /// A stored value could not be coerced to the requested kind
    #[error("Cannot parse {value:?} as {kind}: {reason}")]
    Parse {
        kind: ValueKind,
        value: String,
        reason: String,
    },

    /// Strict session mode found a credential variable unset
    #[error("Missing credential: {0} not found in the environment")]
    MissingCredential(String),

    /// Remote store or identity service failure
    #[error(transparent)]
    Store(#[from] ProviderError),

    /// Invalid engine settings
    #[error("Settings error: {0}")]
    Settings(String),

    /// A cache lock was poisoned by a panicking callback
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl ConfigError {
    /// Create a parse error
    pub fn parse(kind: ValueKind, value: impl Into<String>, reason: impl ToString) -> Self {
        ConfigError::Parse {
            kind,
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if this error came from the caller's input rather than a remote system
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ConfigError::ValueRequired | ConfigError::Parse { .. } | ConfigError::Settings(_)
        )
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Settings(format!("TOML error: {}", err))
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Settings(format!("I/O error: {}", err))
    }
}

/// Result type alias for engine operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::RequiredNotFound {
            env: Some("PORT".to_string()),
            remote_key: None,
        };
        assert_eq!(err.to_string(), "Required value not found (env: PORT, secret: -)");

        let err = ConfigError::parse(ValueKind::Integer, "abc", "invalid digit found in string");
        assert_eq!(
            err.to_string(),
            "Cannot parse \"abc\" as integer: invalid digit found in string"
        );
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: ConfigError = ProviderError::ConnectionError("timed out".into()).into();
        assert_eq!(err.to_string(), "Connection error: timed out");
    }

    #[test]
    fn test_is_user_error() {
        assert!(ConfigError::ValueRequired.is_user_error());
        assert!(ConfigError::parse(ValueKind::Float, "x", "bad").is_user_error());
        assert!(!ConfigError::MissingCredential("AWS_REGION".into()).is_user_error());
        assert!(!ConfigError::Store(ProviderError::Other("boom".into())).is_user_error());
    }
}
