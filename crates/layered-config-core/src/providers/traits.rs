//! Core traits for configuration sources
//!
//! This module defines the boundaries between the resolution engine and the
//! systems it reads from and writes to. The design follows the provider
//! pattern: the engine only sees these traits, so the process environment,
//! AWS Secrets Manager and in-memory stand-ins are interchangeable.

use std::fmt;
use thiserror::Error;

/// Errors that can occur when interacting with a secret store or identity service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The requested secret does not exist in the store
    #[error("Secret not found: {key}")]
    NotFound {
        key: String,
    },

    /// Authentication or authorization failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Network or connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Missing or invalid provider configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Generic provider error
    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Create a not-found error for the given secret identifier
    pub fn not_found(key: impl Into<String>) -> Self {
        ProviderError::NotFound { key: key.into() }
    }

    /// Whether this error only signals absence of the secret
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Read/write access to environment variables
///
/// Lookups are by exact name. Implementations must be thread-safe; the
/// engine shares one instance between resolution and write-back.
pub trait EnvironmentStore: Send + Sync + fmt::Debug {
    /// Returns the unique name of this store
    fn name(&self) -> &str;

    /// Read a variable, `None` when unset
    fn get(&self, name: &str) -> Option<String>;

    /// Set a variable, replacing any previous value
    fn set(&self, name: &str, value: &str);
}

/// Remote secret store addressed by string identifiers
///
/// Identifiers passed here are already namespaced by the engine.
///
/// # Error Handling
///
/// Stores must return `ProviderError::NotFound` when a secret doesn't exist,
/// so the engine can fall through to the next source. Any other error is a
/// store failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync + fmt::Debug {
    /// Returns the unique name of this store
    fn name(&self) -> &str;

    /// Fetch the string payload of a secret
    async fn get_secret(&self, secret_id: &str) -> ProviderResult<String>;

    /// Create a secret that does not exist yet
    async fn create_secret(&self, secret_id: &str, value: &str) -> ProviderResult<()>;

    /// Store a new value for an existing secret
    async fn update_secret(&self, secret_id: &str, value: &str) -> ProviderResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::not_found("app/db_password");
        assert!(err.to_string().contains("app/db_password"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_other_errors_are_not_absence() {
        assert!(!ProviderError::ConnectionError("reset".into()).is_not_found());
        assert!(!ProviderError::AuthenticationFailed("denied".into()).is_not_found());
    }

    #[tokio::test]
    async fn test_mock_store_not_found() {
        let mut store = MockSecretStore::new();
        store
            .expect_get_secret()
            .returning(|id| Err(ProviderError::not_found(id)));

        let err = store.get_secret("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
