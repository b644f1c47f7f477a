//! Configuration Sources
//!
//! Trait-based interfaces for the systems the engine reads configuration
//! from and writes it back to.
//!
//! # Supported Sources
//!
//! - **Environment Variables**: the live process environment, or an
//!   in-memory snapshot
//! - **AWS Secrets Manager**: remote secrets, optionally reached through an
//!   assumed IAM role
//! - **In-Memory Secrets**: a local stand-in for the remote store
//!
//! # Architecture
//!
//! Environment access is synchronous (`EnvironmentStore`); the secret store is
//! async (`SecretStore`). Both report absence distinctly from failure so the
//! engine can fall through to the next layer.

pub mod traits;
pub mod env;
pub mod memory;
pub mod aws;

// Re-export core types
pub use traits::{EnvironmentStore, SecretStore, ProviderError, ProviderResult};

// Re-export provider implementations
pub use env::{ProcessEnvironment, MemoryEnvironment};
pub use memory::{MemorySecretStore, StoreStats};
pub use aws::{AwsSecretsManagerStore, AwsConnector};

#[cfg(test)]
pub use traits::MockSecretStore;
