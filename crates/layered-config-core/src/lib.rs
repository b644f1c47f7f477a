//! Layered configuration resolution
//!
//! Resolves named configuration values from prioritized sources, remembers
//! what was resolved, and tells subscribers when a value is changed through
//! the engine.
//!
//! ## Features
//!
//! - **Layered lookup**: environment variable, then AWS Secrets Manager, then
//!   a caller-supplied default
//! - **Typed accessors**: `string`, `integer`, `float`, `boolean`
//! - **Change notification**: per-key callbacks fired once per real change
//! - **Write-back**: compare-before-write to the environment and the store
//! - **Lazy AWS session**: built on first use, with optional STS role
//!   assumption, exactly once per engine
//!
//! ## Architecture
//!
//! 1. **Value** (`value`): scalar kinds, parsing and canonical text.
//! 2. **Cache** (`cache`): per-source entries with kind, source and callback.
//! 3. **Providers** (`providers`): environment and secret store backends.
//! 4. **Bootstrap** (`bootstrap`): credential resolution and client setup.
//! 5. **Engine** (`engine`): resolution and write-back.
//!
//! ## Example
//!
//! ```rust,no_run
//! use layered_config_core::{ConfigEngine, EngineSettings, Lookup, WriteTarget};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), layered_config_core::ConfigError> {
//!     let engine = ConfigEngine::new(EngineSettings::new().with_secretsmanager_prefix("prod/api"));
//!
//!     let port = engine
//!         .integer(
//!             Lookup::new()
//!                 .env("PORT")
//!                 .remote("port")
//!                 .with_default(8080)
//!                 .on_change(|event| println!("port is now {:?}", event.value)),
//!         )
//!         .await?;
//!     println!("listening on {:?}", port);
//!
//!     engine.write(Some(9090.into()), WriteTarget::new().env("PORT")).await?;
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod providers;
pub mod value;

pub use bootstrap::{RoleRequest, SessionBootstrap, StaticCredentials, StoreConnector};
pub use cache::{Cache, CacheEntry, ChangeCallback, ChangeEvent, Source};
pub use config::EngineSettings;
pub use engine::{
    BranchOutcome, Change, ConfigEngine, ConfigEngineBuilder, Lookup, NotFoundHook,
    ResolutionContext, WriteOutcome, WriteTarget,
};
pub use error::{ConfigError, ConfigResult};
pub use providers::{
    AwsConnector, EnvironmentStore, MemoryEnvironment, MemorySecretStore, ProcessEnvironment,
    ProviderError, ProviderResult, SecretStore,
};
pub use value::{Value, ValueKind};
