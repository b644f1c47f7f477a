//! Resolution and write-back engine
//!
//! [`ConfigEngine`] resolves a value by trying, in order:
//!
//! 1. the environment variable named by the lookup,
//! 2. the remote secret store (client built lazily on first use),
//! 3. the lookup's default.
//!
//! Every resolution is recorded in one of two caches. Writes compare against
//! the current value of each target, skip unchanged targets, and notify the
//! cached entry's subscriber once per real change.
//!
//! All `get` and `write` calls on one engine are serialized, so the
//! compare-update-notify sequence of a write is never interleaved with
//! another call.
//!
//! # Example
//!
//! ```rust,ignore
//! use layered_config_core::{ConfigEngine, EngineSettings, Lookup};
//!
//! let engine = ConfigEngine::new(EngineSettings::from_env()?);
//! let port = engine
//!     .integer(Lookup::new().env("PORT").remote("db/port").with_default(5433).required(true))
//!     .await?;
//! ```

mod resolve;
mod write;

pub use write::{BranchOutcome, Change, WriteOutcome, WriteTarget};

use crate::bootstrap::{SessionBootstrap, StoreConnector};
use crate::cache::{Cache, ChangeCallback, ChangeEvent};
use crate::config::EngineSettings;
use crate::providers::{AwsConnector, EnvironmentStore, ProcessEnvironment, SecretStore};
use crate::value::{Value, ValueKind};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// What was being resolved when a required value came up empty
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionContext {
    pub kind: ValueKind,
    pub env: Option<String>,
    pub remote_key: Option<String>,
    /// Namespaced identifier the store was queried with
    pub secret_id: Option<String>,
    pub required: bool,
}

/// Called instead of failing when a required value is missing
pub type NotFoundHook = Arc<dyn Fn(&ResolutionContext) + Send + Sync>;

/// Where to look for a value and what to do when it is missing
#[derive(Clone, Default)]
pub struct Lookup {
    pub env: Option<String>,
    pub remote_key: Option<String>,
    /// Overrides the engine's secret prefix for this lookup
    pub secretsmanager_prefix: Option<String>,
    pub default: Option<Value>,
    pub required: bool,
    pub callback: Option<ChangeCallback>,
}

impl Lookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment variable to read, by exact name
    pub fn env(mut self, name: impl Into<String>) -> Self {
        self.env = Some(name.into());
        self
    }

    /// Secret key to read when the environment has nothing
    pub fn remote(mut self, key: impl Into<String>) -> Self {
        self.remote_key = Some(key.into());
        self
    }

    pub fn secretsmanager_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.secretsmanager_prefix = Some(prefix.into());
        self
    }

    /// Value adopted when neither the environment nor the store has one
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Subscribe to changes made through `write`
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lookup")
            .field("env", &self.env)
            .field("remote_key", &self.remote_key)
            .field("secretsmanager_prefix", &self.secretsmanager_prefix)
            .field("has_default", &self.default.is_some())
            .field("required", &self.required)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Layered configuration engine
pub struct ConfigEngine {
    settings: EngineSettings,
    env: Arc<dyn EnvironmentStore>,
    bootstrap: SessionBootstrap,
    not_found: Option<NotFoundHook>,
    env_cache: Cache,
    remote_cache: Cache,
    op_lock: Mutex<()>,
}

impl fmt::Debug for ConfigEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigEngine")
            .field("settings", &self.settings)
            .field("env", &self.env.name())
            .field("bootstrap", &self.bootstrap)
            .field("has_not_found_fn", &self.not_found.is_some())
            .field("env_cache", &self.env_cache.len())
            .field("remote_cache", &self.remote_cache.len())
            .finish()
    }
}

impl ConfigEngine {
    /// Engine over the process environment and AWS Secrets Manager
    pub fn new(settings: EngineSettings) -> Self {
        Self::builder(settings).build()
    }

    pub fn builder(settings: EngineSettings) -> ConfigEngineBuilder {
        ConfigEngineBuilder::new(settings)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Entries resolved from or written to the environment, by variable name
    pub fn env_cache(&self) -> &Cache {
        &self.env_cache
    }

    /// Entries resolved from or written to the secret store, by secret key
    pub fn remote_cache(&self) -> &Cache {
        &self.remote_cache
    }

    /// Whether the secret store client has been built
    pub fn is_connected(&self) -> bool {
        self.bootstrap.is_initialized()
    }

    pub fn bootstrap(&self) -> &SessionBootstrap {
        &self.bootstrap
    }

    /// Namespaced identifier used for `key` in the secret store
    pub fn secret_id(&self, key: &str, prefix_override: Option<&str>) -> String {
        self.settings.secret_id(key, prefix_override)
    }
}

/// Builder for [`ConfigEngine`]
pub struct ConfigEngineBuilder {
    settings: EngineSettings,
    env: Option<Arc<dyn EnvironmentStore>>,
    store: Option<Arc<dyn SecretStore>>,
    connector: Option<Arc<dyn StoreConnector>>,
    not_found: Option<NotFoundHook>,
}

impl ConfigEngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            env: None,
            store: None,
            connector: None,
            not_found: None,
        }
    }

    /// Environment backend (default: the process environment)
    pub fn environment<E: EnvironmentStore + 'static>(mut self, env: E) -> Self {
        self.env = Some(Arc::new(env));
        self
    }

    pub fn shared_environment(mut self, env: Arc<dyn EnvironmentStore>) -> Self {
        self.env = Some(env);
        self
    }

    /// Use an already connected secret store and skip credential bootstrap
    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Connector used to bootstrap the store (default: [`AwsConnector`])
    pub fn connector(mut self, connector: Arc<dyn StoreConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn not_found_fn<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ResolutionContext) + Send + Sync + 'static,
    {
        self.not_found = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> ConfigEngine {
        let env = self
            .env
            .unwrap_or_else(|| Arc::new(ProcessEnvironment::new()));

        let bootstrap = match self.store {
            Some(store) => SessionBootstrap::with_client(
                Arc::clone(&env),
                store,
                self.settings.aws_prefix.clone(),
            ),
            None => SessionBootstrap::new(
                Arc::clone(&env),
                self.connector
                    .unwrap_or_else(|| Arc::new(AwsConnector::new())),
                self.settings.aws_prefix.clone(),
                self.settings.aws_session_required,
            ),
        };

        ConfigEngine {
            settings: self.settings,
            env,
            bootstrap,
            not_found: self.not_found,
            env_cache: Cache::new("env"),
            remote_cache: Cache::new("secretsmanager"),
            op_lock: Mutex::new(()),
        }
    }
}
