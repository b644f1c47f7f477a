use super::ConfigEngine;
use crate::cache::{Cache, CacheEntry, ChangeEvent, Source};
use crate::error::{ConfigError, ConfigResult};
use crate::providers::SecretStore;
use crate::value::{self, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Targets of a write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteTarget {
    pub env: Option<String>,
    pub remote_key: Option<String>,
    /// Overrides the engine's secret prefix for this write
    pub secretsmanager_prefix: Option<String>,
}

impl WriteTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn env(mut self, name: impl Into<String>) -> Self {
        self.env = Some(name.into());
        self
    }

    pub fn remote(mut self, key: impl Into<String>) -> Self {
        self.remote_key = Some(key.into());
        self
    }

    pub fn secretsmanager_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.secretsmanager_prefix = Some(prefix.into());
        self
    }
}

/// What a write did to one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Target already held the value
    Unchanged,
    /// Secret did not exist and was created
    Created,
    /// Existing value was replaced
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchOutcome {
    pub change: Change,
    /// Whether a change callback ran
    pub notified: bool,
}

impl BranchOutcome {
    fn unchanged() -> Self {
        Self {
            change: Change::Unchanged,
            notified: false,
        }
    }

    pub fn changed(&self) -> bool {
        self.change != Change::Unchanged
    }
}

/// Per-target results of a write; `None` for targets not named
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub env: Option<BranchOutcome>,
    pub remote: Option<BranchOutcome>,
}

/// A target that differs from the value being written, checked and ready to apply
struct PendingEnv<'a> {
    name: &'a str,
    parsed: Option<Value>,
}

struct PendingRemote<'a> {
    key: &'a str,
    secret_id: String,
    client: Arc<dyn SecretStore>,
    exists: bool,
    parsed: Option<Value>,
}

impl ConfigEngine {
    /// Push `value` to the environment and/or the secret store
    ///
    /// Each target is compared with its current value first and left alone
    /// when equal, so repeating a write is a no-op. For a target that did
    /// change, the cached entry for that key (if any) takes the new value and
    /// its callback runs once. Keys never resolved have no entry and notify
    /// nobody.
    ///
    /// Every named target is read and checked against its cached kind before
    /// either one is modified, so a value one subscriber cannot parse leaves
    /// both targets untouched.
    pub async fn write(&self, value: Option<Value>, target: WriteTarget) -> ConfigResult<WriteOutcome> {
        let value = value.ok_or(ConfigError::ValueRequired)?;
        let text = value::stringify(&value);

        let _guard = self.op_lock.lock().await;
        let mut outcome = WriteOutcome::default();

        let env = match &target.env {
            Some(name) => self.check_env(name, &text)?,
            None => None,
        };
        let remote = match &target.remote_key {
            Some(key) => {
                self.check_remote(key, target.secretsmanager_prefix.as_deref(), &text)
                    .await?
            }
            None => None,
        };

        if target.env.is_some() {
            outcome.env = Some(match env {
                Some(pending) => self.apply_env(pending, &text)?,
                None => BranchOutcome::unchanged(),
            });
        }
        if target.remote_key.is_some() {
            outcome.remote = Some(match remote {
                Some(pending) => self.apply_remote(pending, &text).await?,
                None => BranchOutcome::unchanged(),
            });
        }

        Ok(outcome)
    }

    fn check_env<'a>(&self, name: &'a str, text: &str) -> ConfigResult<Option<PendingEnv<'a>>> {
        if self.env.get(name).as_deref() == Some(text) {
            debug!(env = %name, "Environment already holds value, skipping");
            return Ok(None);
        }
        let entry = self.env_cache.get(name)?;
        let parsed = Self::parse_for(entry.as_ref(), text)?;
        Ok(Some(PendingEnv { name, parsed }))
    }

    async fn check_remote<'a>(
        &self,
        key: &'a str,
        prefix_override: Option<&str>,
        text: &str,
    ) -> ConfigResult<Option<PendingRemote<'a>>> {
        let secret_id = self.secret_id(key, prefix_override);
        let client = self.bootstrap.client().await?;

        let current = match client.get_secret(&secret_id).await {
            Ok(current) => Some(current),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };
        if current.as_deref() == Some(text) {
            debug!(secret_id = %secret_id, "Secret already holds value, skipping");
            return Ok(None);
        }

        let entry = self.remote_cache.get(key)?;
        let parsed = Self::parse_for(entry.as_ref(), text)?;
        Ok(Some(PendingRemote {
            key,
            secret_id,
            client,
            exists: current.is_some(),
            parsed,
        }))
    }

    fn apply_env(&self, pending: PendingEnv<'_>, text: &str) -> ConfigResult<BranchOutcome> {
        self.env.set(pending.name, text);
        info!(env = %pending.name, "Environment variable updated");

        let notified = Self::commit(&self.env_cache, pending.name, text, Source::Environment, pending.parsed)?;
        Ok(BranchOutcome {
            change: Change::Updated,
            notified,
        })
    }

    async fn apply_remote(&self, pending: PendingRemote<'_>, text: &str) -> ConfigResult<BranchOutcome> {
        let secret_id = &pending.secret_id;
        let change = if pending.exists {
            pending.client.update_secret(secret_id, text).await?;
            info!(secret_id = %secret_id, "Secret updated");
            Change::Updated
        } else {
            pending.client.create_secret(secret_id, text).await?;
            info!(secret_id = %secret_id, "Secret created");
            Change::Created
        };

        let notified = Self::commit(&self.remote_cache, pending.key, text, Source::RemoteStore, pending.parsed)?;
        Ok(BranchOutcome { change, notified })
    }

    // A value the subscriber cannot read is rejected before any target changes.
    fn parse_for(entry: Option<&CacheEntry>, text: &str) -> ConfigResult<Option<Value>> {
        match entry {
            Some(entry) => value::parse(entry.kind, Some(&Value::from(text))),
            None => Ok(None),
        }
    }

    fn commit(
        cache: &Cache,
        key: &str,
        text: &str,
        source: Source,
        parsed: Option<Value>,
    ) -> ConfigResult<bool> {
        let Some((previous, updated)) = cache.update_value(key, Value::from(text), source)? else {
            debug!(cache = cache.name(), key = key, "No cached entry, nobody to notify");
            return Ok(false);
        };

        let event = ChangeEvent {
            key: key.to_string(),
            source,
            kind: updated.kind,
            value: parsed,
            previous: previous.value,
        };
        Ok(updated.notify(&event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::engine::Lookup;
    use crate::providers::{EnvironmentStore, MemoryEnvironment, MemorySecretStore, StoreStats};
    use crate::value::ValueKind;
    use std::sync::{Arc, Mutex};

    struct Fixture {
        engine: ConfigEngine,
        env: Arc<MemoryEnvironment>,
        store: Arc<MemorySecretStore>,
        events: Arc<Mutex<Vec<ChangeEvent>>>,
    }

    impl Fixture {
        fn new(env: MemoryEnvironment, store: MemorySecretStore) -> Self {
            let env = Arc::new(env);
            let store = Arc::new(store);
            let engine = ConfigEngine::builder(EngineSettings::new())
                .shared_environment(env.clone())
                .secret_store(store.clone())
                .build();
            Self {
                engine,
                env,
                store,
                events: Arc::default(),
            }
        }

        fn lookup(&self) -> Lookup {
            let sink = Arc::clone(&self.events);
            Lookup::new().on_change(move |event| sink.lock().unwrap().push(event.clone()))
        }

        fn events(&self) -> Vec<ChangeEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_write_requires_value() {
        let fx = Fixture::new(MemoryEnvironment::new(), MemorySecretStore::new());
        let err = fx
            .engine
            .write(None, WriteTarget::new().env("PORT"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValueRequired));
    }

    #[tokio::test]
    async fn test_env_write_notifies_once() {
        let fx = Fixture::new(
            MemoryEnvironment::new().with_var("PORT", "8080"),
            MemorySecretStore::new(),
        );
        fx.engine
            .integer(fx.lookup().env("PORT"))
            .await
            .unwrap();

        let first = fx
            .engine
            .write(Some(9090.into()), WriteTarget::new().env("PORT"))
            .await
            .unwrap();
        let second = fx
            .engine
            .write(Some(9090.into()), WriteTarget::new().env("PORT"))
            .await
            .unwrap();

        assert_eq!(
            first.env,
            Some(BranchOutcome {
                change: Change::Updated,
                notified: true
            })
        );
        assert_eq!(second.env, Some(BranchOutcome::unchanged()));
        assert_eq!(fx.env.get("PORT").as_deref(), Some("9090"));

        let events = fx.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key, "PORT");
        assert_eq!(events[0].source, Source::Environment);
        assert_eq!(events[0].kind, ValueKind::Integer);
        assert_eq!(events[0].value, Some(Value::Integer(9090)));
        assert_eq!(events[0].previous, Some(Value::from("8080")));

        let entry = fx.engine.env_cache().get("PORT").unwrap().unwrap();
        assert_eq!(entry.kind, ValueKind::Integer);
        assert_eq!(entry.value, Some(Value::from("9090")));
        assert!(entry.has_callback());
    }

    #[tokio::test]
    async fn test_env_write_without_entry_does_not_notify() {
        let fx = Fixture::new(MemoryEnvironment::new(), MemorySecretStore::new());

        let outcome = fx
            .engine
            .write(Some("debug".into()), WriteTarget::new().env("LOG_LEVEL"))
            .await
            .unwrap();

        assert_eq!(
            outcome.env,
            Some(BranchOutcome {
                change: Change::Updated,
                notified: false
            })
        );
        assert_eq!(fx.env.get("LOG_LEVEL").as_deref(), Some("debug"));
        assert!(fx.engine.env_cache().get("LOG_LEVEL").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remote_write_creates_then_updates() {
        let fx = Fixture::new(MemoryEnvironment::new(), MemorySecretStore::new());
        fx.engine
            .string(fx.lookup().remote("api/token").with_default("none"))
            .await
            .unwrap();

        let created = fx
            .engine
            .write(Some("t1".into()), WriteTarget::new().remote("api/token"))
            .await
            .unwrap();
        let updated = fx
            .engine
            .write(Some("t2".into()), WriteTarget::new().remote("api/token"))
            .await
            .unwrap();
        let repeated = fx
            .engine
            .write(Some("t2".into()), WriteTarget::new().remote("api/token"))
            .await
            .unwrap();

        assert_eq!(created.remote.map(|o| o.change), Some(Change::Created));
        assert_eq!(updated.remote.map(|o| o.change), Some(Change::Updated));
        assert_eq!(repeated.remote, Some(BranchOutcome::unchanged()));
        assert_eq!(fx.store.peek("api/token").as_deref(), Some("t2"));
        assert_eq!(
            fx.store.stats(),
            StoreStats {
                gets: 4,
                creates: 1,
                updates: 1
            }
        );

        let values: Vec<_> = fx.events().into_iter().map(|e| e.value).collect();
        assert_eq!(values, vec![Some(Value::from("t1")), Some(Value::from("t2"))]);
    }

    #[tokio::test]
    async fn test_remote_write_uses_prefix() {
        let fx = Fixture::new(MemoryEnvironment::new(), MemorySecretStore::new());

        fx.engine
            .write(
                Some(true.into()),
                WriteTarget::new().remote("flags/beta").secretsmanager_prefix("prod"),
            )
            .await
            .unwrap();

        assert_eq!(fx.store.peek("prod/flags/beta").as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn test_both_targets_are_independent() {
        let fx = Fixture::new(
            MemoryEnvironment::new().with_var("REPLICAS", "3"),
            MemorySecretStore::new().with_secret("replicas", "2"),
        );
        fx.engine
            .integer(fx.lookup().env("REPLICAS"))
            .await
            .unwrap();
        fx.engine
            .integer(fx.lookup().remote("replicas"))
            .await
            .unwrap();

        let outcome = fx
            .engine
            .write(Some(3.into()), WriteTarget::new().env("REPLICAS").remote("replicas"))
            .await
            .unwrap();

        assert_eq!(outcome.env, Some(BranchOutcome::unchanged()));
        assert_eq!(
            outcome.remote,
            Some(BranchOutcome {
                change: Change::Updated,
                notified: true
            })
        );
        let events = fx.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, Source::RemoteStore);
        assert_eq!(events[0].key, "replicas");
    }

    #[tokio::test]
    async fn test_unparseable_write_is_rejected_before_mutation() {
        let fx = Fixture::new(
            MemoryEnvironment::new().with_var("PORT", "8080"),
            MemorySecretStore::new(),
        );
        fx.engine
            .integer(fx.lookup().env("PORT"))
            .await
            .unwrap();

        let err = fx
            .engine
            .write(Some("eighty".into()), WriteTarget::new().env("PORT"))
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(fx.env.get("PORT").as_deref(), Some("8080"));
        assert!(fx.events().is_empty());
    }

    #[tokio::test]
    async fn test_float_write_compares_canonical_text() {
        let fx = Fixture::new(
            MemoryEnvironment::new().with_var("RATIO", "0.5"),
            MemorySecretStore::new(),
        );

        let outcome = fx
            .engine
            .write(Some(0.5.into()), WriteTarget::new().env("RATIO"))
            .await
            .unwrap();
        assert_eq!(outcome.env, Some(BranchOutcome::unchanged()));
    }

    #[tokio::test]
    async fn test_remote_store_failure_propagates() {
        let fx = Fixture::new(MemoryEnvironment::new(), MemorySecretStore::new());
        fx.store.set_unavailable(true);

        let err = fx
            .engine
            .write(Some("v".into()), WriteTarget::new().remote("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Store(_)));
    }

    #[tokio::test]
    async fn test_rejected_remote_value_leaves_env_untouched() {
        let fx = Fixture::new(
            MemoryEnvironment::new().with_var("NAME", "svc"),
            MemorySecretStore::new().with_secret("limit", "10"),
        );
        fx.engine.string(fx.lookup().env("NAME")).await.unwrap();
        fx.engine.integer(fx.lookup().remote("limit")).await.unwrap();

        let err = fx
            .engine
            .write(Some("abc".into()), WriteTarget::new().env("NAME").remote("limit"))
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigError::Parse { kind: ValueKind::Integer, .. }));
        assert_eq!(fx.env.get("NAME").as_deref(), Some("svc"));
        assert_eq!(fx.store.peek("limit").as_deref(), Some("10"));
        assert!(fx.events().is_empty());
        assert_eq!(
            fx.engine.env_cache().get("NAME").unwrap().unwrap().value,
            Some(Value::from("svc"))
        );
    }

    #[tokio::test]
    async fn test_rejected_env_value_leaves_secret_untouched() {
        let fx = Fixture::new(
            MemoryEnvironment::new().with_var("LIMIT", "10"),
            MemorySecretStore::new().with_secret("name", "svc"),
        );
        fx.engine.integer(fx.lookup().env("LIMIT")).await.unwrap();
        fx.engine.string(fx.lookup().remote("name")).await.unwrap();

        let err = fx
            .engine
            .write(Some("abc".into()), WriteTarget::new().env("LIMIT").remote("name"))
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(fx.env.get("LIMIT").as_deref(), Some("10"));
        assert_eq!(fx.store.peek("name").as_deref(), Some("svc"));
        assert_eq!(fx.store.stats().updates, 0);
        assert!(fx.events().is_empty());
    }
}
