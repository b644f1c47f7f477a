use super::{ConfigEngine, Lookup, ResolutionContext};
use crate::cache::Source;
use crate::error::{ConfigError, ConfigResult};
use crate::value::{self, Value, ValueKind};
use tracing::{debug, warn};

impl ConfigEngine {
    /// Resolve the raw value for `lookup`, declared as `kind`
    ///
    /// Returns `Ok(None)` when nothing was found and the value is optional,
    /// or when it is required and the not-found hook handled it.
    pub async fn get(&self, kind: ValueKind, lookup: Lookup) -> ConfigResult<Option<Value>> {
        let _guard = self.op_lock.lock().await;
        self.resolve(kind, &lookup).await
    }

    pub async fn string(&self, lookup: Lookup) -> ConfigResult<Option<String>> {
        Ok(self
            .typed(ValueKind::String, lookup)
            .await?
            .and_then(Value::into_string))
    }

    pub async fn integer(&self, lookup: Lookup) -> ConfigResult<Option<i64>> {
        Ok(self
            .typed(ValueKind::Integer, lookup)
            .await?
            .and_then(|v| v.as_i64()))
    }

    pub async fn float(&self, lookup: Lookup) -> ConfigResult<Option<f64>> {
        Ok(self
            .typed(ValueKind::Float, lookup)
            .await?
            .and_then(|v| v.as_f64()))
    }

    pub async fn boolean(&self, lookup: Lookup) -> ConfigResult<Option<bool>> {
        Ok(self
            .typed(ValueKind::Boolean, lookup)
            .await?
            .and_then(|v| v.as_bool()))
    }

    async fn typed(&self, kind: ValueKind, lookup: Lookup) -> ConfigResult<Option<Value>> {
        let raw = self.get(kind, lookup).await?;
        value::parse(kind, raw.as_ref())
    }

    async fn resolve(&self, kind: ValueKind, lookup: &Lookup) -> ConfigResult<Option<Value>> {
        if let Some(name) = &lookup.env {
            if let Some(raw) = self.env.get(name) {
                debug!(env = %name, kind = %kind, "Resolved from environment");
                let raw = Value::String(raw);
                self.env_cache.record(
                    name,
                    Source::Environment,
                    kind,
                    Some(raw.clone()),
                    lookup.required,
                    lookup.callback.clone(),
                )?;
                return Ok(Some(raw));
            }
        }

        let secret_id = lookup
            .remote_key
            .as_deref()
            .map(|key| self.secret_id(key, lookup.secretsmanager_prefix.as_deref()));

        if let (Some(key), Some(secret_id)) = (&lookup.remote_key, &secret_id) {
            match self.fetch_secret(secret_id).await {
                Ok(raw) => {
                    debug!(secret_id = %secret_id, kind = %kind, "Resolved from secret store");
                    let raw = Value::String(raw);
                    self.remote_cache.record(
                        key,
                        Source::RemoteStore,
                        kind,
                        Some(raw.clone()),
                        lookup.required,
                        lookup.callback.clone(),
                    )?;
                    return Ok(Some(raw));
                }
                Err(ConfigError::Store(e)) if e.is_not_found() => {
                    debug!(secret_id = %secret_id, "Secret not found, falling through");
                }
                Err(e) => {
                    if lookup.required && lookup.default.is_none() {
                        return Err(e);
                    }
                    warn!(
                        secret_id = %secret_id,
                        error = %e,
                        has_default = lookup.default.is_some(),
                        "Secret store unavailable, using default"
                    );
                }
            }
        }

        if let Some(default) = &lookup.default {
            debug!(
                env = lookup.env.as_deref().unwrap_or("-"),
                remote_key = lookup.remote_key.as_deref().unwrap_or("-"),
                "Resolved from default"
            );
            self.record_default(kind, lookup, default)?;
            return Ok(Some(default.clone()));
        }

        if lookup.required {
            let context = ResolutionContext {
                kind,
                env: lookup.env.clone(),
                remote_key: lookup.remote_key.clone(),
                secret_id,
                required: lookup.required,
            };
            return match &self.not_found {
                Some(hook) => {
                    debug!(context = ?context, "Required value missing, calling not-found hook");
                    hook(&context);
                    Ok(None)
                }
                None => Err(ConfigError::RequiredNotFound {
                    env: context.env,
                    remote_key: context.remote_key,
                }),
            };
        }

        Ok(None)
    }

    // Session bootstrap failures go through the same fallback as store errors.
    async fn fetch_secret(&self, secret_id: &str) -> ConfigResult<String> {
        let client = self.bootstrap.client().await?;
        Ok(client.get_secret(secret_id).await?)
    }

    // A default is recorded under every key the lookup named.
    fn record_default(&self, kind: ValueKind, lookup: &Lookup, default: &Value) -> ConfigResult<()> {
        if let Some(name) = &lookup.env {
            self.env_cache.record(
                name,
                Source::Default,
                kind,
                Some(default.clone()),
                lookup.required,
                lookup.callback.clone(),
            )?;
        }
        if let Some(key) = &lookup.remote_key {
            self.remote_cache.record(
                key,
                Source::Default,
                kind,
                Some(default.clone()),
                lookup.required,
                lookup.callback.clone(),
            )?;
        }
        Ok(())
    }
}
