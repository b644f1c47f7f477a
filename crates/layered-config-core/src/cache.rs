//! Resolution cache
//!
//! One [`Cache`] remembers, per key, the last value the engine resolved or
//! wrote, the kind it was declared as, and the subscriber to notify when a
//! write changes it. The engine owns two independent instances: one keyed by
//! environment variable name, one keyed by secret identifier.
//!
//! An entry's kind and callback are carried forward across every update; only
//! the value, its source and the timestamp change.

use crate::error::{ConfigError, ConfigResult};
use crate::value::{Value, ValueKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Which layer produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Environment,
    RemoteStore,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Environment => "environment",
            Source::RemoteStore => "remote_store",
            Source::Default => "default",
        };
        f.write_str(name)
    }
}

/// Passed to a change callback after a write changed a value
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Environment name or (unprefixed) secret key that changed
    pub key: String,
    /// Target the write went to
    pub source: Source,
    /// Declared kind of the entry
    pub kind: ValueKind,
    /// New value, parsed as `kind`
    pub value: Option<Value>,
    /// Raw value the cache held before the write
    pub previous: Option<Value>,
}

/// Subscriber invoked synchronously with each confirmed change
pub type ChangeCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// One resolved configuration value
#[derive(Clone)]
pub struct CacheEntry {
    pub key: String,
    pub source: Source,
    pub kind: ValueKind,
    /// Raw, unparsed value
    pub value: Option<Value>,
    pub required: bool,
    pub resolved_at: DateTime<Utc>,
    callback: Option<ChangeCallback>,
}

impl CacheEntry {
    pub fn new(
        key: impl Into<String>,
        source: Source,
        kind: ValueKind,
        value: Option<Value>,
        required: bool,
        callback: Option<ChangeCallback>,
    ) -> Self {
        Self {
            key: key.into(),
            source,
            kind,
            value,
            required,
            resolved_at: Utc::now(),
            callback,
        }
    }

    /// Same entry with a new value, kind and callback unchanged
    pub fn with_value(&self, value: Value, source: Source) -> Self {
        Self {
            key: self.key.clone(),
            source,
            kind: self.kind,
            value: Some(value),
            required: self.required,
            resolved_at: Utc::now(),
            callback: self.callback.clone(),
        }
    }

    pub fn callback(&self) -> Option<&ChangeCallback> {
        self.callback.as_ref()
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Invoke the callback, if any. Returns whether it fired.
    pub fn notify(&self, event: &ChangeEvent) -> bool {
        match &self.callback {
            Some(callback) => {
                callback(event);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("source", &self.source)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("required", &self.required)
            .field("resolved_at", &self.resolved_at)
            .field("has_callback", &self.has_callback())
            .finish()
    }
}

/// Key to entry map for a single source
#[derive(Debug)]
pub struct Cache {
    name: &'static str,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl Cache {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn get(&self, key: &str) -> ConfigResult<Option<CacheEntry>> {
        Ok(self.read()?.get(key).cloned())
    }

    pub fn set(&self, entry: CacheEntry) -> ConfigResult<()> {
        self.write()?.insert(entry.key.clone(), entry);
        Ok(())
    }

    /// Number of cached keys; still counts entries after a lock was poisoned
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Re-create the entry for `key` after a read
    ///
    /// A kind declared by an earlier resolution wins over `kind`. A new
    /// callback replaces the old one; without one, the old callback stays.
    pub(crate) fn record(
        &self,
        key: &str,
        source: Source,
        kind: ValueKind,
        value: Option<Value>,
        required: bool,
        callback: Option<ChangeCallback>,
    ) -> ConfigResult<CacheEntry> {
        let mut entries = self.write()?;
        let previous = entries.get(key);

        let kind = match previous {
            Some(existing) if existing.kind != kind => {
                tracing::warn!(
                    cache = self.name,
                    key = key,
                    declared = %existing.kind,
                    requested = %kind,
                    "Key already declared with another kind, keeping the first"
                );
                existing.kind
            }
            _ => kind,
        };
        let callback = callback.or_else(|| previous.and_then(|e| e.callback.clone()));

        let entry = CacheEntry::new(key, source, kind, value, required, callback);
        entries.insert(key.to_string(), entry.clone());
        Ok(entry)
    }

    /// Replace the value of an existing entry
    ///
    /// Returns the previous and updated entries, or `None` when the key was
    /// never cached.
    pub(crate) fn update_value(
        &self,
        key: &str,
        value: Value,
        source: Source,
    ) -> ConfigResult<Option<(CacheEntry, CacheEntry)>> {
        let mut entries = self.write()?;
        let Some(previous) = entries.get(key).cloned() else {
            return Ok(None);
        };
        let updated = previous.with_value(value, source);
        entries.insert(key.to_string(), updated.clone());
        Ok(Some((previous, updated)))
    }

    fn read(&self) -> ConfigResult<RwLockReadGuard<'_, HashMap<String, CacheEntry>>> {
        self.entries
            .read()
            .map_err(|e| ConfigError::LockPoisoned(format!("{} cache: {}", self.name, e)))
    }

    fn write(&self) -> ConfigResult<RwLockWriteGuard<'_, HashMap<String, CacheEntry>>> {
        self.entries
            .write()
            .map_err(|e| ConfigError::LockPoisoned(format!("{} cache: {}", self.name, e)))
    }
}
