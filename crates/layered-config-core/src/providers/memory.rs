//! In-memory secret store
//!
//! Behaves like a remote secret manager (create fails on existing secrets,
//! update fails on missing ones) without leaving the process. Operation
//! counters make it convenient for asserting how often the engine talked to
//! the store.

use super::traits::{ProviderError, ProviderResult, SecretStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

/// Snapshot of operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub gets: usize,
    pub creates: usize,
    pub updates: usize,
}

#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
    unavailable: AtomicBool,
    gets: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret (builder pattern)
    pub fn with_secret(self, secret_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.write_map().insert(secret_id.into(), value.into());
        self
    }

    /// Make every subsequent call fail with a connection error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Read a secret without touching the counters
    pub fn peek(&self, secret_id: &str) -> Option<String> {
        self.secrets
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(secret_id)
            .cloned()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            gets: self.gets.load(Ordering::SeqCst),
            creates: self.creates.load(Ordering::SeqCst),
            updates: self.updates.load(Ordering::SeqCst),
        }
    }

    fn write_map(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, String>> {
        self.secrets.write().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> ProviderResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::ConnectionError(
                "memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory_secrets"
    }

    async fn get_secret(&self, secret_id: &str) -> ProviderResult<String> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.peek(secret_id)
            .ok_or_else(|| ProviderError::not_found(secret_id))
    }

    async fn create_secret(&self, secret_id: &str, value: &str) -> ProviderResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut secrets = self.write_map();
        if secrets.contains_key(secret_id) {
            return Err(ProviderError::Other(format!(
                "secret {} already exists",
                secret_id
            )));
        }
        secrets.insert(secret_id.to_string(), value.to_string());
        Ok(())
    }

    async fn update_secret(&self, secret_id: &str, value: &str) -> ProviderResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let mut secrets = self.write_map();
        match secrets.get_mut(secret_id) {
            Some(current) => {
                *current = value.to_string();
                Ok(())
            }
            None => Err(ProviderError::not_found(secret_id)),
        }
    }
}
