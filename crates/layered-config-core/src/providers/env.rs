//! Environment Variable Stores
//!
//! This module provides the two environment backends the engine can use:
//! - `ProcessEnvironment`: the real process environment
//! - `MemoryEnvironment`: an isolated map with the same semantics
//!
//! Names are used verbatim. No prefixing, case folding or separator rewriting
//! happens here; credential prefixes are applied by the bootstrap.

use super::traits::EnvironmentStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// Store backed by the process environment
///
/// Reads reflect the environment at query time. Variables holding invalid
/// UTF-8 are reported as unset.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl ProcessEnvironment {
    /// Create a new process environment store
    pub fn new() -> Self {
        Self
    }
}

impl EnvironmentStore for ProcessEnvironment {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, name: &str) -> Option<String> {
        match std::env::var(name) {
            Ok(value) => Some(value),
            Err(std::env::VarError::NotPresent) => None,
            Err(std::env::VarError::NotUnicode(_)) => {
                tracing::warn!(name = name, "Environment variable contains invalid UTF-8, ignoring");
                None
            }
        }
    }

    fn set(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }
}

/// In-memory environment
///
/// Useful for tests and for hosts that want to feed the engine a snapshot
/// instead of the live process environment.
#[derive(Debug, Default)]
pub struct MemoryEnvironment {
    vars: RwLock<HashMap<String, String>>,
}

impl MemoryEnvironment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment pre-populated with variables
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            vars: RwLock::new(vars),
        }
    }

    /// Add a variable (builder pattern)
    pub fn with_var(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a variable
    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut vars = self.vars.write().unwrap_or_else(|e| e.into_inner());
        vars.insert(name.into(), value.into());
    }

    /// Remove a variable
    pub fn remove(&self, name: &str) -> Option<String> {
        let mut vars = self.vars.write().unwrap_or_else(|e| e.into_inner());
        vars.remove(name)
    }
}

impl EnvironmentStore for MemoryEnvironment {
    fn name(&self) -> &str {
        "memory_env"
    }

    fn get(&self, name: &str) -> Option<String> {
        let vars = self.vars.read().unwrap_or_else(|e| e.into_inner());
        vars.get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) {
        self.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_env_roundtrip() {
        let env = ProcessEnvironment::new();
        assert_eq!(env.get("LAYERED_ENV_TEST_UNSET"), None);

        env.set("LAYERED_ENV_TEST_SET", "value");
        assert_eq!(env.get("LAYERED_ENV_TEST_SET"), Some("value".to_string()));

        std::env::remove_var("LAYERED_ENV_TEST_SET");
    }

    #[test]
    fn test_process_env_uses_exact_name() {
        std::env::set_var("LAYERED_ENV_TEST_CASE", "upper");
        let env = ProcessEnvironment::new();

        assert_eq!(env.get("layered_env_test_case"), None);
        assert_eq!(env.get("LAYERED_ENV_TEST_CASE"), Some("upper".to_string()));

        std::env::remove_var("LAYERED_ENV_TEST_CASE");
    }

    #[test]
    fn test_memory_env() {
        let env = MemoryEnvironment::from_pairs([("PORT", "8080")]).with_var("HOST", "localhost");

        assert_eq!(env.get("PORT"), Some("8080".to_string()));
        assert_eq!(env.get("HOST"), Some("localhost".to_string()));
        assert_eq!(env.get("MISSING"), None);

        env.set("PORT", "9090");
        assert_eq!(env.get("PORT"), Some("9090".to_string()));

        assert_eq!(env.remove("HOST"), Some("localhost".to_string()));
        assert_eq!(env.get("HOST"), None);
    }

    #[test]
    fn test_empty_value_is_present() {
        let env = MemoryEnvironment::new().with_var("EMPTY", "");
        assert_eq!(env.get("EMPTY"), Some(String::new()));
    }
}
