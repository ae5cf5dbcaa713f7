//! Per-system environment tables.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Key/value environment owned by a system.
///
/// Cloning shares the table: a sub-system sees and mutates the same
/// entries as its parent. Use [`Environment::isolated`] for a private copy.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: Arc<RwLock<HashMap<String, String>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the process environment. Later sets stay local to the table.
    ///
    /// Variables that are not valid unicode are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    /// Get when `value` is `None`, otherwise set and return the new value.
    pub fn access(&self, key: &str, value: Option<&str>) -> Option<String> {
        match value {
            None => self.get(key),
            Some(value) => {
                self.set(key, value);
                Some(value.to_string())
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.write().insert(key.into(), value.into());
    }

    /// Deep copy that no longer shares entries with `self`.
    pub fn isolated(&self) -> Self {
        Self::from_iter(self.vars.read().clone())
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: Arc::new(RwLock::new(iter.into_iter().collect())),
        }
    }
}
