//! In-memory storage system.
//!
//! Used for `mem:` URLs and testing. All data is ephemeral.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::Instrument;
use url::Url;

use crate::content::content_id;
use crate::dispatch::SystemScheme;
use crate::env::Environment;
use crate::error::{SystemError, SystemResult};
use crate::ops::{SharedBytes, SharedSystem, System, SystemPredicate};
use crate::options::{ReadOptions, WriteOptions};
use crate::path::{join_to_base, url_to_file_system_base};

/// Byte store shared by a memory system and all of its sub-systems.
pub type ByteStore = Arc<DashMap<String, Vec<u8>>>;

/// In-memory storage system.
///
/// Keys are `base/path`. Sub-systems share the store and environment,
/// so a write through `a/b` is visible from `a` under `b/...`.
#[derive(Debug, Clone)]
pub struct MemorySystem {
    name: String,
    base: String,
    store: ByteStore,
    environment: Environment,
}

impl MemorySystem {
    /// Create an empty memory system with no base.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_store(name, "", ByteStore::default())
    }

    /// Create a memory system over an existing store.
    pub fn with_store(name: impl Into<String>, base: impl Into<String>, store: ByteStore) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            store,
            environment: Environment::new(),
        }
    }

    /// Create from a `mem://` URL; host and path become the base.
    pub fn from_url(name: impl Into<String>, url: &Url) -> SystemResult<Self> {
        SystemScheme::expect(url, SystemScheme::Mem)?;
        Ok(Self::with_store(
            name,
            url_to_file_system_base(url),
            ByteStore::default(),
        ))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Sorted copy of every stored key and payload.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.store
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn key(&self, path: &str) -> String {
        join_to_base(&self.base, Some(path))
    }
}

#[async_trait]
impl System for MemorySystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn env(&self, key: &str, value: Option<&str>) -> SystemResult<Option<String>> {
        Ok(self.environment.access(key, value))
    }

    fn select_systems(&self, _predicate: SystemPredicate<'_>) -> SystemResult<Vec<SharedSystem>> {
        Err(SystemError::unsupported(&self.name, "select_systems"))
    }

    fn sub_system(&self, segment: &str) -> SystemResult<SharedSystem> {
        Ok(Arc::new(Self {
            name: format!("{}/{}", self.name, segment),
            base: join_to_base(&self.base, Some(segment)),
            store: Arc::clone(&self.store),
            environment: self.environment.clone(),
        }))
    }

    fn exit(&self, _code: i32) -> SystemResult<()> {
        Err(SystemError::unsupported(&self.name, "exit"))
    }

    fn cwd(&self) -> Option<String> {
        Some(String::new())
    }

    fn homedir(&self) -> Option<String> {
        Some("/".to_string())
    }

    async fn read_file(&self, path: &str, options: &ReadOptions) -> SystemResult<Vec<u8>> {
        let key = self.key(path);
        let span = tracing::trace_span!("memory.read", system = %self.name, key = %key);
        async {
            let bytes = self
                .store
                .get(&key)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| SystemError::not_found(&key))?;
            options.check_encoding(&key, bytes)
        }
        .instrument(span)
        .await
    }

    async fn write_file(
        &self,
        bytes: SharedBytes,
        path: Option<&str>,
        options: &WriteOptions,
    ) -> SystemResult<String> {
        let id = match path {
            Some(path) => path.to_string(),
            None => content_id(&bytes),
        };
        let key = self.key(&id);
        let span = tracing::trace_span!("memory.write", system = %self.name, key = %key);
        async {
            if options.is_exclusive() {
                match self.store.entry(key) {
                    Entry::Occupied(entry) => {
                        return Err(SystemError::already_exists(entry.key().as_str()));
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(bytes.to_vec());
                    }
                }
            } else {
                self.store.insert(key, bytes.to_vec());
            }
            Ok(id)
        }
        .instrument(span)
        .await
    }
}
