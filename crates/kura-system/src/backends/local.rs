//! Local filesystem storage system.
//!
//! Paths resolve under a base directory taken from a `file://` URL.
//! Writes create missing parent directories.

use std::fmt;
use std::io;
use std::path::{Component, Path};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::Instrument;
use url::Url;

use crate::content::content_id;
use crate::dispatch::SystemScheme;
use crate::env::Environment;
use crate::error::{SystemError, SystemResult};
use crate::ops::{SharedBytes, SharedSystem, System, SystemPredicate};
use crate::options::{ReadOptions, WriteOptions};
use crate::path::{join_to_base, portable_cwd, url_to_file_system_base};

/// Called by [`LocalSystem`] on `exit`.
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Local filesystem storage system.
///
/// All operations are relative to `base`: with base `/var/lib/kura`,
/// `read_file("a/b")` reads `/var/lib/kura/a/b`. Paths containing `..`
/// are rejected so a caller cannot climb out of the base.
///
/// The environment starts as a snapshot of the process environment;
/// sets are local to the system and its sub-systems.
#[derive(Clone)]
pub struct LocalSystem {
    name: String,
    base: String,
    environment: Environment,
    exit_hook: ExitHook,
}

impl fmt::Debug for LocalSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSystem")
            .field("name", &self.name)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl LocalSystem {
    /// Create a local system rooted at the current working directory.
    pub fn new(name: impl Into<String>) -> SystemResult<Self> {
        Ok(Self::with_base(name, portable_cwd()?))
    }

    /// Create a local system rooted at `base`.
    pub fn with_base(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            environment: Environment::from_process(),
            exit_hook: Arc::new(|code| std::process::exit(code)),
        }
    }

    /// Create from a `file://` URL.
    pub fn from_url(name: impl Into<String>, url: &Url) -> SystemResult<Self> {
        SystemScheme::expect(url, SystemScheme::File)?;
        Ok(Self::with_base(name, url_to_file_system_base(url)))
    }

    /// Replace what `exit` does (the default ends the process).
    pub fn with_exit_hook(mut self, hook: ExitHook) -> Self {
        self.exit_hook = hook;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve a relative path against the base.
    fn resolve(&self, path: &str) -> SystemResult<String> {
        if Path::new(path)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(SystemError::invalid_path(path));
        }
        Ok(join_to_base(&self.base, Some(path)))
    }

    async fn write_resolved(
        full: &str,
        bytes: &[u8],
        options: &WriteOptions,
    ) -> io::Result<()> {
        if let Some(parent) = Path::new(full).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut open = fs::OpenOptions::new();
        open.write(true);
        if options.is_exclusive() {
            open.create_new(true);
        } else {
            open.create(true).truncate(true);
        }
        #[cfg(unix)]
        {
            if let Some(mode) = options.mode {
                open.mode(mode);
            }
        }

        let mut file = open.open(full).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl System for LocalSystem {
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
            base: self.resolve(segment)?,
            environment: self.environment.clone(),
            exit_hook: Arc::clone(&self.exit_hook),
        }))
    }

    fn exit(&self, code: i32) -> SystemResult<()> {
        (self.exit_hook)(code);
        Ok(())
    }

    fn cwd(&self) -> Option<String> {
        portable_cwd().ok()
    }

    fn homedir(&self) -> Option<String> {
        dirs::home_dir().map(|p| p.to_string_lossy().into_owned())
    }

    async fn read_file(&self, path: &str, options: &ReadOptions) -> SystemResult<Vec<u8>> {
        let full = self.resolve(path)?;
        let span = tracing::debug_span!("local.read", system = %self.name, path = %full);
        async {
            let bytes = fs::read(&full).await.map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SystemError::not_found(&full),
                _ => SystemError::from(e),
            })?;
            options.check_encoding(&full, bytes)
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
        let full = self.resolve(&id)?;
        let span = tracing::debug_span!("local.write", system = %self.name, path = %full);
        async {
            Self::write_resolved(&full, &bytes, options)
                .await
                .map_err(|e| match e.kind() {
                    io::ErrorKind::AlreadyExists => SystemError::already_exists(&id),
                    _ => SystemError::from(e),
                })?;
            Ok(id)
        }
        .instrument(span)
        .await
    }
}
