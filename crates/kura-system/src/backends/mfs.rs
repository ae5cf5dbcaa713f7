//! Mutable File System (MFS) storage on an IPFS node.
//!
//! `mfs://host[:port]/base` maps paths onto the node's `files/*` API under
//! `/base`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Instrument, debug, trace};
use url::Url;

use crate::content::content_id;
use crate::dispatch::SystemScheme;
use crate::env::Environment;
use crate::error::{SystemError, SystemResult};
use crate::ipfs_client::{IpfsClient, MfsWriteOptions};
use crate::ops::{SharedBytes, SharedSystem, System, SystemPredicate};
use crate::options::{ReadOptions, WriteOptions};

#[derive(Debug, Clone)]
pub struct MfsSystem {
    name: String,
    client: IpfsClient,
    /// Absolute MFS directory, `/` at the root.
    path_base: String,
    environment: Environment,
}

impl MfsSystem {
    pub fn new(name: impl Into<String>, client: IpfsClient, path_base: &str) -> Self {
        Self {
            name: name.into(),
            client,
            path_base: absolute(path_base),
            environment: Environment::new(),
        }
    }

    pub fn from_url(name: impl Into<String>, url: &Url) -> SystemResult<Self> {
        SystemScheme::expect(url, SystemScheme::Mfs)?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| SystemError::invalid_path(format!("{url}: missing host")))?;
        let client = IpfsClient::from_host(host, url.port())?;
        Ok(Self::new(name, client, url.path()))
    }

    pub fn path_base(&self) -> &str {
        &self.path_base
    }

    fn mfs_path(&self, path: &str) -> String {
        let base = self.path_base.trim_end_matches('/');
        format!("{base}/{}", path.trim_start_matches('/'))
    }
}

/// `/`-rooted form of a URL path, without a trailing slash.
fn absolute(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{trimmed}")
}

fn to_mfs_options(options: &WriteOptions) -> MfsWriteOptions {
    MfsWriteOptions {
        create: true,
        parents: true,
        truncate: true,
        mode: options.mode,
    }
}

#[async_trait]
impl System for MfsSystem {
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
            client: self.client.clone(),
            path_base: self.mfs_path(segment),
            environment: self.environment.clone(),
        }))
    }

    fn exit(&self, code: i32) -> SystemResult<()> {
        debug!(system = %self.name, code, "exit ignored");
        Ok(())
    }

    fn cwd(&self) -> Option<String> {
        None
    }

    fn homedir(&self) -> Option<String> {
        None
    }

    async fn read_file(&self, path: &str, options: &ReadOptions) -> SystemResult<Vec<u8>> {
        let full = self.mfs_path(path);
        let span = tracing::info_span!("mfs.read", system = %self.name, path = %full);
        async {
            let bytes = self.client.files_read(&full).await?;
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
        let full = self.mfs_path(&id);
        let span = tracing::info_span!("mfs.write", system = %self.name, path = %full);
        async {
            let existing = if path.is_none() || options.is_exclusive() {
                self.client.files_stat(&full).await?
            } else {
                None
            };

            if let Some(stat) = existing {
                if path.is_none() {
                    trace!(cid = %stat.hash, "content already stored, skipping write");
                    return Ok(id);
                }
                return Err(SystemError::already_exists(&full));
            }

            self.client
                .files_write(&full, &bytes, &to_mfs_options(options))
                .await?;
            Ok(id)
        }
        .instrument(span)
        .await
    }
}
