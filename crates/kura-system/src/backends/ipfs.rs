//! Content-addressed storage on an IPFS node.
//!
//! Reads take a CID; writes ignore the path and return the CID the node
//! assigned.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Instrument, debug};
use url::Url;

use crate::dispatch::SystemScheme;
use crate::env::Environment;
use crate::error::{SystemError, SystemResult};
use crate::ipfs_client::IpfsClient;
use crate::ops::{SharedBytes, SharedSystem, System, SystemPredicate};
use crate::options::{ReadOptions, WriteOptions};

/// IPFS storage system addressed by `ipfs://host[:port]`.
#[derive(Debug, Clone)]
pub struct IpfsSystem {
    name: String,
    client: IpfsClient,
    environment: Environment,
}

impl IpfsSystem {
    pub fn new(name: impl Into<String>, client: IpfsClient) -> Self {
        Self {
            name: name.into(),
            client,
            environment: Environment::new(),
        }
    }

    pub fn from_url(name: impl Into<String>, url: &Url) -> SystemResult<Self> {
        SystemScheme::expect(url, SystemScheme::Ipfs)?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| SystemError::invalid_path(format!("{url}: missing host")))?;
        Ok(Self::new(name, IpfsClient::from_host(host, url.port())?))
    }

    pub fn client(&self) -> &IpfsClient {
        &self.client
    }
}

#[async_trait]
impl System for IpfsSystem {
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
        // CIDs have no hierarchy; the sub-system only differs by name.
        Ok(Arc::new(Self {
            name: format!("{}/{}", self.name, segment),
            client: self.client.clone(),
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
        let span = tracing::info_span!("ipfs.read", system = %self.name, cid = %path);
        async {
            let bytes = self.client.cat(path).await?;
            options.check_encoding(path, bytes)
        }
        .instrument(span)
        .await
    }

    async fn write_file(
        &self,
        bytes: SharedBytes,
        path: Option<&str>,
        _options: &WriteOptions,
    ) -> SystemResult<String> {
        let span = tracing::info_span!("ipfs.write", system = %self.name, path = ?path, len = bytes.len());
        async {
            let cid = self.client.add(&bytes).await?;
            debug!(cid = %cid, "added");
            Ok(cid)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url() {
        let url = Url::parse("ipfs://localhost").unwrap();
        let sys = IpfsSystem::from_url("node", &url).unwrap();
        assert_eq!(sys.client().api().as_str(), "http://localhost:5001/api/v0/");

        let url = Url::parse("ipfs://node.local:5002").unwrap();
        let sys = IpfsSystem::from_url("node", &url).unwrap();
        assert_eq!(sys.client().api().port(), Some(5002));
    }

    #[test]
    fn test_wrong_scheme() {
        let url = Url::parse("mfs://localhost/x").unwrap();
        assert!(IpfsSystem::from_url("node", &url).is_err());
    }

    #[test]
    fn test_missing_host() {
        let url = Url::parse("ipfs:QmSomething").unwrap();
        assert!(matches!(
            IpfsSystem::from_url("node", &url),
            Err(SystemError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_local_surface() {
        let url = Url::parse("ipfs://localhost").unwrap();
        let sys = IpfsSystem::from_url("node", &url).unwrap();
        let sub = sys.sub_system("blobs").unwrap();
        assert_eq!(sub.name(), "node/blobs");
        sub.env("K", Some("v")).unwrap();
        assert_eq!(sys.env("K", None).unwrap().as_deref(), Some("v"));
        assert!(sys.exit(1).is_ok());
        assert_eq!(sys.cwd(), None);
        assert_eq!(sys.homedir(), None);
        assert!(sys.select_systems(&|_| true).is_err());
    }

    #[tokio::test]
    #[ignore = "needs an IPFS node on localhost:5001"]
    async fn test_write_then_read_live() {
        let url = Url::parse("ipfs://localhost").unwrap();
        let sys = IpfsSystem::from_url("node", &url).unwrap();
        let cid = sys
            .write_file(Arc::from(&b"kura ipfs test"[..]), None, &WriteOptions::default())
            .await
            .unwrap();
        let data = sys.read_file(&cid, &ReadOptions::default()).await.unwrap();
        assert_eq!(data, b"kura ipfs test");
    }
}
