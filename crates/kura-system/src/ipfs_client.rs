//! Minimal client for the IPFS node RPC API (`/api/v0`).
//!
//! Only the calls the IPFS and MFS systems need: `cat`, `add` and the
//! `files/*` family. Every RPC is a POST; failures come back as a JSON
//! object with a `Message` field.

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::trace;
use url::Url;

use crate::error::{SystemError, SystemResult};

/// Port the RPC API listens on when a URL names none.
pub const DEFAULT_IPFS_PORT: u16 = 5001;

/// Entry returned by `add`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddedEntry {
    pub name: String,
    pub hash: String,
    #[serde(default)]
    pub size: Option<String>,
}

/// Result of `files/stat`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MfsStat {
    pub hash: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "Type", default)]
    pub kind: String,
}

/// Flags for `files/write`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MfsWriteOptions {
    pub create: bool,
    pub parents: bool,
    pub truncate: bool,
    pub mode: Option<u32>,
}

impl MfsWriteOptions {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("create", self.create.to_string()),
            ("parents", self.parents.to_string()),
            ("truncate", self.truncate.to_string()),
        ];
        if let Some(mode) = self.mode {
            pairs.push(("mode", format!("{mode:o}")));
        }
        pairs
    }
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(rename = "Message")]
    message: String,
}

/// HTTP client bound to one node's RPC API.
#[derive(Debug, Clone)]
pub struct IpfsClient {
    http: Client,
    api: Url,
}

impl IpfsClient {
    /// Client for `http://{host}:{port}/api/v0/`.
    pub fn from_host(host: &str, port: Option<u16>) -> SystemResult<Self> {
        let port = port.unwrap_or(DEFAULT_IPFS_PORT);
        let api = Url::parse(&format!("http://{host}:{port}/api/v0/"))?;
        Ok(Self {
            http: Client::builder().build()?,
            api,
        })
    }

    pub fn api(&self) -> &Url {
        &self.api
    }

    fn endpoint(&self, command: &str, args: &[(&str, String)]) -> SystemResult<Url> {
        let mut url = self.api.join(command)?;
        if !args.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in args {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn post(&self, url: Url, form: Option<Form>) -> SystemResult<reqwest::Response> {
        trace!(url = %url, "ipfs rpc");
        let request = self.http.post(url);
        let request = match form {
            Some(form) => request.multipart(form),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(remote_error(status.as_u16(), &body))
    }

    /// `cat`: bytes of an immutable CID.
    pub async fn cat(&self, cid: &str) -> SystemResult<Vec<u8>> {
        let url = self.endpoint("cat", &[("arg", cid.to_string())])?;
        let response = self.post(url, None).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// `add`: store bytes, returning their CID.
    pub async fn add(&self, bytes: &[u8]) -> SystemResult<String> {
        let url = self.endpoint("add", &[("pin", "true".to_string())])?;
        let form = Form::new().part("file", Part::bytes(bytes.to_vec()).file_name("data"));
        let response = self.post(url, Some(form)).await?;
        let entry: AddedEntry = response.json().await?;
        Ok(entry.hash)
    }

    /// `files/read`: bytes of a mutable path.
    pub async fn files_read(&self, path: &str) -> SystemResult<Vec<u8>> {
        let url = self.endpoint("files/read", &[("arg", path.to_string())])?;
        let response = self.post(url, None).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// `files/stat`, with `None` when the node reports an error for the path.
    pub async fn files_stat(&self, path: &str) -> SystemResult<Option<MfsStat>> {
        let url = self.endpoint("files/stat", &[("arg", path.to_string())])?;
        match self.post(url, None).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(SystemError::Remote { status, message }) => {
                trace!(path, status, message = %message, "files/stat miss");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// `files/write`: store bytes at a mutable path.
    pub async fn files_write(
        &self,
        path: &str,
        bytes: &[u8],
        options: &MfsWriteOptions,
    ) -> SystemResult<()> {
        let mut args = vec![("arg", path.to_string())];
        args.extend(options.query());
        let url = self.endpoint("files/write", &args)?;
        let form = Form::new().part("file", Part::bytes(bytes.to_vec()).file_name("data"));
        self.post(url, Some(form)).await?;
        Ok(())
    }
}

fn remote_error(status: u16, body: &str) -> SystemError {
    let message = match serde_json::from_str::<RpcError>(body) {
        Ok(err) => err.message,
        Err(_) => body.trim().to_string(),
    };
    SystemError::Remote { status, message }
}
