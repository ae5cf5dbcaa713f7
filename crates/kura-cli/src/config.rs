//! Aggregate configuration, loaded from RON.
//!
//! ```ron
//! (
//!     name: "all",
//!     timeout_millis: Some(5000),
//!     systems: [
//!         (name: "disk", url: "file:///var/lib/kura"),
//!         (name: "node", url: "mfs://localhost:5001/kura"),
//!     ],
//! )
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use kura_system::{MultiSystem, SystemResult, create_multi_system};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// One member of the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberConfig {
    pub name: String,
    pub url: String,
}

impl MemberConfig {
    /// Parse `NAME=URL`, as given to `--system`.
    pub fn parse(arg: &str) -> Result<Self, String> {
        match arg.split_once('=') {
            Some((name, url)) if !name.is_empty() && !url.is_empty() => Ok(Self {
                name: name.to_string(),
                url: url.to_string(),
            }),
            _ => Err(format!("expected NAME=URL, got `{arg}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemsConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub timeout_millis: Option<u64>,
    #[serde(default)]
    pub systems: Vec<MemberConfig>,
}

fn default_name() -> String {
    "all".to_string()
}

impl Default for SystemsConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            timeout_millis: None,
            systems: Vec::new(),
        }
    }
}

impl SystemsConfig {
    /// `$XDG_CONFIG_HOME/kura/systems.ron`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kura").join("systems.ron"))
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Load `explicit` if given (it must exist), otherwise the default path
    /// when present, otherwise an empty config.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Replace same-named members and append new ones, keeping file order.
    pub fn apply_overrides(&mut self, overrides: &[MemberConfig]) {
        for member in overrides {
            match self.systems.iter_mut().find(|m| m.name == member.name) {
                Some(existing) => existing.url = member.url.clone(),
                None => self.systems.push(member.clone()),
            }
        }
    }

    /// Build the aggregate described by this config.
    pub fn build(&self) -> SystemResult<MultiSystem> {
        let members = self.systems.iter().map(|m| (m.name.as_str(), m.url.as_str()));
        let multi = create_multi_system(&self.name, members)?;
        Ok(match self.timeout_millis {
            Some(millis) => multi.with_default_timeout(Duration::from_millis(millis)),
            None => multi,
        })
    }
}
