//! Per-call read and write options.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{SystemError, SystemResult};

/// Payload encoding a reader expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Utf8,
}

/// Open flag for reads. Only plain reads exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize)]
pub enum ReadFlag {
    #[default]
    #[strum(serialize = "r")]
    #[serde(rename = "r")]
    Read,
}

/// Open flag for writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize)]
pub enum WriteFlag {
    /// Create or overwrite.
    #[default]
    #[strum(serialize = "w")]
    #[serde(rename = "w")]
    Write,
    /// Fail if the target already exists.
    #[strum(serialize = "wx")]
    #[serde(rename = "wx")]
    Exclusive,
}

/// Options for [`System::read_file`](crate::System::read_file).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    pub timeout_millis: Option<u64>,
    pub encoding: Option<Encoding>,
    pub flag: Option<ReadFlag>,
}

impl ReadOptions {
    pub fn with_timeout_millis(mut self, millis: u64) -> Self {
        self.timeout_millis = Some(millis);
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Per-call timeout, falling back to `default`.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_millis.map(Duration::from_millis).unwrap_or(default)
    }

    /// Check a payload against the requested encoding.
    ///
    /// Backends call this on every successful read so that a `utf8` reader
    /// never receives bytes it cannot decode.
    pub fn check_encoding(&self, path: &str, bytes: Vec<u8>) -> SystemResult<Vec<u8>> {
        match self.encoding {
            Some(Encoding::Utf8) => match std::str::from_utf8(&bytes) {
                Ok(_) => Ok(bytes),
                Err(e) => Err(SystemError::invalid_data(format!("{path}: {e}"))),
            },
            None => Ok(bytes),
        }
    }
}

/// Options for [`System::write_file`](crate::System::write_file).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    pub timeout_millis: Option<u64>,
    /// Unix permission bits for newly created files.
    pub mode: Option<u32>,
    pub flag: Option<WriteFlag>,
}

impl WriteOptions {
    pub fn with_timeout_millis(mut self, millis: u64) -> Self {
        self.timeout_millis = Some(millis);
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.flag = Some(WriteFlag::Exclusive);
        self
    }

    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_millis.map(Duration::from_millis).unwrap_or(default)
    }

    pub fn is_exclusive(&self) -> bool {
        self.flag == Some(WriteFlag::Exclusive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_flag_strings() {
        assert_eq!(WriteFlag::from_str("wx").unwrap(), WriteFlag::Exclusive);
        assert_eq!(WriteFlag::from_str("w").unwrap(), WriteFlag::Write);
        assert!(WriteFlag::from_str("a").is_err());
        assert_eq!(ReadFlag::Read.as_ref(), "r");
        assert_eq!(Encoding::from_str("utf8").unwrap(), Encoding::Utf8);
    }

    #[test]
    fn test_timeout_fallback() {
        let default = Duration::from_secs(10);
        assert_eq!(ReadOptions::default().timeout_or(default), default);
        assert_eq!(
            ReadOptions::default().with_timeout_millis(100).timeout_or(default),
            Duration::from_millis(100)
        );
        assert_eq!(
            WriteOptions::default().with_timeout_millis(5).timeout_or(default),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn test_utf8_check() {
        let opts = ReadOptions::default().with_encoding(Encoding::Utf8);
        assert_eq!(opts.check_encoding("a", b"ok".to_vec()).unwrap(), b"ok");
        assert!(matches!(
            opts.check_encoding("a", vec![0xff, 0xfe]),
            Err(SystemError::InvalidData(_))
        ));
        assert!(ReadOptions::default().check_encoding("a", vec![0xff]).is_ok());
    }

    #[test]
    fn test_exclusive() {
        assert!(WriteOptions::default().exclusive().is_exclusive());
        assert!(!WriteOptions::default().is_exclusive());
    }
}
