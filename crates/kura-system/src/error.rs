//! System error types.

use std::io;
use std::time::Duration;

use strum::{Display, EnumString};
use thiserror::Error;

/// The two operations an aggregate races across its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    fn preposition(self) -> &'static str {
        match self {
            Operation::Read => "from",
            Operation::Write => "to",
        }
    }
}

/// System error type.
#[derive(Debug, Error)]
pub enum SystemError {
    /// An aggregate was asked to read or write with no members.
    #[error("no systems to {operation} {}", .operation.preposition())]
    NoSystems { operation: Operation },

    /// No member produced a winning result before the deadline.
    #[error(
        "timeout: {operation} {target} on systems [{members}] after {millis}ms",
        target = .path.as_deref().unwrap_or("<content id>"),
        members = .systems.join(", "),
        millis = .timeout.as_millis()
    )]
    Timeout {
        operation: Operation,
        path: Option<String>,
        timeout: Duration,
        systems: Vec<String>,
    },

    /// Name-based lookup matched no member.
    #[error("no system found for name: {0}")]
    NoMatchingSystem(String),

    /// The dispatcher does not know the URL scheme.
    #[error("unable to create system from scheme: {scheme}, valid schemes: {}", .valid.join(", "))]
    UnsupportedScheme { scheme: String, valid: Vec<String> },

    /// The backend does not implement this operation.
    #[error("{operation} not supported by system {system}")]
    Unsupported {
        system: String,
        operation: &'static str,
    },

    /// No payload stored at the path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Exclusive write to a path that already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Path cannot be used by this backend.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Payload does not match the requested encoding.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The remote store answered with an error.
    #[error("remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl SystemError {
    /// Create a NoSystems error.
    pub fn no_systems(operation: Operation) -> Self {
        Self::NoSystems { operation }
    }

    /// Create a Timeout error.
    pub fn timeout(
        operation: Operation,
        path: Option<&str>,
        timeout: Duration,
        systems: Vec<String>,
    ) -> Self {
        Self::Timeout {
            operation,
            path: path.map(str::to_string),
            timeout,
            systems,
        }
    }

    /// Create a NoMatchingSystem error.
    pub fn no_matching_system(name: impl Into<String>) -> Self {
        Self::NoMatchingSystem(name.into())
    }

    /// Create an Unsupported error.
    pub fn unsupported(system: impl Into<String>, operation: &'static str) -> Self {
        Self::Unsupported {
            system: system.into(),
            operation,
        }
    }

    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create an InvalidData error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// True for errors raised by the aggregate itself rather than a member.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::NoSystems { .. } | Self::Timeout { .. })
    }
}

/// Convert SystemError to std::io::Error for compatibility.
impl From<SystemError> for io::Error {
    fn from(e: SystemError) -> Self {
        match e {
            SystemError::Io(e) => e,
            SystemError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            SystemError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            SystemError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            SystemError::InvalidData(msg) => io::Error::new(io::ErrorKind::InvalidData, msg),
            e @ SystemError::Timeout { .. } => io::Error::new(io::ErrorKind::TimedOut, e),
            e @ SystemError::Unsupported { .. } => io::Error::new(io::ErrorKind::Unsupported, e),
            e @ SystemError::NoMatchingSystem(_) => io::Error::new(io::ErrorKind::NotFound, e),
            e @ SystemError::InvalidUrl(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
            e => io::Error::other(e),
        }
    }
}

/// System result type.
pub type SystemResult<T> = Result<T, SystemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_systems_message() {
        assert_eq!(
            SystemError::no_systems(Operation::Read).to_string(),
            "no systems to read from"
        );
        assert_eq!(
            SystemError::no_systems(Operation::Write).to_string(),
            "no systems to write to"
        );
    }

    #[test]
    fn test_timeout_message_names_everything() {
        let err = SystemError::timeout(
            Operation::Read,
            Some("a/b.txt"),
            Duration::from_millis(250),
            vec!["disk".into(), "node".into()],
        );
        let msg = err.to_string();
        assert!(msg.contains("a/b.txt"), "{msg}");
        assert!(msg.contains("disk, node"), "{msg}");
        assert!(msg.contains("250ms"), "{msg}");
        assert!(err.is_aggregate());
    }

    #[test]
    fn test_io_conversion() {
        let io: io::Error = SystemError::not_found("x").into();
        assert_eq!(io.kind(), io::ErrorKind::NotFound);

        let io: io::Error =
            SystemError::timeout(Operation::Write, None, Duration::from_secs(1), vec![]).into();
        assert_eq!(io.kind(), io::ErrorKind::TimedOut);
    }
}
