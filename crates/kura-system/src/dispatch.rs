//! Build systems from URLs.
//!
//! The URL scheme picks the backend:
//!
//! | scheme  | backend         |
//! |---------|-----------------|
//! | `file:` | [`LocalSystem`] |
//! | `mem:`  | [`MemorySystem`]|
//! | `ipfs:` | [`IpfsSystem`]  |
//! | `mfs:`  | [`MfsSystem`]   |

use std::str::FromStr;
use std::sync::Arc;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::debug;
use url::Url;

use crate::backends::{IpfsSystem, LocalSystem, MemorySystem, MfsSystem};
use crate::error::{SystemError, SystemResult};
use crate::multi::MultiSystem;
use crate::ops::SharedSystem;

/// URL schemes with a backend behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SystemScheme {
    File,
    Mem,
    Ipfs,
    Mfs,
}

impl SystemScheme {
    /// Every recognized scheme, in declaration order.
    pub fn valid() -> Vec<String> {
        Self::iter().map(|scheme| scheme.to_string()).collect()
    }

    /// Fail unless `url` uses `expected`.
    pub fn expect(url: &Url, expected: SystemScheme) -> SystemResult<()> {
        match SystemScheme::from_str(url.scheme()) {
            Ok(scheme) if scheme == expected => Ok(()),
            _ => Err(SystemError::other(format!(
                "wrong scheme for {expected} system: {}",
                url.scheme()
            ))),
        }
    }
}

/// Create a single-backend system named `name` from a URL string.
pub fn create_system(name: &str, url: &str) -> SystemResult<SharedSystem> {
    let url = Url::parse(url)?;
    create_system_from_url(name, &url)
}

/// Create a single-backend system named `name` from a parsed URL.
pub fn create_system_from_url(name: &str, url: &Url) -> SystemResult<SharedSystem> {
    let scheme = SystemScheme::from_str(url.scheme()).map_err(|_| {
        SystemError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
            valid: SystemScheme::valid(),
        }
    })?;
    debug!(name, url = %url, %scheme, "creating system");

    let system: SharedSystem = match scheme {
        SystemScheme::File => Arc::new(LocalSystem::from_url(name, url)?),
        SystemScheme::Mem => Arc::new(MemorySystem::from_url(name, url)?),
        SystemScheme::Ipfs => Arc::new(IpfsSystem::from_url(name, url)?),
        SystemScheme::Mfs => Arc::new(MfsSystem::from_url(name, url)?),
    };
    Ok(system)
}

/// Create an aggregate whose members are built with [`create_system`],
/// in the given order.
pub fn create_multi_system<I, N, U>(name: &str, members: I) -> SystemResult<MultiSystem>
where
    I: IntoIterator<Item = (N, U)>,
    N: AsRef<str>,
    U: AsRef<str>,
{
    let systems = members
        .into_iter()
        .map(|(member, url)| create_system(member.as_ref(), url.as_ref()))
        .collect::<SystemResult<Vec<_>>>()?;
    Ok(MultiSystem::new(name, systems))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::System;

    #[test]
    fn test_scheme_strings() {
        assert_eq!(SystemScheme::Ipfs.to_string(), "ipfs");
        assert_eq!(SystemScheme::from_str("mfs").unwrap(), SystemScheme::Mfs);
        assert_eq!(SystemScheme::valid(), vec!["file", "mem", "ipfs", "mfs"]);
    }

    #[test]
    fn test_create_each_backend() {
        let cases = [
            ("file:///tmp/kura", "disk"),
            ("mem://scratch", "scratch"),
            ("ipfs://localhost", "node"),
            ("mfs://localhost/kura", "mutable"),
        ];
        for (url, name) in cases {
            let system = create_system(name, url).unwrap();
            assert_eq!(system.name(), name, "{url}");
        }
    }

    #[test]
    fn test_unsupported_scheme_lists_valid() {
        let err = create_system("web", "https://example.com").unwrap_err();
        match &err {
            SystemError::UnsupportedScheme { scheme, valid } => {
                assert_eq!(scheme, "https");
                assert_eq!(valid.len(), 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("file, mem, ipfs, mfs"));
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            create_system("x", "not a url"),
            Err(SystemError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_expect() {
        let url = Url::parse("mem://a").unwrap();
        assert!(SystemScheme::expect(&url, SystemScheme::Mem).is_ok());
        assert!(SystemScheme::expect(&url, SystemScheme::File).is_err());
    }

    #[test]
    fn test_create_multi_system_keeps_order() {
        let multi = create_multi_system(
            "all",
            [("a", "mem://a"), ("b", "mem://b"), ("c", "file:///tmp")],
        )
        .unwrap();
        let names: Vec<&str> = multi.systems().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(multi.name(), "all");

        assert!(create_multi_system("bad", [("a", "gopher://x")]).is_err());
    }
}
