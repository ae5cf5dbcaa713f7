//! Name-based lookup of a member system.

use std::sync::Arc;

use tracing::trace;

use crate::error::{SystemError, SystemResult};
use crate::ops::SharedSystem;

/// Resolve a human-supplied system name against `system`.
///
/// With no name, `system` itself is returned. Otherwise members whose name
/// starts with `name` (or `name/sub`) are selected and the first one in
/// member order wins; ambiguity is not an error.
pub fn select_system(
    system: &SharedSystem,
    name: Option<&str>,
    sub: Option<&str>,
) -> SystemResult<SharedSystem> {
    let Some(name) = name else {
        return Ok(Arc::clone(system));
    };

    let wanted = match sub {
        Some(sub) => format!("{name}/{sub}"),
        None => name.to_string(),
    };

    let matches = system.select_systems(&|candidate| {
        trace!(candidate = %candidate.name(), wanted = %wanted, "checking system match");
        candidate.name().starts_with(&wanted)
    })?;

    matches
        .into_iter()
        .next()
        .ok_or_else(|| SystemError::no_matching_system(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MultiSystem;
    use crate::backends::MemorySystem;

    fn aggregate() -> SharedSystem {
        Arc::new(MultiSystem::new(
            "all",
            vec![
                Arc::new(MemorySystem::new("disk")),
                Arc::new(MemorySystem::new("node-a")),
                Arc::new(MemorySystem::new("node-b")),
            ],
        ))
    }

    #[test]
    fn test_no_name_returns_self() {
        let all = aggregate();
        let picked = select_system(&all, None, None).unwrap();
        assert!(Arc::ptr_eq(&all, &picked));
    }

    #[test]
    fn test_prefix_first_match_wins() {
        let all = aggregate();
        assert_eq!(select_system(&all, Some("node"), None).unwrap().name(), "node-a");
        assert_eq!(select_system(&all, Some("node-b"), None).unwrap().name(), "node-b");
    }

    #[test]
    fn test_with_sub_segment() {
        let all = aggregate().sub_system("cache").unwrap();
        let picked = select_system(&all, Some("disk"), Some("cache")).unwrap();
        assert_eq!(picked.name(), "disk/cache");
    }

    #[test]
    fn test_no_match_is_error() {
        let all = aggregate();
        let err = select_system(&all, Some("tape"), None).unwrap_err();
        assert!(matches!(err, SystemError::NoMatchingSystem(ref n) if n == "tape"));
    }

    #[test]
    fn test_non_aggregate_propagates_unsupported() {
        let single: SharedSystem = Arc::new(MemorySystem::new("disk"));
        assert!(matches!(
            select_system(&single, Some("disk"), None),
            Err(SystemError::Unsupported { .. })
        ));
    }
}
