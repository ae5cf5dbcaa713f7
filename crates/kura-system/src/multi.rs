//! Aggregate system that races operations across its members.
//!
//! Reads go to every member at once and resolve with the first success.
//! Writes fan out to every member and resolve with the first identifier
//! returned; the remaining writes keep running in the background. Both
//! are bounded by one deadline per call.
//!
//! Members are treated as redundant mirrors: a write that resolves means
//! at least one copy landed, not that all of them did.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, trace, warn};

use crate::error::{Operation, SystemError, SystemResult};
use crate::ops::{SharedBytes, SharedSystem, System, SystemPredicate};
use crate::options::{ReadOptions, WriteOptions};
use crate::race::Settle;

/// Deadline applied when a call does not carry `timeout_millis`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// An ordered, immutable set of member systems under one logical name.
#[derive(Debug, Clone)]
pub struct MultiSystem {
    name: String,
    systems: Arc<[SharedSystem]>,
    default_timeout: Duration,
}

impl MultiSystem {
    pub fn new(name: impl Into<String>, systems: Vec<SharedSystem>) -> Self {
        Self {
            name: name.into(),
            systems: systems.into(),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the deadline used when a call names none.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn systems(&self) -> &[SharedSystem] {
        &self.systems
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn system_names(&self) -> Vec<String> {
        self.systems.iter().map(|s| s.name().to_string()).collect()
    }

    /// Send `exit(code)` to every member, in member order, without racing.
    ///
    /// Returns each member's result at the member's index.
    pub fn broadcast_exit(&self, code: i32) -> Vec<SystemResult<()>> {
        self.systems.iter().map(|system| system.exit(code)).collect()
    }

    async fn race_read(&self, path: &str, options: &ReadOptions) -> SystemResult<Vec<u8>> {
        if self.systems.is_empty() {
            return Err(SystemError::no_systems(Operation::Read));
        }

        let timeout = options.timeout_or(self.default_timeout);
        let (settle, settled) = Settle::new();

        // Losing reads are abandoned once the call returns, whichever way.
        let cancel = CancellationToken::new();
        let _cancel_losers = cancel.clone().drop_guard();

        for system in self.systems.iter() {
            let system = Arc::clone(system);
            let settle = settle.clone();
            let cancel = cancel.clone();
            let path = path.to_string();
            let options = options.clone();
            let span = tracing::debug_span!("multi.member", member = %system.name());

            tokio::spawn(
                async move {
                    let outcome = tokio::select! {
                        _ = cancel.cancelled() => {
                            trace!(path = %path, "member read abandoned");
                            return;
                        }
                        outcome = system.read_file(&path, &options) => outcome,
                    };
                    match outcome {
                        Ok(bytes) => {
                            if !settle.settle(bytes) {
                                trace!(path = %path, "late member read ignored");
                            }
                        }
                        Err(e) => {
                            debug!(path = %path, error = %e, "ignored member read error");
                        }
                    }
                }
                .instrument(span),
            );
        }
        drop(settle);

        match settled.wait(timeout).await {
            Some(bytes) => Ok(bytes),
            None => {
                let systems = self.system_names();
                warn!(
                    path = %path,
                    timeout_ms = timeout.as_millis() as u64,
                    systems = ?systems,
                    "read timed out"
                );
                Err(SystemError::timeout(Operation::Read, Some(path), timeout, systems))
            }
        }
    }

    async fn fan_out_write(
        &self,
        bytes: SharedBytes,
        path: Option<&str>,
        options: &WriteOptions,
    ) -> SystemResult<String> {
        if self.systems.is_empty() {
            return Err(SystemError::no_systems(Operation::Write));
        }

        let timeout = options.timeout_or(self.default_timeout);
        let (settle, settled) = Settle::new();

        for system in self.systems.iter() {
            let system = Arc::clone(system);
            let settle = settle.clone();
            let bytes = Arc::clone(&bytes);
            let path = path.map(str::to_string);
            let options = options.clone();
            let span = tracing::debug_span!("multi.member", member = %system.name());

            // Never cancelled: every mirror gets the chance to land its copy.
            tokio::spawn(
                async move {
                    match system.write_file(bytes, path.as_deref(), &options).await {
                        Ok(id) => {
                            if !settle.settle(id) {
                                trace!(path = ?path, "late member write ignored");
                            }
                        }
                        Err(e) => {
                            debug!(path = ?path, error = %e, "ignored member write error");
                        }
                    }
                }
                .instrument(span),
            );
        }
        drop(settle);

        match settled.wait(timeout).await {
            Some(id) => Ok(id),
            None => {
                let systems = self.system_names();
                warn!(
                    path = ?path,
                    timeout_ms = timeout.as_millis() as u64,
                    systems = ?systems,
                    "write timed out"
                );
                Err(SystemError::timeout(Operation::Write, path, timeout, systems))
            }
        }
    }
}

/// Comma-joined values of the members that have one.
fn join_present(values: impl Iterator<Item = Option<String>>) -> Option<String> {
    let present: Vec<String> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.join(","))
    }
}

#[async_trait]
impl System for MultiSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn env(&self, _key: &str, _value: Option<&str>) -> SystemResult<Option<String>> {
        Err(SystemError::unsupported(&self.name, "env"))
    }

    fn select_systems(&self, predicate: SystemPredicate<'_>) -> SystemResult<Vec<SharedSystem>> {
        let selected: Vec<SharedSystem> = self
            .systems
            .iter()
            .filter(|&system| predicate(&**system))
            .cloned()
            .collect();
        trace!(
            system = %self.name,
            members = self.systems.len(),
            selected = selected.len(),
            "select_systems"
        );
        Ok(selected)
    }

    fn sub_system(&self, segment: &str) -> SystemResult<SharedSystem> {
        let systems = self
            .systems
            .iter()
            .map(|system| system.sub_system(segment))
            .collect::<SystemResult<Vec<_>>>()?;
        let sub = MultiSystem::new(format!("{}/{}", self.name, segment), systems)
            .with_default_timeout(self.default_timeout);
        Ok(Arc::new(sub))
    }

    fn exit(&self, code: i32) -> SystemResult<()> {
        for (system, result) in self.systems.iter().zip(self.broadcast_exit(code)) {
            if let Err(e) = result {
                debug!(member = %system.name(), code, error = %e, "member exit failed");
            }
        }
        Ok(())
    }

    fn cwd(&self) -> Option<String> {
        join_present(self.systems.iter().map(|s| s.cwd()))
    }

    fn homedir(&self) -> Option<String> {
        join_present(self.systems.iter().map(|s| s.homedir()))
    }

    async fn read_file(&self, path: &str, options: &ReadOptions) -> SystemResult<Vec<u8>> {
        let span = tracing::info_span!("multi.read", system = %self.name, path = %path);
        self.race_read(path, options).instrument(span).await
    }

    async fn write_file(
        &self,
        bytes: SharedBytes,
        path: Option<&str>,
        options: &WriteOptions,
    ) -> SystemResult<String> {
        let span = tracing::info_span!("multi.write", system = %self.name, path = ?path);
        self.fan_out_write(bytes, path, options).instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemorySystem;

    fn memory(name: &str) -> SharedSystem {
        Arc::new(MemorySystem::new(name))
    }

    #[tokio::test]
    async fn test_read_from_member_that_has_it() {
        let a = MemorySystem::new("a");
        let b = MemorySystem::new("b");
        b.write_file(Arc::from(&b"only in b"[..]), Some("x.txt"), &WriteOptions::default())
            .await
            .unwrap();

        let multi = MultiSystem::new("all", vec![Arc::new(a), Arc::new(b)]);
        let opts = ReadOptions::default().with_timeout_millis(1_000);
        let data = multi.read_file("x.txt", &opts).await.unwrap();
        assert_eq!(data, b"only in b");
    }

    #[tokio::test]
    async fn test_write_lands_in_every_member() {
        let a = MemorySystem::new("a");
        let b = MemorySystem::new("b");
        let multi = MultiSystem::new("all", vec![Arc::new(a.clone()), Arc::new(b.clone())]);

        let id = multi
            .write_file(Arc::from(&b"mirror"[..]), Some("m.txt"), &WriteOptions::default())
            .await
            .unwrap();
        assert_eq!(id, "m.txt");

        // The losing write runs on; give it a moment.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(a.snapshot().get("m.txt").map(Vec::as_slice), Some(&b"mirror"[..]));
        assert_eq!(b.snapshot().get("m.txt").map(Vec::as_slice), Some(&b"mirror"[..]));
    }

    #[tokio::test]
    async fn test_empty_rejects_immediately() {
        let multi = MultiSystem::new("none", vec![]);
        assert!(multi.is_empty());
        let err = multi.read_file("/x", &ReadOptions::default()).await.unwrap_err();
        assert!(matches!(err, SystemError::NoSystems { operation: Operation::Read }));

        let err = multi
            .write_file(Arc::from(&b""[..]), None, &WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SystemError::NoSystems { operation: Operation::Write }));
    }

    #[test]
    fn test_sub_system_names_and_order() {
        let multi = MultiSystem::new("all", vec![memory("a"), memory("b"), memory("c")])
            .with_default_timeout(Duration::from_millis(42));
        let sub = multi.sub_system("x").unwrap();
        assert_eq!(sub.name(), "all/x");

        let names: Vec<String> = sub
            .select_systems(&|_| true)
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["a/x", "b/x", "c/x"]);
    }

    #[test]
    fn test_select_filters_in_order() {
        let multi = MultiSystem::new("all", vec![memory("disk"), memory("node"), memory("disk2")]);
        let picked = multi
            .select_systems(&|s| s.name().starts_with("disk"))
            .unwrap();
        let names: Vec<&str> = picked.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["disk", "disk2"]);
        assert_eq!(multi.len(), 3);
    }

    #[test]
    fn test_env_unsupported() {
        let multi = MultiSystem::new("all", vec![memory("a")]);
        assert!(matches!(
            multi.env("KEY", None),
            Err(SystemError::Unsupported { operation: "env", .. })
        ));
    }

    #[test]
    fn test_cwd_joins_members() {
        let multi = MultiSystem::new("all", vec![memory("a"), memory("b")]);
        assert_eq!(multi.homedir().as_deref(), Some("/,/"));
        assert_eq!(MultiSystem::new("none", vec![]).cwd(), None);
    }

    #[test]
    fn test_broadcast_exit_reports_each_member() {
        let multi = MultiSystem::new("all", vec![memory("a"), memory("b")]);
        let results = multi.broadcast_exit(3);
        assert_eq!(results.len(), 2);
        // Memory systems cannot exit; the aggregate still succeeds.
        assert!(results.iter().all(Result::is_err));
        assert!(multi.exit(3).is_ok());
    }
}
