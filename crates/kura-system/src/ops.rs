//! The storage system contract.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SystemResult;
use crate::options::{ReadOptions, WriteOptions};

/// A system handle shared between callers and aggregates.
pub type SharedSystem = Arc<dyn System>;

/// Payload handed to writes. Shared read-only across concurrent member writes.
pub type SharedBytes = Arc<[u8]>;

/// Predicate used by [`System::select_systems`].
pub type SystemPredicate<'a> = &'a dyn Fn(&dyn System) -> bool;

/// Core storage operations.
///
/// Every backend (memory, local disk, IPFS, MFS) and the [`MultiSystem`]
/// aggregate implement this, so callers never care which one they hold.
///
/// Paths are relative to the system's base location.
///
/// [`MultiSystem`]: crate::MultiSystem
#[async_trait]
pub trait System: Send + Sync + fmt::Debug {
    /// Logical name, `/`-joined with each sub-system segment.
    fn name(&self) -> &str;

    /// Get an environment value when `value` is `None`, otherwise set it.
    fn env(&self, key: &str, value: Option<&str>) -> SystemResult<Option<String>>;

    /// Members of an aggregate for which `predicate` holds, in member order.
    ///
    /// Non-aggregating systems return [`SystemError::Unsupported`].
    ///
    /// [`SystemError::Unsupported`]: crate::SystemError::Unsupported
    fn select_systems(&self, predicate: SystemPredicate<'_>) -> SystemResult<Vec<SharedSystem>>;

    /// A new system scoped one segment deeper, sharing the underlying storage.
    fn sub_system(&self, segment: &str) -> SystemResult<SharedSystem>;

    /// Advisory exit signal.
    fn exit(&self, code: i32) -> SystemResult<()>;

    fn cwd(&self) -> Option<String>;

    fn homedir(&self) -> Option<String>;

    /// Read the payload stored at `path`.
    async fn read_file(&self, path: &str, options: &ReadOptions) -> SystemResult<Vec<u8>>;

    /// Store `bytes`, returning the identifier to read them back with.
    ///
    /// With no `path` the backend assigns one (a content id).
    async fn write_file(
        &self,
        bytes: SharedBytes,
        path: Option<&str>,
        options: &WriteOptions,
    ) -> SystemResult<String>;
}
