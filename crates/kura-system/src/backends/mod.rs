//! Storage backends.
//!
//! Each backend implements [`System`](crate::System) for one URL scheme.

mod ipfs;
mod local;
mod memory;
mod mfs;

pub use ipfs::IpfsSystem;
pub use local::{ExitHook, LocalSystem};
pub use memory::{ByteStore, MemorySystem};
pub use mfs::MfsSystem;
