//! # kura-system
//!
//! Storage systems behind one async trait, and an aggregate that races
//! them.
//!
//! A system reads and writes opaque byte payloads by path. Backends cover
//! an in-memory store, the local filesystem, an IPFS node and an IPFS
//! node's mutable file system. [`MultiSystem`] groups any number of them
//! under one name:
//!
//! - reads go to every member and resolve with the first success
//! - writes go to every member and resolve with the first identifier,
//!   while the other writes keep running
//! - both are bounded by a per-call deadline (10 s by default)
//!
//! ```no_run
//! # async fn demo() -> kura_system::SystemResult<()> {
//! use std::sync::Arc;
//! use kura_system::{ReadOptions, System, WriteOptions, create_multi_system};
//!
//! let all = create_multi_system(
//!     "all",
//!     [("disk", "file:///var/lib/kura"), ("node", "mfs://localhost/kura")],
//! )?;
//! let id = all
//!     .write_file(Arc::from(&b"hello"[..]), Some("greeting.txt"), &WriteOptions::default())
//!     .await?;
//! let bytes = all.read_file(&id, &ReadOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
mod content;
mod dispatch;
mod env;
mod error;
pub mod ipfs_client;
mod multi;
mod ops;
mod options;
mod path;
mod race;
mod select;

pub use backends::{ByteStore, ExitHook, IpfsSystem, LocalSystem, MemorySystem, MfsSystem};
pub use content::content_id;
pub use dispatch::{SystemScheme, create_multi_system, create_system, create_system_from_url};
pub use env::Environment;
pub use error::{Operation, SystemError, SystemResult};
pub use ipfs_client::{DEFAULT_IPFS_PORT, IpfsClient};
pub use multi::{DEFAULT_TIMEOUT, MultiSystem};
pub use ops::{SharedBytes, SharedSystem, System, SystemPredicate};
pub use options::{Encoding, ReadFlag, ReadOptions, WriteFlag, WriteOptions};
pub use path::{join_to_base, portable_cwd, url_to_file_system_base};
pub use select::select_system;
