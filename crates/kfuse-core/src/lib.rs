//! Kernel half of the kfuse filesystem bridge.
//!
//! This crate turns filesystem verbs into requests for a userspace daemon
//! and applies the daemon's replies to a cache of filesystem objects and
//! name bindings.
//!
//! # Features
//!
//! - One synchronous request per operation, with the reply body size
//!   declared up front and checked on arrival
//! - Permanent per-object operation sets: regular file, directory,
//!   symlink, special
//! - Negative bindings for names the daemon reports absent
//! - Directory listings read in chunks from a daemon-provided container
//!   and parsed without keeping any state outside the stream position
//!
//! # Usage
//!
//! ```
//! use kfuse_core::testing::MemoryDaemon;
//! use kfuse_core::{Binding, Bridge, BridgeConfig};
//!
//! let bridge = Bridge::new(MemoryDaemon::new(), BridgeConfig::default());
//! let root = bridge.root().unwrap();
//!
//! let file = bridge.create(&root, b"notes.txt", 0o644).unwrap();
//! let Binding::Positive(found) = bridge.lookup(&root, b"notes.txt").unwrap() else {
//!     panic!("just created");
//! };
//! assert_eq!(found.id(), file.id());
//! ```

pub mod attr;
pub mod bridge;
pub mod config;
pub mod dirstream;
pub mod error;
pub mod handles;
pub mod host;
pub mod inode;
pub mod object;
pub mod ops;
pub mod policy;
pub mod stats;
pub mod testing;
pub mod transport;

pub use attr::{apply_attributes, initialize_object};
pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use dirstream::{DirSink, FillOutcome, SinkControl, fill_dir};
pub use error::{BridgeError, BridgeResult, ToErrno};
pub use handles::DirHandle;
pub use host::{Binding, Host};
pub use inode::ObjectCache;
pub use object::{FsObject, ObjectAttrs};
pub use ops::{Capabilities, ObjectClass, OperationSet};
pub use policy::CachePolicy;
pub use stats::{BridgeStats, StatsSnapshot};
pub use transport::{ContainerFile, MemoryContainer, Transport, TransportError};
