//! Testing utilities for the bridge.
//!
//! - **MemoryDaemon**: an in-memory daemon behind the [`Transport`] trait
//! - **Generators**: listing streams and edge-case names
//! - **Assertions**: errno and binding checks with helpful messages
//!
//! # Usage
//!
//! ```
//! use kfuse_core::testing::{MemoryDaemon, assert_negative};
//! use kfuse_core::{Bridge, BridgeConfig};
//!
//! let bridge = Bridge::new(MemoryDaemon::new(), BridgeConfig::default());
//! let root = bridge.root().unwrap();
//! assert_negative(&bridge.lookup(&root, b"absent").unwrap(), "empty root");
//! ```
//!
//! [`Transport`]: crate::transport::Transport

pub mod assertions;
pub mod generators;
pub mod memory_daemon;

pub use assertions::{assert_errno, assert_negative, assert_ok, assert_positive, errno_name};
pub use generators::{awkward_names, max_name, overlong_name, render_listing};
pub use memory_daemon::MemoryDaemon;
