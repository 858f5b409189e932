//! Shared setup for bridge integration tests.

// Not all tests use every helper
#![allow(dead_code)]

use std::sync::Arc;

use kfuse_core::testing::MemoryDaemon;
use kfuse_core::{Bridge, BridgeConfig, FsObject, SinkControl};

/// A bridge wired to an in-memory daemon, with the root loaded.
pub struct TestBridge {
    pub bridge: Bridge<Arc<MemoryDaemon>>,
    pub daemon: Arc<MemoryDaemon>,
    pub root: Arc<FsObject>,
}

impl TestBridge {
    pub fn new() -> Self {
        Self::with(MemoryDaemon::new(), BridgeConfig::default())
    }

    pub fn with(daemon: MemoryDaemon, config: BridgeConfig) -> Self {
        init_tracing();
        let daemon = Arc::new(daemon);
        let bridge = Bridge::new(Arc::clone(&daemon), config);
        let root = bridge.root().expect("root loads");
        Self {
            bridge,
            daemon,
            root,
        }
    }

    /// Requests the daemon has seen so far.
    pub fn requests(&self) -> u64 {
        self.daemon.request_count()
    }

    /// Every entry of `dir` as `(name, child_id, type)`.
    pub fn list(&self, dir: &FsObject) -> Vec<(Vec<u8>, u64, u32)> {
        let mut handle = self
            .bridge
            .open_dir(dir, libc::O_RDONLY | libc::O_DIRECTORY)
            .expect("opendir");
        let mut entries = Vec::new();
        handle
            .read_to_end(&mut |name: &[u8], _: u64, id: u64, kind: u32| {
                entries.push((name.to_vec(), id, kind));
                SinkControl::Continue
            })
            .expect("readdir");
        self.bridge.release_dir(handle);
        entries
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
