//! Request and cache counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the translator. All updates are `Relaxed`.
#[derive(Debug, Default)]
pub struct BridgeStats {
    pub requests_sent: AtomicU64,
    pub daemon_errors: AtomicU64,
    pub protocol_violations: AtomicU64,
    pub negative_bindings: AtomicU64,
    pub dirs_opened: AtomicU64,
    pub dirs_released: AtomicU64,
}

/// Point-in-time copy of [`BridgeStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests_sent: u64,
    pub daemon_errors: u64,
    pub protocol_violations: u64,
    pub negative_bindings: u64,
    pub dirs_opened: u64,
    pub dirs_released: u64,
}

impl StatsSnapshot {
    /// Directory handles opened and not yet released.
    pub fn open_dirs(&self) -> u64 {
        self.dirs_opened.saturating_sub(self.dirs_released)
    }
}

impl BridgeStats {
    /// Zeroed counters, shared between the translator and its handles.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A request was handed to the transport.
    pub fn record_request(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// The daemon answered with a negative status.
    pub fn record_daemon_error(&self) {
        self.daemon_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A reply, container or listing broke the wire format.
    pub fn record_protocol_violation(&self) {
        self.protocol_violations.fetch_add(1, Ordering::Relaxed);
    }

    /// A miss was remembered as a negative binding.
    pub fn record_negative_binding(&self) {
        self.negative_bindings.fetch_add(1, Ordering::Relaxed);
    }

    /// A directory handle was opened.
    pub fn record_dir_open(&self) {
        self.dirs_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// A directory handle was released.
    pub fn record_dir_release(&self) {
        self.dirs_released.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            daemon_errors: self.daemon_errors.load(Ordering::Relaxed),
            protocol_violations: self.protocol_violations.load(Ordering::Relaxed),
            negative_bindings: self.negative_bindings.load(Ordering::Relaxed),
            dirs_opened: self.dirs_opened.load(Ordering::Relaxed),
            dirs_released: self.dirs_released.load(Ordering::Relaxed),
        }
    }
}
