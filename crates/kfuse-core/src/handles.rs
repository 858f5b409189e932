//! Open directory handles.
//!
//! A [`DirHandle`] owns the listing container the daemon returned for
//! GETDIR. There is no way to build one without a container and releasing
//! it consumes it, so a handle can neither read nor release without having
//! been opened.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::config::MIN_DIR_READ_CHUNK;
use crate::dirstream::{DirSink, FillOutcome, fill_dir};
use crate::error::{BridgeError, BridgeResult};
use crate::stats::BridgeStats;
use crate::transport::ContainerFile;

/// An open directory: its container and the logical stream position.
#[derive(Debug)]
pub struct DirHandle {
    object_id: u64,
    container: Box<dyn ContainerFile>,
    position: u64,
    chunk: usize,
    stats: Arc<BridgeStats>,
}

impl DirHandle {
    /// Wraps a container whose listing belongs to `object_id`.
    ///
    /// Each read fetches at most `chunk` bytes, raised to
    /// [`MIN_DIR_READ_CHUNK`] so a chunk always holds a whole record.
    pub fn new(object_id: u64, container: Box<dyn ContainerFile>, chunk: usize) -> Self {
        Self {
            object_id,
            container,
            position: 0,
            chunk: chunk.max(MIN_DIR_READ_CHUNK),
            stats: BridgeStats::new(),
        }
    }

    /// Counts malformed listings in `stats` instead of a private counter.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<BridgeStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Directory this handle lists.
    pub fn object_id(&self) -> u64 {
        self.object_id
    }

    /// Current logical stream position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Moves the stream position, as a host `seekdir` would.
    pub fn seek(&mut self, position: u64) {
        self.position = position;
    }

    /// Reads one chunk at the current position and feeds it to `sink`.
    ///
    /// Returns zero entries at the end of the stream.
    pub fn readdir<S: DirSink + ?Sized>(&mut self, sink: &mut S) -> BridgeResult<FillOutcome> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(self.chunk)
            .map_err(|_| BridgeError::OutOfMemory(self.chunk))?;
        buf.resize(self.chunk, 0);

        let n = self
            .container
            .read_at(&mut buf, self.position)
            .map_err(|e| {
                warn!(object = self.object_id, position = self.position, error = %e, "container read failed");
                BridgeError::ContainerRead(e)
            })?;

        let outcome = fill_dir(&buf[..n], &mut self.position, sink).inspect_err(|_| {
            self.stats.record_protocol_violation();
        })?;
        trace!(
            object = self.object_id,
            read = n,
            emitted = outcome.emitted,
            position = self.position,
            "readdir"
        );
        Ok(outcome)
    }

    /// Reads chunks until the stream ends or the sink stops.
    pub fn read_to_end<S: DirSink + ?Sized>(&mut self, sink: &mut S) -> BridgeResult<usize> {
        let mut total = 0;
        loop {
            let outcome = self.readdir(sink)?;
            total += outcome.emitted;
            if outcome.stopped || outcome.emitted == 0 {
                return Ok(total);
            }
        }
    }

    /// Releases the handle, disposing of its container.
    pub fn release(self) {
        trace!(object = self.object_id, "releasedir");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirstream::SinkControl;
    use crate::transport::MemoryContainer;
    use kfuse_proto::attr::DT_REG;
    use kfuse_proto::{FileKind, encode_record};
    use std::io;

    fn listing(count: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        for i in 0..count {
            encode_record(&mut buf, i as u64 + 2, format!("entry-{i:03}").as_bytes(), DT_REG)
                .unwrap();
        }
        buf
    }

    fn collect(handle: &mut DirHandle) -> Vec<u64> {
        let mut ids = Vec::new();
        handle
            .read_to_end(&mut |_: &[u8], _: u64, id: u64, _: u32| {
                ids.push(id);
                SinkControl::Continue
            })
            .unwrap();
        ids
    }

    #[test]
    fn test_reads_across_chunks() {
        // 40-byte records: a 2048-byte chunk splits one of them
        let data = listing(100);
        let mut handle = DirHandle::new(1, Box::new(MemoryContainer::new(data.clone())), 2048);
        let ids = collect(&mut handle);
        assert_eq!(ids, (2..102).collect::<Vec<_>>());
        assert_eq!(handle.position(), data.len() as u64);
    }

    #[test]
    fn test_empty_container() {
        let mut handle = DirHandle::new(1, Box::new(MemoryContainer::new(Vec::new())), 2048);
        assert_eq!(collect(&mut handle), Vec::<u64>::new());
        assert_eq!(handle.position(), 0);
    }

    #[test]
    fn test_seek_restarts_listing() {
        let mut handle = DirHandle::new(1, Box::new(MemoryContainer::new(listing(3))), 2048);
        collect(&mut handle);
        handle.seek(0);
        assert_eq!(collect(&mut handle), vec![2, 3, 4]);
    }

    #[derive(Debug)]
    struct FailingContainer;

    impl ContainerFile for FailingContainer {
        fn kind(&self) -> Option<FileKind> {
            Some(FileKind::RegularFile)
        }

        fn read_at(&self, _buf: &mut [u8], _offset: u64) -> io::Result<usize> {
            Err(io::Error::from_raw_os_error(libc::EIO))
        }
    }

    #[test]
    fn test_container_read_failure() {
        let mut handle = DirHandle::new(1, Box::new(FailingContainer), 2048);
        let err = handle
            .readdir(&mut |_: &[u8], _: u64, _: u64, _: u32| SinkControl::Continue)
            .unwrap_err();
        assert!(matches!(err, BridgeError::ContainerRead(_)));
        assert_eq!(err.to_errno(), libc::EIO);
        handle.release();
    }

    #[test]
    fn test_corrupt_listing_is_protocol_error() {
        let mut data = listing(2);
        data[16..20].copy_from_slice(&7u32.to_le_bytes());
        let stats = BridgeStats::new();
        let mut handle = DirHandle::new(1, Box::new(MemoryContainer::new(data)), 2048)
            .with_stats(Arc::clone(&stats));
        let err = handle
            .readdir(&mut |_: &[u8], _: u64, _: u64, _: u32| SinkControl::Continue)
            .unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(handle.position(), 0);
        assert_eq!(stats.snapshot().protocol_violations, 1);
    }

    #[test]
    fn test_chunk_below_one_record_is_raised() {
        let mut handle = DirHandle::new(1, Box::new(MemoryContainer::new(listing(3))), 16);
        assert_eq!(collect(&mut handle), vec![2, 3, 4]);

        let mut buf = Vec::new();
        encode_record(&mut buf, 2, &[b'a'; 100], DT_REG).unwrap();
        encode_record(&mut buf, 3, &[b'b'; 255], DT_REG).unwrap();
        let mut handle = DirHandle::new(1, Box::new(MemoryContainer::new(buf)), 64);
        assert_eq!(collect(&mut handle), vec![2, 3]);
    }
}
