//! Bridge configuration.

use kfuse_proto::{DEFAULT_DIR_READ_CHUNK, NAME_MAX, PAGE_SIZE, ROOT_ID, record_size};

/// Smallest directory read chunk: one maximal record must always fit.
pub const MIN_DIR_READ_CHUNK: usize = record_size(NAME_MAX);

/// Configuration options for the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Host page size. Symlink targets are read into one page, so the
    /// negotiated readlink capacity is `page_size - 1`.
    ///
    /// Default: 4096.
    pub page_size: usize,

    /// Bytes fetched from a listing container per directory read.
    ///
    /// Default: 2048. [`DirHandle`](crate::DirHandle) raises anything below
    /// [`MIN_DIR_READ_CHUNK`].
    pub dir_read_chunk: usize,

    /// Object id of the mount root. Default: 1.
    pub root_id: u64,

    /// Never trust a cached binding on the last segment of a path.
    ///
    /// Off by default. When on, every final segment is looked up again,
    /// as the historic dentry revalidation did.
    pub relookup_final_segment: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            dir_read_chunk: DEFAULT_DIR_READ_CHUNK,
            root_id: ROOT_ID,
            relookup_final_segment: false,
        }
    }
}

impl BridgeConfig {
    /// Largest symlink target the daemon may return.
    pub fn readlink_capacity(&self) -> usize {
        self.page_size.saturating_sub(1)
    }

    /// Sets the page size.
    #[must_use]
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the directory read chunk, clamped to [`MIN_DIR_READ_CHUNK`].
    #[must_use]
    pub fn dir_read_chunk(mut self, chunk: usize) -> Self {
        self.dir_read_chunk = chunk.max(MIN_DIR_READ_CHUNK);
        self
    }

    /// Sets the root object id.
    #[must_use]
    pub fn root_id(mut self, id: u64) -> Self {
        self.root_id = id;
        self
    }

    /// Enables or disables re-lookup of final path segments.
    #[must_use]
    pub fn relookup_final_segment(mut self, enabled: bool) -> Self {
        self.relookup_final_segment = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.readlink_capacity(), 4095);
        assert_eq!(config.dir_read_chunk, 2048);
        assert_eq!(config.root_id, 1);
        assert!(!config.relookup_final_segment);
    }

    #[test]
    fn test_builder_pattern() {
        let config = BridgeConfig::default()
            .page_size(8192)
            .dir_read_chunk(4096)
            .root_id(7)
            .relookup_final_segment(true);
        assert_eq!(config.readlink_capacity(), 8191);
        assert_eq!(config.dir_read_chunk, 4096);
        assert_eq!(config.root_id, 7);
        assert!(config.relookup_final_segment);
    }

    #[test]
    fn test_chunk_clamped_to_one_record() {
        let config = BridgeConfig::default().dir_read_chunk(16);
        assert_eq!(config.dir_read_chunk, MIN_DIR_READ_CHUNK);
        assert_eq!(MIN_DIR_READ_CHUNK, 280);
    }

    #[test]
    fn test_zero_page_size_does_not_underflow() {
        assert_eq!(BridgeConfig::default().page_size(0).readlink_capacity(), 0);
    }
}
