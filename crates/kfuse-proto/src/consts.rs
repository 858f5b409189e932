//! Protocol-wide limits and fixed sizes.

/// Object id of the root directory.
pub const ROOT_ID: u64 = 1;

/// Longest name a single path component may carry.
pub const NAME_MAX: usize = 255;

/// Longest symlink target accepted when encoding a request.
pub const PATH_MAX: usize = 4096;

/// Page size assumed when sizing variable replies.
///
/// A readlink reply is read into one page minus one byte so the caller can
/// always NUL-terminate it in place.
pub const PAGE_SIZE: usize = 4096;

/// Size of the fixed request header: opcode, subject id, body size.
pub const REQUEST_HEADER_SIZE: usize = 16;

/// Size of the fixed reply header: status, body size.
pub const REPLY_HEADER_SIZE: usize = 8;

/// Size of a directory record header before the name bytes.
pub const DIRENT_HEADER_SIZE: usize = 24;

/// Directory records are padded to this boundary.
pub const DIRENT_ALIGN: usize = 8;

/// Bytes fetched from a directory container per read.
pub const DEFAULT_DIR_READ_CHUNK: usize = 2048;
