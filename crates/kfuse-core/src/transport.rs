//! The transport contract and listing containers.
//!
//! A [`Transport`] carries one request to the daemon and blocks the calling
//! thread until the correlated reply arrives. Correlation, queuing and
//! timeouts are its business; the translator never retries.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use kfuse_proto::{FileKind, Reply, ReplyShape, Request};
use thiserror::Error;

/// Failure to obtain a reply.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The daemon went away.
    #[error("channel closed")]
    Closed,

    /// No reply within the transport's deadline.
    #[error("no reply after {0:?}")]
    Timeout(Duration),

    /// Lower-level I/O failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    pub fn to_errno(&self) -> i32 {
        match self {
            TransportError::Closed => libc::ENOTCONN,
            TransportError::Timeout(_) => libc::ETIMEDOUT,
            TransportError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

/// Synchronous request/reply channel to the daemon.
pub trait Transport: Send + Sync {
    /// Sends `request` and waits for its reply.
    ///
    /// `shape` is the reply body the caller declared. Implementations may
    /// use its capacity to size their receive buffer; validation happens in
    /// the caller.
    fn send(&self, request: &Request, shape: ReplyShape) -> Result<Reply, TransportError>;

    /// Takes ownership of the container named by a GETDIR token.
    ///
    /// Returns `None` if the token names nothing. Each token can be claimed
    /// once.
    fn claim_container(&self, token: u64) -> Option<Box<dyn ContainerFile>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &Request, shape: ReplyShape) -> Result<Reply, TransportError> {
        (**self).send(request, shape)
    }

    fn claim_container(&self, token: u64) -> Option<Box<dyn ContainerFile>> {
        (**self).claim_container(token)
    }
}

/// A file-shaped object the daemon exposes a listing through.
pub trait ContainerFile: Send + Sync + fmt::Debug {
    /// Object type of the container, if it can be determined.
    fn kind(&self) -> Option<FileKind>;

    /// Reads up to `buf.len()` bytes at `offset`. Returns 0 at end.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

#[cfg(unix)]
impl ContainerFile for std::fs::File {
    fn kind(&self) -> Option<FileKind> {
        let file_type = self.metadata().ok()?.file_type();
        if file_type.is_file() {
            Some(FileKind::RegularFile)
        } else if file_type.is_dir() {
            Some(FileKind::Directory)
        } else if file_type.is_symlink() {
            Some(FileKind::Symlink)
        } else {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_char_device() {
                Some(FileKind::CharDevice)
            } else if file_type.is_block_device() {
                Some(FileKind::BlockDevice)
            } else if file_type.is_fifo() {
                Some(FileKind::NamedPipe)
            } else if file_type.is_socket() {
                Some(FileKind::Socket)
            } else {
                None
            }
        }
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }
}

/// Container held in memory.
#[derive(Debug, Clone)]
pub struct MemoryContainer {
    kind: Option<FileKind>,
    data: Bytes,
}

impl MemoryContainer {
    /// A regular-file container holding `data`.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_kind(Some(FileKind::RegularFile), data)
    }

    /// A container that claims to be of `kind`.
    pub fn with_kind(kind: Option<FileKind>, data: impl Into<Bytes>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ContainerFile for MemoryContainer {
    fn kind(&self) -> Option<FileKind> {
        self.kind
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}
