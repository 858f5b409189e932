//! Error handling and errno mapping for bridge operations.
//!
//! Every entry point returns a single [`BridgeError`] on failure. Daemon
//! errors travel through verbatim; protocol violations keep their own
//! variant so a misbehaving daemon is never mistaken for an ordinary
//! filesystem condition.

use crate::transport::TransportError;
use kfuse_proto::{EncodeError, ProtocolError};
use std::io;
use thiserror::Error;

/// Errors returned by the path-operation translator.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A request or scratch buffer could not be allocated.
    #[error("out of memory allocating {0} bytes")]
    OutOfMemory(usize),

    /// The name cannot be sent to the daemon.
    #[error("invalid name: {0}")]
    InvalidName(EncodeError),

    /// The daemon replied with this errno.
    #[error("daemon returned errno {0}")]
    Daemon(i32),

    /// The daemon broke the wire protocol.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// The request never got a reply.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// A directory verb was applied to something else.
    #[error("object {0} is not a directory")]
    NotADirectory(u64),

    /// A directory was opened without asking for directory semantics.
    #[error("object {0} is a directory")]
    IsADirectory(u64),

    /// Readlink on an object that is not a symlink.
    #[error("object {0} is not a symlink")]
    NotASymlink(u64),

    /// Reading the listing container failed.
    #[error("reading directory container failed: {0}")]
    ContainerRead(#[source] io::Error),
}

impl BridgeError {
    /// Converts this error to a libc error code.
    pub fn to_errno(&self) -> i32 {
        match self {
            BridgeError::OutOfMemory(_) => libc::ENOMEM,
            BridgeError::InvalidName(e) => e.to_errno(),
            BridgeError::Daemon(errno) => *errno,
            BridgeError::Protocol(e) => e.to_errno(),
            BridgeError::Transport(e) => e.to_errno(),
            BridgeError::NotADirectory(_) => libc::ENOTDIR,
            BridgeError::IsADirectory(_) => libc::EISDIR,
            BridgeError::NotASymlink(_) => libc::EINVAL,
            BridgeError::ContainerRead(e) => e.to_errno(),
        }
    }

    /// Whether this is the daemon saying the name does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BridgeError::Daemon(libc::ENOENT))
    }

    /// Whether this error indicates a misbehaving daemon.
    pub fn is_protocol(&self) -> bool {
        matches!(self, BridgeError::Protocol(_))
    }
}

impl From<EncodeError> for BridgeError {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::OutOfMemory(size) => BridgeError::OutOfMemory(size),
            other => BridgeError::InvalidName(other),
        }
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Extension trait to convert errors to errno.
pub trait ToErrno {
    /// Converts this error to a libc error code.
    fn to_errno(&self) -> i32;
}

impl ToErrno for EncodeError {
    fn to_errno(&self) -> i32 {
        match self {
            EncodeError::OutOfMemory(_) => libc::ENOMEM,
            EncodeError::NameTooLong { .. } => libc::ENAMETOOLONG,
            EncodeError::EmptyName
            | EncodeError::EmbeddedNul(_)
            | EncodeError::WrongOpcode(_)
            | EncodeError::BodyTooLarge(_) => libc::EINVAL,
        }
    }
}

impl ToErrno for ProtocolError {
    fn to_errno(&self) -> i32 {
        libc::EPROTO
    }
}

impl ToErrno for io::Error {
    fn to_errno(&self) -> i32 {
        self.raw_os_error().unwrap_or(libc::EIO)
    }
}

impl ToErrno for BridgeError {
    fn to_errno(&self) -> i32 {
        BridgeError::to_errno(self)
    }
}
