//! Errors raised while building or parsing frames.

use crate::attr::FileKind;
use crate::opcode::Opcode;
use thiserror::Error;

/// Failure to build a request before anything reaches the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The request buffer could not be allocated.
    #[error("out of memory allocating a {0}-byte request buffer")]
    OutOfMemory(usize),

    /// Zero-length name.
    #[error("name is empty")]
    EmptyName,

    /// The name cannot be NUL-terminated on the wire.
    #[error("name contains a NUL byte at offset {0}")]
    EmbeddedNul(usize),

    /// Name or target longer than the protocol allows.
    #[error("name is {len} bytes, limit is {max}")]
    NameTooLong {
        /// Actual length.
        len: usize,
        /// Allowed length.
        max: usize,
    },

    /// The body layout was requested for an opcode that does not use it.
    #[error("opcode {0} does not use this body layout")]
    WrongOpcode(Opcode),

    /// Body too large for the 32-bit size field.
    #[error("body of {0} bytes does not fit the size field")]
    BodyTooLarge(usize),
}

/// A frame or record that does not follow the wire format.
///
/// These indicate a misbehaving peer, never an ordinary filesystem
/// condition, and are kept distinct from daemon-reported errno values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Fewer bytes than a fixed-size field or header needs.
    #[error("{what} needs {needed} bytes, only {available} available")]
    Truncated {
        /// What was being decoded.
        what: &'static str,
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// The header's body size disagrees with the bytes that follow it.
    #[error("body size field says {declared} bytes but {available} follow")]
    BodySizeMismatch {
        /// Size from the header.
        declared: usize,
        /// Bytes actually present.
        available: usize,
    },

    /// Opcode value this core does not speak.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u32),

    /// Opcode name that matches no known opcode.
    #[error("unknown opcode name {0:?}")]
    UnknownOpcodeName(String),

    /// A string field ran to the end of the body without a terminator.
    #[error("field `{0}` is not NUL-terminated")]
    MissingNul(&'static str),

    /// Bytes left over after the last field of a body.
    #[error("{0} unexpected bytes after the request body")]
    TrailingBytes(usize),

    /// A fixed-size reply body has the wrong length.
    #[error("reply body is {actual} bytes, expected exactly {expected}")]
    ReplySizeMismatch {
        /// Declared size.
        expected: usize,
        /// Received size.
        actual: usize,
    },

    /// A variable-size reply body exceeds the negotiated maximum.
    #[error("reply body is {actual} bytes, negotiated maximum is {max}")]
    ReplyOverflow {
        /// Negotiated maximum.
        max: usize,
        /// Received size.
        actual: usize,
    },

    /// Status must be zero or a negated errno.
    #[error("reply status {0} is positive")]
    PositiveStatus(i32),

    /// Directory record name longer than `NAME_MAX`.
    #[error("directory entry name is {len} bytes, limit is {max}")]
    DirentNameTooLong {
        /// Declared name length.
        len: usize,
        /// Allowed length.
        max: usize,
    },

    /// Directory record length cannot hold its own header and name.
    #[error("directory record length {record_len} is outside {min}..={max}")]
    DirentBadLength {
        /// Declared record length.
        record_len: usize,
        /// Header plus name.
        min: usize,
        /// Largest legal record.
        max: usize,
    },

    /// Directory record length is not padded to the record boundary.
    #[error("directory record length {0} is not 8-byte aligned")]
    DirentMisaligned(usize),

    /// Open-directory succeeded but no container came with it.
    #[error("open-directory reply carried no container")]
    MissingContainer,

    /// Open-directory container is not a regular file.
    #[error("open-directory container is {0:?}, not a regular file")]
    ContainerNotRegular(Option<FileKind>),
}
