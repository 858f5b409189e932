//! Wire protocol for the kfuse filesystem bridge.
//!
//! The kernel half of the bridge turns every filesystem verb into a request
//! frame for the userspace daemon and validates the reply that comes back.
//! This crate owns the bit-level layout of those frames and nothing else:
//! it never talks to a transport and never touches cached objects.
//!
//! # Frames
//!
//! All integers are little-endian.
//!
//! | Frame | Layout |
//! |-------|--------|
//! | request | `opcode u32 \| subject u64 \| body_size u32 \| body` |
//! | reply | `status i32 \| body_size u32 \| body` |
//! | directory record | `child_id u64 \| name_len u32 \| type u32 \| record_len u32 \| reserved u32 \| name` padded to 8 |
//!
//! Names inside request bodies are NUL-terminated even where a size field
//! already bounds them. Directory record names are not; `name_len` is
//! authoritative there.
//!
//! # Example
//!
//! ```
//! use kfuse_proto::{Opcode, Request, RequestBody};
//!
//! let request = Request::lookup(1, b"notes.txt").unwrap();
//! let frame = request.encode_frame().unwrap();
//!
//! let decoded = Request::decode_frame(&frame).unwrap();
//! assert_eq!(decoded.opcode(), Opcode::Lookup);
//! assert_eq!(decoded.decode_body().unwrap(), RequestBody::Name(b"notes.txt"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attr;
pub mod consts;
pub mod dirent;
mod error;
mod name;
mod opcode;
pub mod reply;
pub mod request;

pub use attr::{FileKind, WireAttr};
pub use consts::{
    DEFAULT_DIR_READ_CHUNK, DIRENT_ALIGN, DIRENT_HEADER_SIZE, NAME_MAX, PAGE_SIZE, PATH_MAX,
    REPLY_HEADER_SIZE, REQUEST_HEADER_SIZE, ROOT_ID,
};
pub use dirent::{DirEntry, DirStream, MAX_RECORD_NAME, encode_record, record_size};
pub use error::{EncodeError, ProtocolError};
pub use name::{validate_name, validate_target};
pub use opcode::Opcode;
pub use reply::{AttrOut, EntryOut, GetdirOut, Outcome, Reply, ReplyShape, WireStruct};
pub use request::{Request, RequestBody};
