//! Reply frames and the fixed-size reply bodies.
//!
//! The kernel side never allocates for a reply: before dispatching it
//! declares a [`ReplyShape`], and [`Reply::into_outcome`] checks that the
//! daemon kept to it. A body is only looked at when the status is zero.

use bytes::{Buf, BufMut, Bytes};

use crate::attr::WireAttr;
use crate::consts::REPLY_HEADER_SIZE;
use crate::error::{EncodeError, ProtocolError};

/// A fixed-size little-endian structure.
pub trait WireStruct: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Writes exactly `SIZE` bytes.
    fn put<B: BufMut>(&self, buf: &mut B);

    /// Reads exactly `SIZE` bytes. The caller guarantees they are present.
    fn get<B: Buf>(buf: &mut B) -> Self;

    /// Encodes into a fresh buffer.
    fn encode(&self) -> Bytes {
        let mut buf = Vec::with_capacity(Self::SIZE);
        self.put(&mut buf);
        Bytes::from(buf)
    }

    /// Decodes a body that must be exactly `SIZE` bytes long.
    fn decode(mut bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != Self::SIZE {
            return Err(ProtocolError::ReplySizeMismatch {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self::get(&mut bytes))
    }
}

/// Reply to LOOKUP and MKNOD: the object id plus its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOut {
    /// Object id assigned by the daemon.
    pub id: u64,
    /// Fresh attributes.
    pub attr: WireAttr,
}

impl WireStruct for EntryOut {
    const SIZE: usize = 8 + WireAttr::SIZE;

    fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_le(self.id);
        self.attr.put(buf);
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        let id = buf.get_u64_le();
        let attr = WireAttr::get(buf);
        Self { id, attr }
    }
}

/// Reply to GETATTR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrOut {
    /// Fresh attributes.
    pub attr: WireAttr,
}

impl WireStruct for AttrOut {
    const SIZE: usize = WireAttr::SIZE;

    fn put<B: BufMut>(&self, buf: &mut B) {
        self.attr.put(buf);
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        Self {
            attr: WireAttr::get(buf),
        }
    }
}

/// Reply to GETDIR: a token naming the container that holds the listing.
///
/// The transport resolves the token into an open container; zero means
/// the daemon sent none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetdirOut {
    /// Container token, zero for none.
    pub container: u64,
}

impl WireStruct for GetdirOut {
    const SIZE: usize = 8;

    fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_le(self.container);
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        Self {
            container: buf.get_u64_le(),
        }
    }
}

/// Reply body size declared before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    /// Status only.
    Empty,
    /// Exactly this many bytes.
    Fixed(usize),
    /// At most `max` bytes; the reply's own size says how many are valid.
    Variable {
        /// Negotiated maximum.
        max: usize,
    },
}

impl ReplyShape {
    /// Largest body the caller is prepared to accept.
    pub fn capacity(self) -> usize {
        match self {
            ReplyShape::Empty => 0,
            ReplyShape::Fixed(size) => size,
            ReplyShape::Variable { max } => max,
        }
    }

    fn check(self, actual: usize) -> Result<(), ProtocolError> {
        match self {
            ReplyShape::Empty if actual != 0 => Err(ProtocolError::ReplySizeMismatch {
                expected: 0,
                actual,
            }),
            ReplyShape::Fixed(expected) if actual != expected => {
                Err(ProtocolError::ReplySizeMismatch { expected, actual })
            }
            ReplyShape::Variable { max } if actual > max => {
                Err(ProtocolError::ReplyOverflow { max, actual })
            }
            _ => Ok(()),
        }
    }
}

/// Result of a validated reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Status zero; the body matched the declared shape.
    Success(Bytes),
    /// The daemon reported this errno (positive).
    Failure(i32),
}

/// A reply from the daemon: status plus opcode-specific body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    status: i32,
    body: Bytes,
}

impl Reply {
    /// Successful reply carrying `body`.
    pub fn success(body: impl Into<Bytes>) -> Self {
        Self {
            status: 0,
            body: body.into(),
        }
    }

    /// Successful reply with no body.
    pub fn empty() -> Self {
        Self::success(Bytes::new())
    }

    /// Failed reply for a positive errno.
    pub fn errno(errno: i32) -> Self {
        Self {
            status: -errno.saturating_abs(),
            body: Bytes::new(),
        }
    }

    /// Reply with an arbitrary raw status.
    pub fn from_parts(status: i32, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Raw status: zero for success, a negated errno otherwise.
    pub fn status(&self) -> i32 {
        self.status
    }

    /// Raw body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Validates status and body against the declared shape.
    ///
    /// The body of a failed reply is ignored, whatever its size.
    pub fn into_outcome(self, shape: ReplyShape) -> Result<Outcome, ProtocolError> {
        match self.status {
            0 => {
                shape.check(self.body.len())?;
                Ok(Outcome::Success(self.body))
            }
            status if status < 0 => Ok(Outcome::Failure(status.saturating_neg())),
            status => Err(ProtocolError::PositiveStatus(status)),
        }
    }

    /// Encodes header plus body.
    pub fn encode_frame(&self) -> Result<Bytes, EncodeError> {
        let body_size = u32::try_from(self.body.len())
            .map_err(|_| EncodeError::BodyTooLarge(self.body.len()))?;
        let total = REPLY_HEADER_SIZE + self.body.len();
        let mut frame = Vec::new();
        frame
            .try_reserve_exact(total)
            .map_err(|_| EncodeError::OutOfMemory(total))?;
        frame.put_i32_le(self.status);
        frame.put_u32_le(body_size);
        frame.put_slice(&self.body);
        Ok(Bytes::from(frame))
    }

    /// Decodes a frame produced by [`encode_frame`](Self::encode_frame).
    pub fn decode_frame(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < REPLY_HEADER_SIZE {
            return Err(ProtocolError::Truncated {
                what: "reply header",
                needed: REPLY_HEADER_SIZE,
                available: frame.len(),
            });
        }
        let mut header = &frame[..REPLY_HEADER_SIZE];
        let status = header.get_i32_le();
        let declared = header.get_u32_le() as usize;
        let body = &frame[REPLY_HEADER_SIZE..];
        if declared != body.len() {
            return Err(ProtocolError::BodySizeMismatch {
                declared,
                available: body.len(),
            });
        }
        Ok(Self {
            status,
            body: Bytes::copy_from_slice(body),
        })
    }
}
