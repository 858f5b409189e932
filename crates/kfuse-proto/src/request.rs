//! Request construction and decoding.
//!
//! One constructor per body layout. Each validates its names, allocates
//! exactly header-free body space with a fallible reservation, and writes
//! every string NUL-terminated. Nothing here contacts a transport, so an
//! allocation failure aborts the operation before any request exists.

use bytes::{Buf, BufMut, Bytes};

use crate::consts::REQUEST_HEADER_SIZE;
use crate::error::{EncodeError, ProtocolError};
use crate::name::{validate_name, validate_target};
use crate::opcode::Opcode;

/// Fixed part of a MKNOD body: mode, rdev.
const MKNOD_NAME_OFFSET: usize = 8;
/// Fixed part of a MKDIR body: mode.
const MKDIR_NAME_OFFSET: usize = 4;
/// Fixed part of RENAME and LINK bodies: destination directory id.
const NEWDIR_NAME_OFFSET: usize = 8;

/// An opcode-tagged request for the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    opcode: Opcode,
    subject: u64,
    body: Bytes,
}

/// Decoded view of a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestBody<'a> {
    /// GETATTR, READLINK, GETDIR.
    Empty,
    /// LOOKUP, UNLINK, RMDIR.
    Name(&'a [u8]),
    /// MKNOD.
    Mknod {
        /// Type and permission bits.
        mode: u32,
        /// Device id for device nodes.
        rdev: u32,
        /// New entry name.
        name: &'a [u8],
    },
    /// MKDIR.
    Mkdir {
        /// Permission bits.
        mode: u32,
        /// New directory name.
        name: &'a [u8],
    },
    /// SYMLINK.
    Symlink {
        /// New link name.
        name: &'a [u8],
        /// Link target.
        target: &'a [u8],
    },
    /// RENAME.
    Rename {
        /// Destination directory id.
        new_parent: u64,
        /// Source name in the subject directory.
        old_name: &'a [u8],
        /// Destination name.
        new_name: &'a [u8],
    },
    /// LINK.
    Link {
        /// Destination directory id.
        new_parent: u64,
        /// Name of the new link.
        name: &'a [u8],
    },
}

fn alloc_body(size: usize) -> Result<Vec<u8>, EncodeError> {
    let mut body = Vec::new();
    body.try_reserve_exact(size)
        .map_err(|_| EncodeError::OutOfMemory(size))?;
    Ok(body)
}

fn put_cstr(body: &mut Vec<u8>, s: &[u8]) {
    body.put_slice(s);
    body.put_u8(0);
}

impl Request {
    fn from_body(opcode: Opcode, subject: u64, body: Vec<u8>) -> Self {
        Self {
            opcode,
            subject,
            body: Bytes::from(body),
        }
    }

    /// Body of a single NUL-terminated name. LOOKUP, UNLINK and RMDIR.
    pub fn name_only(opcode: Opcode, parent: u64, name: &[u8]) -> Result<Self, EncodeError> {
        if !matches!(opcode, Opcode::Lookup | Opcode::Unlink | Opcode::Rmdir) {
            return Err(EncodeError::WrongOpcode(opcode));
        }
        validate_name(name)?;
        let mut body = alloc_body(name.len() + 1)?;
        put_cstr(&mut body, name);
        Ok(Self::from_body(opcode, parent, body))
    }

    /// LOOKUP of `name` in `parent`.
    pub fn lookup(parent: u64, name: &[u8]) -> Result<Self, EncodeError> {
        Self::name_only(Opcode::Lookup, parent, name)
    }

    /// UNLINK of `name` in `parent`.
    pub fn unlink(parent: u64, name: &[u8]) -> Result<Self, EncodeError> {
        Self::name_only(Opcode::Unlink, parent, name)
    }

    /// RMDIR of `name` in `parent`.
    pub fn rmdir(parent: u64, name: &[u8]) -> Result<Self, EncodeError> {
        Self::name_only(Opcode::Rmdir, parent, name)
    }

    /// Creation body: a fixed struct followed by the name.
    ///
    /// MKNOD carries `mode` and `rdev` (zero when absent); MKDIR carries
    /// `mode` only and rejects an `rdev`.
    pub fn create(
        opcode: Opcode,
        parent: u64,
        mode: u32,
        rdev: Option<u32>,
        name: &[u8],
    ) -> Result<Self, EncodeError> {
        let offset = match (opcode, rdev) {
            (Opcode::Mknod, _) => MKNOD_NAME_OFFSET,
            (Opcode::Mkdir, None) => MKDIR_NAME_OFFSET,
            _ => return Err(EncodeError::WrongOpcode(opcode)),
        };
        validate_name(name)?;
        let mut body = alloc_body(offset + name.len() + 1)?;
        body.put_u32_le(mode);
        if opcode == Opcode::Mknod {
            body.put_u32_le(rdev.unwrap_or(0));
        }
        put_cstr(&mut body, name);
        Ok(Self::from_body(opcode, parent, body))
    }

    /// MKNOD of `name` in `parent`.
    pub fn mknod(parent: u64, mode: u32, rdev: u32, name: &[u8]) -> Result<Self, EncodeError> {
        Self::create(Opcode::Mknod, parent, mode, Some(rdev), name)
    }

    /// MKDIR of `name` in `parent`.
    pub fn mkdir(parent: u64, mode: u32, name: &[u8]) -> Result<Self, EncodeError> {
        Self::create(Opcode::Mkdir, parent, mode, None, name)
    }

    /// SYMLINK: two strings back to back.
    pub fn symlink(parent: u64, name: &[u8], target: &[u8]) -> Result<Self, EncodeError> {
        validate_name(name)?;
        validate_target(target)?;
        let mut body = alloc_body(name.len() + 1 + target.len() + 1)?;
        put_cstr(&mut body, name);
        put_cstr(&mut body, target);
        Ok(Self::from_body(Opcode::Symlink, parent, body))
    }

    /// RENAME: destination directory, then old and new names.
    pub fn rename(
        parent: u64,
        new_parent: u64,
        old_name: &[u8],
        new_name: &[u8],
    ) -> Result<Self, EncodeError> {
        validate_name(old_name)?;
        validate_name(new_name)?;
        let size = NEWDIR_NAME_OFFSET + old_name.len() + 1 + new_name.len() + 1;
        let mut body = alloc_body(size)?;
        body.put_u64_le(new_parent);
        put_cstr(&mut body, old_name);
        put_cstr(&mut body, new_name);
        Ok(Self::from_body(Opcode::Rename, parent, body))
    }

    /// LINK: the subject is the existing object, not a directory.
    pub fn link(object: u64, new_parent: u64, new_name: &[u8]) -> Result<Self, EncodeError> {
        validate_name(new_name)?;
        let mut body = alloc_body(NEWDIR_NAME_OFFSET + new_name.len() + 1)?;
        body.put_u64_le(new_parent);
        put_cstr(&mut body, new_name);
        Ok(Self::from_body(Opcode::Link, object, body))
    }

    /// Body-less query about one object. GETATTR, READLINK and GETDIR.
    pub fn attribute_query(opcode: Opcode, object: u64) -> Result<Self, EncodeError> {
        if !matches!(opcode, Opcode::Getattr | Opcode::Readlink | Opcode::Getdir) {
            return Err(EncodeError::WrongOpcode(opcode));
        }
        Ok(Self {
            opcode,
            subject: object,
            body: Bytes::new(),
        })
    }

    /// The verb.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Object id the request is about.
    pub fn subject(&self) -> u64 {
        self.subject
    }

    /// Raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Encodes header plus body.
    pub fn encode_frame(&self) -> Result<Bytes, EncodeError> {
        let body_size = u32::try_from(self.body.len())
            .map_err(|_| EncodeError::BodyTooLarge(self.body.len()))?;
        let total = REQUEST_HEADER_SIZE + self.body.len();
        let mut frame = alloc_body(total)?;
        frame.put_u32_le(self.opcode.as_u32());
        frame.put_u64_le(self.subject);
        frame.put_u32_le(body_size);
        frame.put_slice(&self.body);
        Ok(Bytes::from(frame))
    }

    /// Decodes a frame produced by [`encode_frame`](Self::encode_frame).
    ///
    /// Only the header is checked here; use
    /// [`decode_body`](Self::decode_body) to validate the body layout.
    pub fn decode_frame(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < REQUEST_HEADER_SIZE {
            return Err(ProtocolError::Truncated {
                what: "request header",
                needed: REQUEST_HEADER_SIZE,
                available: frame.len(),
            });
        }
        let mut header = &frame[..REQUEST_HEADER_SIZE];
        let opcode = Opcode::try_from(header.get_u32_le())?;
        let subject = header.get_u64_le();
        let declared = header.get_u32_le() as usize;
        let body = &frame[REQUEST_HEADER_SIZE..];
        if declared != body.len() {
            return Err(ProtocolError::BodySizeMismatch {
                declared,
                available: body.len(),
            });
        }
        Ok(Self {
            opcode,
            subject,
            body: Bytes::copy_from_slice(body),
        })
    }

    /// Parses the body according to the opcode's layout.
    pub fn decode_body(&self) -> Result<RequestBody<'_>, ProtocolError> {
        let mut buf: &[u8] = &self.body;
        let decoded = match self.opcode {
            Opcode::Getattr | Opcode::Readlink | Opcode::Getdir => RequestBody::Empty,
            Opcode::Lookup | Opcode::Unlink | Opcode::Rmdir => {
                RequestBody::Name(take_cstr(&mut buf, "name")?)
            }
            Opcode::Mknod => {
                need(buf, MKNOD_NAME_OFFSET, "mknod header")?;
                let mode = buf.get_u32_le();
                let rdev = buf.get_u32_le();
                let name = take_cstr(&mut buf, "name")?;
                RequestBody::Mknod { mode, rdev, name }
            }
            Opcode::Mkdir => {
                need(buf, MKDIR_NAME_OFFSET, "mkdir header")?;
                let mode = buf.get_u32_le();
                let name = take_cstr(&mut buf, "name")?;
                RequestBody::Mkdir { mode, name }
            }
            Opcode::Symlink => {
                let name = take_cstr(&mut buf, "name")?;
                let target = take_cstr(&mut buf, "target")?;
                RequestBody::Symlink { name, target }
            }
            Opcode::Rename => {
                need(buf, NEWDIR_NAME_OFFSET, "rename header")?;
                let new_parent = buf.get_u64_le();
                let old_name = take_cstr(&mut buf, "old_name")?;
                let new_name = take_cstr(&mut buf, "new_name")?;
                RequestBody::Rename {
                    new_parent,
                    old_name,
                    new_name,
                }
            }
            Opcode::Link => {
                need(buf, NEWDIR_NAME_OFFSET, "link header")?;
                let new_parent = buf.get_u64_le();
                let name = take_cstr(&mut buf, "name")?;
                RequestBody::Link { new_parent, name }
            }
        };
        if !buf.is_empty() {
            return Err(ProtocolError::TrailingBytes(buf.len()));
        }
        Ok(decoded)
    }
}

fn need(buf: &[u8], needed: usize, what: &'static str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        return Err(ProtocolError::Truncated {
            what,
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

fn take_cstr<'a>(buf: &mut &'a [u8], field: &'static str) -> Result<&'a [u8], ProtocolError> {
    let src: &'a [u8] = buf;
    let end = src
        .iter()
        .position(|&b| b == 0)
        .ok_or(ProtocolError::MissingNul(field))?;
    let (s, rest) = src.split_at(end);
    *buf = &rest[1..];
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::NAME_MAX;

    #[test]
    fn test_lookup_body_layout() {
        let req = Request::lookup(1, b"abc").unwrap();
        assert_eq!(req.opcode(), Opcode::Lookup);
        assert_eq!(req.subject(), 1);
        assert_eq!(&req.body()[..], b"abc\0");
    }

    #[test]
    fn test_name_only_rejects_other_opcodes() {
        assert_eq!(
            Request::name_only(Opcode::Mkdir, 1, b"a"),
            Err(EncodeError::WrongOpcode(Opcode::Mkdir))
        );
    }

    #[test]
    fn test_mknod_body_layout() {
        let req = Request::mknod(7, 0o100644, 0x0801, b"f").unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&0o100644u32.to_le_bytes());
        expected.extend_from_slice(&0x0801u32.to_le_bytes());
        expected.extend_from_slice(b"f\0");
        assert_eq!(&req.body()[..], &expected[..]);
        assert_eq!(req.body().len(), MKNOD_NAME_OFFSET + 1 + 1);
    }

    #[test]
    fn test_create_without_rdev_uses_zero() {
        let req = Request::create(Opcode::Mknod, 1, 0o100600, None, b"f").unwrap();
        assert_eq!(
            req.decode_body(),
            Ok(RequestBody::Mknod {
                mode: 0o100600,
                rdev: 0,
                name: b"f"
            })
        );
    }

    #[test]
    fn test_mkdir_body_layout() {
        let req = Request::mkdir(1, 0o755, b"dir").unwrap();
        assert_eq!(req.body().len(), MKDIR_NAME_OFFSET + 4);
        assert_eq!(&req.body()[4..], b"dir\0");
    }

    #[test]
    fn test_mkdir_rejects_rdev() {
        assert_eq!(
            Request::create(Opcode::Mkdir, 1, 0o755, Some(3), b"d"),
            Err(EncodeError::WrongOpcode(Opcode::Mkdir))
        );
    }

    #[test]
    fn test_symlink_body_layout() {
        let req = Request::symlink(1, b"ln", b"../target").unwrap();
        assert_eq!(&req.body()[..], b"ln\0../target\0");
        assert_eq!(req.body().len(), 2 + 1 + 9 + 1);
    }

    #[test]
    fn test_rename_body_layout() {
        let req = Request::rename(1, 9, b"a", b"bb").unwrap();
        assert_eq!(&req.body()[..8], &9u64.to_le_bytes());
        assert_eq!(&req.body()[8..], b"a\0bb\0");
    }

    #[test]
    fn test_link_subject_is_object() {
        let req = Request::link(42, 3, b"hard").unwrap();
        assert_eq!(req.subject(), 42);
        assert_eq!(
            req.decode_body(),
            Ok(RequestBody::Link {
                new_parent: 3,
                name: b"hard"
            })
        );
    }

    #[test]
    fn test_attribute_query_has_no_body() {
        for op in [Opcode::Getattr, Opcode::Readlink, Opcode::Getdir] {
            let req = Request::attribute_query(op, 5).unwrap();
            assert!(req.body().is_empty());
            assert_eq!(req.decode_body(), Ok(RequestBody::Empty));
        }
        assert!(Request::attribute_query(Opcode::Lookup, 5).is_err());
    }

    #[test]
    fn test_invalid_names_rejected_before_encoding() {
        assert_eq!(Request::lookup(1, b""), Err(EncodeError::EmptyName));
        assert_eq!(Request::unlink(1, b"a\0b"), Err(EncodeError::EmbeddedNul(1)));
        assert!(matches!(
            Request::rmdir(1, &[b'x'; NAME_MAX + 1]),
            Err(EncodeError::NameTooLong { .. })
        ));
        assert!(Request::symlink(1, b"l", b"").is_err());
        assert!(Request::rename(1, 1, b"ok", b"").is_err());
    }

    #[test]
    fn test_frame_header_layout() {
        let frame = Request::lookup(0x0102_0304_0506_0708, b"a").unwrap().encode_frame().unwrap();
        assert_eq!(frame.len(), REQUEST_HEADER_SIZE + 2);
        assert_eq!(&frame[0..4], &1u32.to_le_bytes());
        assert_eq!(&frame[4..12], &0x0102_0304_0506_0708u64.to_le_bytes());
        assert_eq!(&frame[12..16], &2u32.to_le_bytes());
        assert_eq!(&frame[16..], b"a\0");
    }

    #[test]
    fn test_decode_frame_unknown_opcode() {
        let mut frame = Request::lookup(1, b"a").unwrap().encode_frame().unwrap().to_vec();
        frame[0] = 2;
        assert_eq!(
            Request::decode_frame(&frame),
            Err(ProtocolError::UnknownOpcode(2))
        );
    }

    #[test]
    fn test_decode_frame_size_mismatch() {
        let frame = Request::lookup(1, b"abc").unwrap().encode_frame().unwrap();
        assert!(matches!(
            Request::decode_frame(&frame[..frame.len() - 1]),
            Err(ProtocolError::BodySizeMismatch {
                declared: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn test_decode_body_missing_nul() {
        let frame = {
            let mut f = Vec::new();
            f.put_u32_le(Opcode::Symlink.as_u32());
            f.put_u64_le(1);
            f.put_u32_le(6);
            f.put_slice(b"ln\0tgt");
            f
        };
        let req = Request::decode_frame(&frame).unwrap();
        assert_eq!(req.decode_body(), Err(ProtocolError::MissingNul("target")));
    }

    #[test]
    fn test_decode_body_trailing_bytes() {
        let frame = {
            let mut f = Vec::new();
            f.put_u32_le(Opcode::Lookup.as_u32());
            f.put_u64_le(1);
            f.put_u32_le(4);
            f.put_slice(b"a\0zz");
            f
        };
        let req = Request::decode_frame(&frame).unwrap();
        assert_eq!(req.decode_body(), Err(ProtocolError::TrailingBytes(2)));
    }

    #[test]
    fn test_decode_body_truncated_fixed_part() {
        let frame = {
            let mut f = Vec::new();
            f.put_u32_le(Opcode::Rename.as_u32());
            f.put_u64_le(1);
            f.put_u32_le(3);
            f.put_slice(&[1, 2, 3]);
            f
        };
        let req = Request::decode_frame(&frame).unwrap();
        assert!(matches!(
            req.decode_body(),
            Err(ProtocolError::Truncated { needed: 8, available: 3, .. })
        ));
    }
}

/// Property-based tests using proptest.
#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::consts::NAME_MAX;
    use proptest::prelude::*;

    fn name() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(1u8..=255, 1..=NAME_MAX)
    }

    proptest! {
        /// Every body layout decodes back to the fields it was built from.
        #[test]
        fn name_only_roundtrip(parent in any::<u64>(), n in name(), which in 0usize..3) {
            let op = [Opcode::Lookup, Opcode::Unlink, Opcode::Rmdir][which];
            let req = Request::name_only(op, parent, &n).unwrap();
            let decoded = Request::decode_frame(&req.encode_frame().unwrap()).unwrap();
            prop_assert_eq!(decoded.opcode(), op);
            prop_assert_eq!(decoded.subject(), parent);
            prop_assert_eq!(decoded.decode_body().unwrap(), RequestBody::Name(&n));
        }

        #[test]
        fn mknod_roundtrip(parent in any::<u64>(), mode in any::<u32>(), rdev in any::<u32>(), n in name()) {
            let req = Request::mknod(parent, mode, rdev, &n).unwrap();
            let decoded = Request::decode_frame(&req.encode_frame().unwrap()).unwrap();
            prop_assert_eq!(decoded.decode_body().unwrap(), RequestBody::Mknod { mode, rdev, name: &n });
        }

        #[test]
        fn mkdir_roundtrip(parent in any::<u64>(), mode in any::<u32>(), n in name()) {
            let req = Request::mkdir(parent, mode, &n).unwrap();
            let decoded = Request::decode_frame(&req.encode_frame().unwrap()).unwrap();
            prop_assert_eq!(decoded.decode_body().unwrap(), RequestBody::Mkdir { mode, name: &n });
        }

        #[test]
        fn symlink_roundtrip(parent in any::<u64>(), n in name(), target in prop::collection::vec(1u8..=255, 1..1024)) {
            let req = Request::symlink(parent, &n, &target).unwrap();
            let decoded = Request::decode_frame(&req.encode_frame().unwrap()).unwrap();
            prop_assert_eq!(decoded.decode_body().unwrap(), RequestBody::Symlink { name: &n, target: &target });
        }

        #[test]
        fn rename_roundtrip(parent in any::<u64>(), new_parent in any::<u64>(), old in name(), new in name()) {
            let req = Request::rename(parent, new_parent, &old, &new).unwrap();
            let decoded = Request::decode_frame(&req.encode_frame().unwrap()).unwrap();
            prop_assert_eq!(decoded.subject(), parent);
            prop_assert_eq!(
                decoded.decode_body().unwrap(),
                RequestBody::Rename { new_parent, old_name: &old, new_name: &new }
            );
        }

        #[test]
        fn link_roundtrip(object in any::<u64>(), new_parent in any::<u64>(), n in name()) {
            let req = Request::link(object, new_parent, &n).unwrap();
            let decoded = Request::decode_frame(&req.encode_frame().unwrap()).unwrap();
            prop_assert_eq!(decoded.subject(), object);
            prop_assert_eq!(decoded.decode_body().unwrap(), RequestBody::Link { new_parent, name: &n });
        }

        /// Arbitrary bytes never panic the decoder.
        #[test]
        fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
            if let Ok(req) = Request::decode_frame(&bytes) {
                let _ = req.decode_body();
            }
        }
    }
}
