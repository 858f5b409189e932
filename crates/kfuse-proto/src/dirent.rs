//! Directory records and the stream iterator that decodes them.
//!
//! A container file holds records back to back. Each one is a 24-byte
//! header followed by the name, zero-padded to [`DIRENT_ALIGN`]. The
//! iterator borrows the caller's buffer and keeps no state beyond its
//! cursor; resumption across calls goes through the caller's stream
//! position and [`DirStream::consumed`].

use bytes::{Buf, BufMut};

use crate::attr::FileKind;
use crate::consts::{DIRENT_ALIGN, DIRENT_HEADER_SIZE, NAME_MAX};
use crate::error::{EncodeError, ProtocolError};

/// Longest name whose padded record length still fits the u32 field.
pub const MAX_RECORD_NAME: usize = u32::MAX as usize - DIRENT_HEADER_SIZE - DIRENT_ALIGN;

/// Padded size of a record carrying a `name_len`-byte name.
pub const fn record_size(name_len: usize) -> usize {
    (DIRENT_HEADER_SIZE + name_len).div_ceil(DIRENT_ALIGN) * DIRENT_ALIGN
}

/// Appends one record to `buf` and returns its length.
///
/// Only the u32 length fields are checked. Writers that produce container
/// files are trusted to pass a valid name; the parser enforces `NAME_MAX`.
pub fn encode_record<B: BufMut>(
    buf: &mut B,
    child_id: u64,
    name: &[u8],
    kind: u32,
) -> Result<usize, EncodeError> {
    let too_long = || EncodeError::NameTooLong {
        len: name.len(),
        max: MAX_RECORD_NAME,
    };
    if name.len() > MAX_RECORD_NAME {
        return Err(too_long());
    }
    let len = record_size(name.len());
    let name_len = u32::try_from(name.len()).map_err(|_| too_long())?;
    let record_len = u32::try_from(len).map_err(|_| too_long())?;

    buf.put_u64_le(child_id);
    buf.put_u32_le(name_len);
    buf.put_u32_le(kind);
    buf.put_u32_le(record_len);
    buf.put_u32_le(0);
    buf.put_slice(name);
    buf.put_bytes(0, len - DIRENT_HEADER_SIZE - name.len());
    Ok(len)
}

/// One decoded directory record, borrowing its name from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry<'a> {
    /// Object id of the child.
    pub child_id: u64,
    /// Entry name, not NUL-terminated.
    pub name: &'a [u8],
    /// Raw `DT_*` type tag.
    pub kind: u32,
    /// Bytes this record occupies in the stream, padding included.
    pub record_len: usize,
}

impl DirEntry<'_> {
    /// The type tag as a [`FileKind`], if it is a known one.
    pub fn file_kind(&self) -> Option<FileKind> {
        FileKind::from_dirent_type(self.kind)
    }
}

/// Iterator over the complete records of a byte buffer.
///
/// Yields `Ok` for each record, ends quietly at a partial record or a
/// partial header, and yields one `Err` and then ends on a record that
/// breaks the bounds.
#[derive(Debug, Clone)]
pub struct DirStream<'a> {
    buf: &'a [u8],
    pos: usize,
    name_max: usize,
    failed: bool,
}

impl<'a> DirStream<'a> {
    /// Parses `buf` with the default `NAME_MAX` limit.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_name_max(buf, NAME_MAX)
    }

    /// Parses `buf` with a host-specific filename limit, capped at
    /// [`MAX_RECORD_NAME`].
    pub fn with_name_max(buf: &'a [u8], name_max: usize) -> Self {
        Self {
            buf,
            pos: 0,
            name_max: name_max.min(MAX_RECORD_NAME),
            failed: false,
        }
    }

    /// Bytes taken by the records yielded so far.
    ///
    /// A trailing partial record is never counted.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    fn decode_next(&mut self) -> Option<Result<DirEntry<'a>, ProtocolError>> {
        let rest = &self.buf[self.pos..];
        if rest.len() < DIRENT_HEADER_SIZE {
            return None;
        }

        let mut header = &rest[..DIRENT_HEADER_SIZE];
        let child_id = header.get_u64_le();
        let name_len = header.get_u32_le() as usize;
        let kind = header.get_u32_le();
        let record_len = header.get_u32_le() as usize;

        if name_len > self.name_max {
            return Some(Err(ProtocolError::DirentNameTooLong {
                len: name_len,
                max: self.name_max,
            }));
        }
        let min = DIRENT_HEADER_SIZE + name_len;
        let max = record_size(self.name_max);
        if record_len < min || record_len > max {
            return Some(Err(ProtocolError::DirentBadLength {
                record_len,
                min,
                max,
            }));
        }
        if record_len % DIRENT_ALIGN != 0 {
            return Some(Err(ProtocolError::DirentMisaligned(record_len)));
        }
        if record_len > rest.len() {
            // Partial record at the tail; the next read picks it up.
            return None;
        }

        let name = &rest[DIRENT_HEADER_SIZE..min];
        self.pos += record_len;
        Some(Ok(DirEntry {
            child_id,
            name,
            kind,
            record_len,
        }))
    }
}

impl<'a> Iterator for DirStream<'a> {
    type Item = Result<DirEntry<'a>, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.decode_next();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}


/// Property-based tests using proptest.
#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn entries() -> impl Strategy<Value = Vec<(u64, Vec<u8>, u32)>> {
        prop::collection::vec(
            (
                any::<u64>(),
                prop::collection::vec(1u8..=255, 1..=NAME_MAX),
                0u32..16,
            ),
            0..20,
        )
    }

    proptest! {
        /// Truncating anywhere yields exactly the records wholly inside the cut.
        #[test]
        fn truncation_yields_complete_records(records in entries(), cut_seed in any::<usize>()) {
            let mut buf = Vec::new();
            let mut ends = Vec::new();
            for (id, name, kind) in &records {
                encode_record(&mut buf, *id, name, *kind).unwrap();
                ends.push(buf.len());
            }
            let cut = if buf.is_empty() { 0 } else { cut_seed % (buf.len() + 1) };

            let mut stream = DirStream::new(&buf[..cut]);
            let parsed: Vec<_> = stream.by_ref().collect::<Result<_, _>>().unwrap();

            let expected = ends.iter().filter(|&&end| end <= cut).count();
            prop_assert_eq!(parsed.len(), expected);
            prop_assert_eq!(stream.consumed(), if expected == 0 { 0 } else { ends[expected - 1] });
            for (entry, (id, name, kind)) in parsed.iter().zip(&records) {
                prop_assert_eq!(entry.child_id, *id);
                prop_assert_eq!(entry.name, name.as_slice());
                prop_assert_eq!(entry.kind, *kind);
            }
        }

        /// Arbitrary bytes terminate without panicking and never over-consume.
        #[test]
        fn arbitrary_bytes_terminate(bytes in prop::collection::vec(any::<u8>(), 0..1024)) {
            let mut stream = DirStream::new(&bytes);
            let mut errors = 0;
            for item in stream.by_ref() {
                if item.is_err() {
                    errors += 1;
                }
            }
            prop_assert!(errors <= 1);
            prop_assert!(stream.consumed() <= bytes.len());
        }
    }
}
