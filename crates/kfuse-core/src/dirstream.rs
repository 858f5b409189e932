//! Feeds decoded directory records to the host's enumeration callback.
//!
//! The parser itself keeps no state between calls. All resumption state is
//! the caller's logical stream position, which advances by exactly the
//! records the sink accepted.

use kfuse_proto::{DirStream, ProtocolError};
use tracing::warn;

/// Sink's answer to an offered entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    /// Entry accepted; keep going.
    Continue,
    /// Entry refused; stop before it.
    Stop,
}

/// Host directory-enumeration callback.
pub trait DirSink {
    /// Offers one entry. `position` is the stream offset of its record.
    fn entry(&mut self, name: &[u8], position: u64, child_id: u64, kind: u32) -> SinkControl;
}

impl<F> DirSink for F
where
    F: FnMut(&[u8], u64, u64, u32) -> SinkControl,
{
    fn entry(&mut self, name: &[u8], position: u64, child_id: u64, kind: u32) -> SinkControl {
        self(name, position, child_id, kind)
    }
}

/// What one [`fill_dir`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillOutcome {
    /// Entries the sink accepted.
    pub emitted: usize,
    /// Bytes the stream position advanced by.
    pub consumed: usize,
    /// The sink refused an entry.
    pub stopped: bool,
}

/// Parses `buf`, read from the stream at `*position`, into `sink`.
///
/// All complete records are checked before any is offered, so a bounds
/// violation anywhere in the buffer emits nothing and leaves `*position`
/// alone. A trailing partial record is left for the next call.
pub fn fill_dir<S: DirSink + ?Sized>(
    buf: &[u8],
    position: &mut u64,
    sink: &mut S,
) -> Result<FillOutcome, ProtocolError> {
    if let Some(Err(e)) = DirStream::new(buf).find(Result::is_err) {
        warn!(position = *position, error = %e, "malformed directory stream");
        return Err(e);
    }

    let mut outcome = FillOutcome::default();
    for entry in DirStream::new(buf) {
        let entry = entry?;
        match sink.entry(entry.name, *position, entry.child_id, entry.kind) {
            SinkControl::Continue => {
                *position += entry.record_len as u64;
                outcome.emitted += 1;
                outcome.consumed += entry.record_len;
            }
            SinkControl::Stop => {
                outcome.stopped = true;
                break;
            }
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfuse_proto::attr::{DT_DIR, DT_REG};
    use kfuse_proto::{NAME_MAX, encode_record};

    fn stream(names: &[&[u8]]) -> Vec<u8> {
        let mut buf = Vec::new();
        for (i, name) in names.iter().enumerate() {
            encode_record(&mut buf, 100 + i as u64, name, DT_REG).unwrap();
        }
        buf
    }

    #[test]
    fn test_emits_all_and_advances() {
        let buf = stream(&[b"x", b"yy", b"zzz"]);
        let mut seen = Vec::new();
        let mut position = 0;
        let outcome = fill_dir(&buf, &mut position, &mut |name: &[u8], pos: u64, id: u64, _kind: u32| {
            seen.push((name.to_vec(), pos, id));
            SinkControl::Continue
        })
        .unwrap();

        assert_eq!(outcome.emitted, 3);
        assert_eq!(outcome.consumed, 96);
        assert!(!outcome.stopped);
        assert_eq!(position, 96);
        assert_eq!(
            seen,
            vec![
                (b"x".to_vec(), 0, 100),
                (b"yy".to_vec(), 32, 101),
                (b"zzz".to_vec(), 64, 102),
            ]
        );
    }

    #[test]
    fn test_positions_continue_from_caller_offset() {
        let buf = stream(&[b"a"]);
        let mut position = 640;
        let mut offered = None;
        fill_dir(&buf, &mut position, &mut |_: &[u8], pos: u64, _: u64, _: u32| {
            offered = Some(pos);
            SinkControl::Continue
        })
        .unwrap();
        assert_eq!(offered, Some(640));
        assert_eq!(position, 672);
    }

    #[test]
    fn test_stop_leaves_position_at_refused_record() {
        let buf = stream(&[b"x", b"yy", b"zzz"]);
        let mut position = 0;
        let mut accepted = 0;
        let outcome = fill_dir(&buf, &mut position, &mut |_: &[u8], _: u64, _: u64, _: u32| {
            if accepted == 2 {
                SinkControl::Stop
            } else {
                accepted += 1;
                SinkControl::Continue
            }
        })
        .unwrap();

        assert!(outcome.stopped);
        assert_eq!(outcome.emitted, 2);
        assert_eq!(position, 64);

        // Resuming from the saved position picks up the refused record
        let mut rest = Vec::new();
        fill_dir(&buf[position as usize..], &mut position, &mut |name: &[u8], _: u64, _: u64, _: u32| {
            rest.push(name.to_vec());
            SinkControl::Continue
        })
        .unwrap();
        assert_eq!(rest, vec![b"zzz".to_vec()]);
        assert_eq!(position, 96);
    }

    #[test]
    fn test_violation_emits_nothing() {
        let mut buf = stream(&[b"ok", b"fine"]);
        encode_record(&mut buf, 9, &[b'n'; NAME_MAX + 1], DT_DIR).unwrap();

        let mut position = 0;
        let mut emitted = 0;
        let err = fill_dir(&buf, &mut position, &mut |_: &[u8], _: u64, _: u64, _: u32| {
            emitted += 1;
            SinkControl::Continue
        })
        .unwrap_err();

        assert!(matches!(err, ProtocolError::DirentNameTooLong { .. }));
        assert_eq!(emitted, 0);
        assert_eq!(position, 0);
    }

    #[test]
    fn test_partial_tail_left_for_next_call() {
        let buf = stream(&[b"x", b"yy"]);
        let mut position = 0;
        let outcome = fill_dir(&buf[..50], &mut position, &mut |_: &[u8], _: u64, _: u64, _: u32| {
            SinkControl::Continue
        })
        .unwrap();
        assert_eq!(outcome.emitted, 1);
        assert_eq!(position, 32);
    }

    struct Collect(Vec<u64>);

    impl DirSink for Collect {
        fn entry(&mut self, _name: &[u8], _position: u64, child_id: u64, _kind: u32) -> SinkControl {
            self.0.push(child_id);
            SinkControl::Continue
        }
    }

    #[test]
    fn test_struct_sink() {
        let buf = stream(&[b"a", b"b"]);
        let mut sink = Collect(Vec::new());
        fill_dir(&buf, &mut 0, &mut sink).unwrap();
        assert_eq!(sink.0, vec![100, 101]);
    }
}
