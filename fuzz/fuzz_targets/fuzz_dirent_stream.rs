//! Fuzz target for directory container parsing
//!
//! The stream comes straight from the daemon, so every byte is untrusted.
//! Checks that:
//! - Iteration never panics and stops after the first error
//! - `fill_dir` either emits nothing or advances by exactly what it emitted
//! - Chunked reads never run past the end of the buffer

#![no_main]

use arbitrary::Arbitrary;
use kfuse_core::{SinkControl, fill_dir};
use kfuse_proto::{DIRENT_HEADER_SIZE, DirStream};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    mode: FuzzMode,
    data: Vec<u8>,
}

#[derive(Arbitrary, Debug)]
enum FuzzMode {
    /// Iterate the raw stream
    Iterate,
    /// Iterate with a smaller name limit
    NameMax(u8),
    /// Feed the whole buffer to `fill_dir`, stopping after `stop_after` entries
    Fill { stop_after: u8 },
    /// Walk the buffer in windows of `chunk` bytes
    Chunked { chunk: u16 },
}

fuzz_target!(|input: FuzzInput| {
    if input.data.len() > 1024 * 1024 {
        return;
    }
    let data = &input.data;

    match input.mode {
        FuzzMode::Iterate => {
            let mut stream = DirStream::new(data);
            let mut errored = false;
            for entry in stream.by_ref() {
                assert!(!errored, "stream continued after an error");
                match entry {
                    Ok(entry) => assert!(entry.record_len >= DIRENT_HEADER_SIZE + entry.name.len()),
                    Err(_) => errored = true,
                }
            }
            assert!(stream.consumed() <= data.len());
        }

        FuzzMode::NameMax(max) => {
            for entry in DirStream::with_name_max(data, usize::from(max)).flatten() {
                assert!(entry.name.len() <= usize::from(max));
            }
        }

        FuzzMode::Fill { stop_after } => {
            let mut position = 0u64;
            let mut seen = 0u8;
            let mut last_offered = 0u64;
            let result = fill_dir(data, &mut position, &mut |name: &[u8], pos: u64, _: u64, _: u32| {
                assert!(name.len() <= data.len());
                if seen == stop_after {
                    return SinkControl::Stop;
                }
                seen += 1;
                last_offered = pos;
                SinkControl::Continue
            });
            match result {
                Ok(outcome) => {
                    assert_eq!(position, outcome.consumed as u64);
                    assert!(outcome.consumed <= data.len());
                    assert!(last_offered <= position);
                }
                Err(_) => assert_eq!(position, 0),
            }
        }

        FuzzMode::Chunked { chunk } => {
            let chunk = usize::from(chunk).max(1);
            let mut position = 0u64;
            loop {
                let start = position as usize;
                let end = (start + chunk).min(data.len());
                match fill_dir(&data[start..end], &mut position, &mut |_: &[u8], _: u64, _: u64, _: u32| {
                    SinkControl::Continue
                }) {
                    Ok(outcome) if outcome.emitted > 0 => {
                        assert!(position as usize <= data.len());
                    }
                    _ => break,
                }
            }
        }
    }
});
