//! Builders for directory listings and names.

use kfuse_proto::{EncodeError, NAME_MAX, encode_record};

/// Renders `(child_id, name, dirent_type)` triples as a listing stream.
pub fn render_listing(entries: &[(u64, Vec<u8>, u32)]) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    for (id, name, kind) in entries {
        encode_record(&mut buf, *id, name, *kind)?;
    }
    Ok(buf)
}

/// A name of exactly `NAME_MAX` bytes.
pub fn max_name() -> Vec<u8> {
    vec![b'n'; NAME_MAX]
}

/// A name one byte over `NAME_MAX`.
pub fn overlong_name() -> Vec<u8> {
    vec![b'n'; NAME_MAX + 1]
}

/// Names that are valid on the wire but awkward elsewhere.
pub fn awkward_names() -> Vec<Vec<u8>> {
    vec![
        b"with space".to_vec(),
        "ünïcødé".as_bytes().to_vec(),
        vec![0xff, 0xfe, 0x80],
        b"-leading-dash".to_vec(),
        b"..hidden".to_vec(),
        max_name(),
    ]
}
