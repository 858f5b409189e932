pub mod decode;
pub mod dirstream;
pub mod encode;

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use kfuse_proto::FileKind;

/// A table with the house style.
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Short label for a directory record type tag.
pub fn kind_label(tag: u32) -> &'static str {
    match FileKind::from_dirent_type(tag) {
        Some(FileKind::RegularFile) => "file",
        Some(FileKind::Directory) => "dir",
        Some(FileKind::Symlink) => "symlink",
        Some(FileKind::CharDevice) => "char",
        Some(FileKind::BlockDevice) => "block",
        Some(FileKind::NamedPipe) => "fifo",
        Some(FileKind::Socket) => "socket",
        None => "unknown",
    }
}

/// Renders raw name bytes for display.
pub fn show_bytes(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}
