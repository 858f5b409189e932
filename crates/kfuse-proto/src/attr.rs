//! Attribute record and object-type classification.
//!
//! The daemon describes every object with a fixed 64-byte attribute record.
//! The type of an object lives in the `S_IFMT` bits of its mode, and
//! directory records carry the same information as a `DT_*` tag.

use bytes::{Buf, BufMut};

use crate::reply::WireStruct;

/// Mask selecting the type bits of a mode.
pub const S_IFMT: u32 = 0o170_000;
/// Socket.
pub const S_IFSOCK: u32 = 0o140_000;
/// Symbolic link.
pub const S_IFLNK: u32 = 0o120_000;
/// Regular file.
pub const S_IFREG: u32 = 0o100_000;
/// Block device.
pub const S_IFBLK: u32 = 0o060_000;
/// Directory.
pub const S_IFDIR: u32 = 0o040_000;
/// Character device.
pub const S_IFCHR: u32 = 0o020_000;
/// Named pipe.
pub const S_IFIFO: u32 = 0o010_000;

/// Directory record type: unknown.
pub const DT_UNKNOWN: u32 = 0;
/// Directory record type: named pipe.
pub const DT_FIFO: u32 = 1;
/// Directory record type: character device.
pub const DT_CHR: u32 = 2;
/// Directory record type: directory.
pub const DT_DIR: u32 = 4;
/// Directory record type: block device.
pub const DT_BLK: u32 = 6;
/// Directory record type: regular file.
pub const DT_REG: u32 = 8;
/// Directory record type: symbolic link.
pub const DT_LNK: u32 = 10;
/// Directory record type: socket.
pub const DT_SOCK: u32 = 12;

/// Object type as encoded in mode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Regular file.
    RegularFile,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Named pipe.
    NamedPipe,
    /// Socket.
    Socket,
}

impl FileKind {
    /// Classifies a mode by its type bits.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & S_IFMT {
            S_IFREG => Some(FileKind::RegularFile),
            S_IFDIR => Some(FileKind::Directory),
            S_IFLNK => Some(FileKind::Symlink),
            S_IFCHR => Some(FileKind::CharDevice),
            S_IFBLK => Some(FileKind::BlockDevice),
            S_IFIFO => Some(FileKind::NamedPipe),
            S_IFSOCK => Some(FileKind::Socket),
            _ => None,
        }
    }

    /// Classifies a directory record type tag.
    pub fn from_dirent_type(tag: u32) -> Option<Self> {
        match tag {
            DT_REG => Some(FileKind::RegularFile),
            DT_DIR => Some(FileKind::Directory),
            DT_LNK => Some(FileKind::Symlink),
            DT_CHR => Some(FileKind::CharDevice),
            DT_BLK => Some(FileKind::BlockDevice),
            DT_FIFO => Some(FileKind::NamedPipe),
            DT_SOCK => Some(FileKind::Socket),
            _ => None,
        }
    }

    /// The `S_IF*` bits for this kind.
    pub fn mode_bits(self) -> u32 {
        match self {
            FileKind::RegularFile => S_IFREG,
            FileKind::Directory => S_IFDIR,
            FileKind::Symlink => S_IFLNK,
            FileKind::CharDevice => S_IFCHR,
            FileKind::BlockDevice => S_IFBLK,
            FileKind::NamedPipe => S_IFIFO,
            FileKind::Socket => S_IFSOCK,
        }
    }

    /// The `DT_*` tag for this kind.
    pub fn dirent_type(self) -> u32 {
        match self {
            FileKind::RegularFile => DT_REG,
            FileKind::Directory => DT_DIR,
            FileKind::Symlink => DT_LNK,
            FileKind::CharDevice => DT_CHR,
            FileKind::BlockDevice => DT_BLK,
            FileKind::NamedPipe => DT_FIFO,
            FileKind::Socket => DT_SOCK,
        }
    }

    /// Whether this is a device, pipe or socket.
    pub fn is_special(self) -> bool {
        !matches!(
            self,
            FileKind::RegularFile | FileKind::Directory | FileKind::Symlink
        )
    }
}

/// Attribute record as sent by the daemon.
///
/// Timestamps are whole seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WireAttr {
    /// Type and permission bits.
    pub mode: u32,
    /// Hard link count.
    pub nlink: u32,
    /// Owner.
    pub uid: u32,
    /// Group.
    pub gid: u32,
    /// Device id, meaningful for device nodes only.
    pub rdev: u32,
    /// Preferred I/O block size.
    pub blksize: u32,
    /// Size in bytes.
    pub size: u64,
    /// Allocated 512-byte blocks.
    pub blocks: u64,
    /// Last access.
    pub atime: i64,
    /// Last modification.
    pub mtime: i64,
    /// Last status change.
    pub ctime: i64,
}

impl WireAttr {
    /// Object type from the mode bits, if recognised.
    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_mode(self.mode)
    }

    /// Permission bits without the type.
    pub fn permissions(&self) -> u32 {
        self.mode & !S_IFMT
    }
}

impl WireStruct for WireAttr {
    const SIZE: usize = 64;

    fn put<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.mode);
        buf.put_u32_le(self.nlink);
        buf.put_u32_le(self.uid);
        buf.put_u32_le(self.gid);
        buf.put_u32_le(self.rdev);
        buf.put_u32_le(self.blksize);
        buf.put_u64_le(self.size);
        buf.put_u64_le(self.blocks);
        buf.put_i64_le(self.atime);
        buf.put_i64_le(self.mtime);
        buf.put_i64_le(self.ctime);
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        Self {
            mode: buf.get_u32_le(),
            nlink: buf.get_u32_le(),
            uid: buf.get_u32_le(),
            gid: buf.get_u32_le(),
            rdev: buf.get_u32_le(),
            blksize: buf.get_u32_le(),
            size: buf.get_u64_le(),
            blocks: buf.get_u64_le(),
            atime: buf.get_i64_le(),
            mtime: buf.get_i64_le(),
            ctime: buf.get_i64_le(),
        }
    }
}
