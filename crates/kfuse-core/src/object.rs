//! Cached filesystem objects.

use std::sync::OnceLock;

use kfuse_proto::{FileKind, WireAttr};
use parking_lot::RwLock;

use crate::ops::{Capabilities, ObjectClass, OperationSet};

/// Attribute state of a cached object.
///
/// Mirrors the wire record minus the device id, which is registered
/// separately for special objects only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ObjectAttrs {
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub blksize: u32,
    pub blocks: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

impl ObjectAttrs {
    /// Type from the most recent mode bits.
    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_mode(self.mode)
    }
}

/// A filesystem object known to the kernel half.
///
/// Identity is fixed at construction. The operation set is chosen once on
/// first classification and never changes; attributes are overwritten in
/// place by every fresh attribute record.
#[derive(Debug)]
pub struct FsObject {
    id: u64,
    ops: OnceLock<&'static OperationSet>,
    rdev: OnceLock<u32>,
    attrs: RwLock<ObjectAttrs>,
}

impl FsObject {
    /// An unclassified object with zeroed attributes.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ops: OnceLock::new(),
            rdev: OnceLock::new(),
            attrs: RwLock::new(ObjectAttrs::default()),
        }
    }

    /// Daemon-assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Copy of the current attributes.
    pub fn attrs(&self) -> ObjectAttrs {
        *self.attrs.read()
    }

    /// Governing operation set, once classified.
    pub fn ops(&self) -> Option<&'static OperationSet> {
        self.ops.get().copied()
    }

    /// Permanent class, once classified.
    pub fn class(&self) -> Option<ObjectClass> {
        self.ops().map(OperationSet::class)
    }

    /// Whether the object has been classified.
    pub fn is_initialized(&self) -> bool {
        self.ops.get().is_some()
    }

    /// Device id registered for a special object.
    pub fn rdev(&self) -> Option<u32> {
        self.rdev.get().copied()
    }

    /// Whether the governing set accepts every verb in `caps`.
    ///
    /// An unclassified object accepts nothing.
    pub fn supports(&self, caps: Capabilities) -> bool {
        self.ops().is_some_and(|ops| ops.supports(caps))
    }

    pub(crate) fn overwrite_attrs(&self, attr: &WireAttr) {
        let mut attrs = self.attrs.write();
        attrs.mode = attr.mode;
        attrs.nlink = attr.nlink;
        attrs.uid = attr.uid;
        attrs.gid = attr.gid;
        attrs.size = attr.size;
        attrs.blksize = attr.blksize;
        attrs.blocks = attr.blocks;
        attrs.atime = attr.atime;
        attrs.mtime = attr.mtime;
        attrs.ctime = attr.ctime;
    }

    /// Sets the operation set unless one is already present. Returns the
    /// set that governs the object afterwards and whether this call set it.
    pub(crate) fn classify(&self, ops: &'static OperationSet) -> (&'static OperationSet, bool) {
        let mut installed = false;
        let current = self.ops.get_or_init(|| {
            installed = true;
            ops
        });
        (current, installed)
    }

    pub(crate) fn set_rdev(&self, rdev: u32) {
        let _ = self.rdev.set(rdev);
    }
}
