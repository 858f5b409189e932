//! Per-class operation sets.
//!
//! Every object is governed by exactly one of four process-wide, immutable
//! operation sets, chosen when the object is first classified. A set says
//! which verbs its objects accept; the translator consults it before
//! building a request.

use bitflags::bitflags;
use kfuse_proto::FileKind;

use crate::error::BridgeResult;
use crate::object::FsObject;

bitflags! {
    /// Verbs an operation set accepts beyond attribute refresh.
    ///
    /// GETATTR is accepted by every set. Data and device I/O stay with the
    /// host, so regular files and special objects carry no flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Name resolution, creation, removal and rename inside the object.
        const DIRECTORY_OPS = 1 << 0;
        /// Opening the object's listing stream.
        const OPEN_DIR = 1 << 1;
        /// Reading the link target.
        const READLINK = 1 << 2;
        /// Following the link during path resolution.
        const FOLLOW_LINK = 1 << 3;
    }
}

/// The four classes an object can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    RegularFile,
    Directory,
    Symlink,
    Special,
}

impl ObjectClass {
    /// Class for a mode's type, with anything unrecognised as special.
    pub fn from_kind(kind: Option<FileKind>) -> Self {
        match kind {
            Some(FileKind::RegularFile) => ObjectClass::RegularFile,
            Some(FileKind::Directory) => ObjectClass::Directory,
            Some(FileKind::Symlink) => ObjectClass::Symlink,
            _ => ObjectClass::Special,
        }
    }
}

/// Stateless strategy governing one class of objects.
#[derive(Debug, PartialEq, Eq)]
pub struct OperationSet {
    class: ObjectClass,
    name: &'static str,
    capabilities: Capabilities,
}

impl OperationSet {
    /// The class this set governs.
    pub fn class(&self) -> ObjectClass {
        self.class
    }

    /// Name for logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Verbs this set accepts.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Whether every verb in `caps` is accepted.
    pub fn supports(&self, caps: Capabilities) -> bool {
        self.capabilities.contains(caps)
    }

    /// Access check. Policy belongs to the host, so this always allows.
    pub fn permission(&self, _object: &FsObject, _mask: i32) -> BridgeResult<()> {
        Ok(())
    }

    /// The set governing `class`.
    pub fn for_class(class: ObjectClass) -> &'static OperationSet {
        match class {
            ObjectClass::RegularFile => &REGULAR_FILE,
            ObjectClass::Directory => &DIRECTORY,
            ObjectClass::Symlink => &SYMLINK,
            ObjectClass::Special => &SPECIAL,
        }
    }
}

pub static REGULAR_FILE: OperationSet = OperationSet {
    class: ObjectClass::RegularFile,
    name: "regular-file",
    capabilities: Capabilities::empty(),
};

pub static DIRECTORY: OperationSet = OperationSet {
    class: ObjectClass::Directory,
    name: "directory",
    capabilities: Capabilities::DIRECTORY_OPS.union(Capabilities::OPEN_DIR),
};

pub static SYMLINK: OperationSet = OperationSet {
    class: ObjectClass::Symlink,
    name: "symlink",
    capabilities: Capabilities::READLINK.union(Capabilities::FOLLOW_LINK),
};

pub static SPECIAL: OperationSet = OperationSet {
    class: ObjectClass::Special,
    name: "special",
    capabilities: Capabilities::empty(),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_from_kind() {
        assert_eq!(
            ObjectClass::from_kind(Some(FileKind::RegularFile)),
            ObjectClass::RegularFile
        );
        assert_eq!(
            ObjectClass::from_kind(Some(FileKind::Directory)),
            ObjectClass::Directory
        );
        assert_eq!(
            ObjectClass::from_kind(Some(FileKind::Symlink)),
            ObjectClass::Symlink
        );
        assert_eq!(
            ObjectClass::from_kind(Some(FileKind::CharDevice)),
            ObjectClass::Special
        );
        assert_eq!(
            ObjectClass::from_kind(Some(FileKind::NamedPipe)),
            ObjectClass::Special
        );
        assert_eq!(ObjectClass::from_kind(None), ObjectClass::Special);
    }

    #[test]
    fn test_only_directories_accept_directory_ops() {
        assert!(DIRECTORY.supports(Capabilities::DIRECTORY_OPS | Capabilities::OPEN_DIR));
        for set in [&REGULAR_FILE, &SYMLINK, &SPECIAL] {
            assert!(!set.supports(Capabilities::DIRECTORY_OPS));
            assert!(!set.supports(Capabilities::OPEN_DIR));
        }
    }

    #[test]
    fn test_only_symlinks_read_links() {
        assert!(SYMLINK.supports(Capabilities::READLINK));
        assert!(!REGULAR_FILE.supports(Capabilities::READLINK));
        assert!(!DIRECTORY.supports(Capabilities::READLINK));
    }

    #[test]
    fn test_files_and_specials_carry_no_verbs() {
        for class in [
            ObjectClass::RegularFile,
            ObjectClass::Directory,
            ObjectClass::Symlink,
            ObjectClass::Special,
        ] {
            assert_eq!(OperationSet::for_class(class).class(), class);
        }
        assert!(REGULAR_FILE.capabilities().is_empty());
        assert!(SPECIAL.capabilities().is_empty());
        assert_eq!(Capabilities::all().bits(), 0b1111);
    }

    #[test]
    fn test_for_class_returns_shared_instances() {
        assert!(std::ptr::eq(
            OperationSet::for_class(ObjectClass::Directory),
            &DIRECTORY
        ));
    }

    #[test]
    fn test_permission_always_allows() {
        let object = FsObject::new(9);
        assert!(SPECIAL.permission(&object, libc::W_OK).is_ok());
    }
}
