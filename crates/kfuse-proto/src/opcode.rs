use std::fmt;

use crate::attr::WireAttr;
use crate::error::ProtocolError;
use crate::reply::{EntryOut, GetdirOut, ReplyShape, WireStruct};

/// Filesystem verb carried in a request header.
///
/// Numbering follows the historic protocol. 2 (forget) and 4 (setattr) are
/// reserved; this core never sends them.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Resolve a name in a directory.
    Lookup = 1,
    /// Fetch attributes by object id.
    Getattr = 3,
    /// Read a symlink target.
    Readlink = 5,
    /// Create a symlink.
    Symlink = 6,
    /// Open a directory listing container.
    Getdir = 7,
    /// Create a file or special node.
    Mknod = 8,
    /// Create a directory.
    Mkdir = 9,
    /// Remove a non-directory.
    Unlink = 10,
    /// Remove a directory.
    Rmdir = 11,
    /// Move a name.
    Rename = 12,
    /// Add a hard link.
    Link = 13,
}

impl Opcode {
    /// Every opcode this core emits.
    pub const ALL: [Opcode; 11] = [
        Opcode::Lookup,
        Opcode::Getattr,
        Opcode::Readlink,
        Opcode::Symlink,
        Opcode::Getdir,
        Opcode::Mknod,
        Opcode::Mkdir,
        Opcode::Unlink,
        Opcode::Rmdir,
        Opcode::Rename,
        Opcode::Link,
    ];

    /// Wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Protocol name, as logged.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Lookup => "LOOKUP",
            Opcode::Getattr => "GETATTR",
            Opcode::Readlink => "READLINK",
            Opcode::Symlink => "SYMLINK",
            Opcode::Getdir => "GETDIR",
            Opcode::Mknod => "MKNOD",
            Opcode::Mkdir => "MKDIR",
            Opcode::Unlink => "UNLINK",
            Opcode::Rmdir => "RMDIR",
            Opcode::Rename => "RENAME",
            Opcode::Link => "LINK",
        }
    }

    /// Reply body the caller must declare before dispatching this opcode.
    ///
    /// `readlink_max` is the negotiated capacity for symlink targets.
    pub fn reply_shape(self, readlink_max: usize) -> ReplyShape {
        match self {
            Opcode::Lookup | Opcode::Mknod => ReplyShape::Fixed(EntryOut::SIZE),
            Opcode::Getattr => ReplyShape::Fixed(WireAttr::SIZE),
            Opcode::Getdir => ReplyShape::Fixed(GetdirOut::SIZE),
            Opcode::Readlink => ReplyShape::Variable { max: readlink_max },
            Opcode::Symlink
            | Opcode::Mkdir
            | Opcode::Unlink
            | Opcode::Rmdir
            | Opcode::Rename
            | Opcode::Link => ReplyShape::Empty,
        }
    }
}

impl TryFrom<u32> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.as_u32() == value)
            .ok_or(ProtocolError::UnknownOpcode(value))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Opcode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolError::UnknownOpcodeName(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values_match_historic_numbering() {
        assert_eq!(Opcode::Lookup.as_u32(), 1);
        assert_eq!(Opcode::Getattr.as_u32(), 3);
        assert_eq!(Opcode::Readlink.as_u32(), 5);
        assert_eq!(Opcode::Getdir.as_u32(), 7);
        assert_eq!(Opcode::Link.as_u32(), 13);
    }

    #[test]
    fn test_try_from_roundtrip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::try_from(op.as_u32()), Ok(op));
        }
    }

    #[test]
    fn test_reserved_values_rejected() {
        for value in [0, 2, 4, 14, u32::MAX] {
            assert_eq!(
                Opcode::try_from(value),
                Err(ProtocolError::UnknownOpcode(value))
            );
        }
    }

    #[test]
    fn test_reply_shapes() {
        assert_eq!(Opcode::Lookup.reply_shape(4095), ReplyShape::Fixed(72));
        assert_eq!(Opcode::Getattr.reply_shape(4095), ReplyShape::Fixed(64));
        assert_eq!(Opcode::Getdir.reply_shape(4095), ReplyShape::Fixed(8));
        assert_eq!(
            Opcode::Readlink.reply_shape(4095),
            ReplyShape::Variable { max: 4095 }
        );
        assert_eq!(Opcode::Rename.reply_shape(4095), ReplyShape::Empty);
    }

    #[test]
    fn test_parse_from_name() {
        assert_eq!("lookup".parse::<Opcode>(), Ok(Opcode::Lookup));
        assert_eq!("RMDIR".parse::<Opcode>(), Ok(Opcode::Rmdir));
        assert_eq!(
            "forget".parse::<Opcode>(),
            Err(ProtocolError::UnknownOpcodeName("forget".to_owned()))
        );
        let err = "forget".parse::<Opcode>().unwrap_err();
        assert_eq!(err.to_string(), "unknown opcode name \"forget\"");
    }
}
