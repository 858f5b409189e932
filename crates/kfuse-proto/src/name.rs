use crate::consts::{NAME_MAX, PATH_MAX};
use crate::error::EncodeError;

/// Checks that `name` can travel as a single NUL-terminated path component.
pub fn validate_name(name: &[u8]) -> Result<(), EncodeError> {
    check_cstr(name, NAME_MAX)
}

/// Checks that a symlink target can travel NUL-terminated.
pub fn validate_target(target: &[u8]) -> Result<(), EncodeError> {
    check_cstr(target, PATH_MAX)
}

fn check_cstr(bytes: &[u8], max: usize) -> Result<(), EncodeError> {
    if bytes.is_empty() {
        return Err(EncodeError::EmptyName);
    }
    if bytes.len() > max {
        return Err(EncodeError::NameTooLong {
            len: bytes.len(),
            max,
        });
    }
    if let Some(offset) = bytes.iter().position(|&b| b == 0) {
        return Err(EncodeError::EmbeddedNul(offset));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_name(b"a").is_ok());
        assert!(validate_name("日本語.txt".as_bytes()).is_ok());
        assert!(validate_name(&[b'x'; NAME_MAX]).is_ok());
        // Non-UTF-8 bytes are fine
        assert!(validate_name(&[0xff, 0xfe]).is_ok());
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(validate_name(b""), Err(EncodeError::EmptyName));
    }

    #[test]
    fn test_name_too_long() {
        assert_eq!(
            validate_name(&[b'x'; NAME_MAX + 1]),
            Err(EncodeError::NameTooLong {
                len: NAME_MAX + 1,
                max: NAME_MAX
            })
        );
    }

    #[test]
    fn test_embedded_nul() {
        assert_eq!(validate_name(b"ab\0c"), Err(EncodeError::EmbeddedNul(2)));
    }

    #[test]
    fn test_target_allows_slashes_and_long_paths() {
        assert!(validate_target(b"../a/b/c").is_ok());
        assert!(validate_target(&[b'a'; NAME_MAX + 1]).is_ok());
        assert!(validate_target(&[b'a'; PATH_MAX + 1]).is_err());
    }
}
