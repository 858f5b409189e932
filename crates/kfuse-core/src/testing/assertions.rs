//! Assertions for bridge results with readable failure messages.

use std::fmt::Debug;

use crate::error::BridgeResult;
use crate::host::Binding;

/// Asserts that `result` failed with `expected_errno`.
pub fn assert_errno<T: Debug>(result: BridgeResult<T>, expected_errno: i32, context: &str) {
    match result {
        Ok(value) => panic!(
            "{context}: expected errno {expected_errno} ({}) but got success with {value:?}",
            errno_name(expected_errno)
        ),
        Err(err) => {
            let actual = err.to_errno();
            assert!(
                actual == expected_errno,
                "{context}: expected errno {expected_errno} ({}) but got {actual} ({}): {err}",
                errno_name(expected_errno),
                errno_name(actual)
            );
        }
    }
}

/// Asserts that `result` succeeded and returns the value.
pub fn assert_ok<T>(result: BridgeResult<T>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!(
            "{context}: expected success but got {err} (errno {} = {})",
            err.to_errno(),
            errno_name(err.to_errno())
        ),
    }
}

/// Asserts that a lookup produced a positive binding and returns its id.
pub fn assert_positive(binding: &Binding, context: &str) -> u64 {
    match binding.object() {
        Some(object) => object.id(),
        None => panic!("{context}: expected a positive binding, got a negative one"),
    }
}

/// Asserts that a lookup produced a negative binding.
pub fn assert_negative(binding: &Binding, context: &str) {
    if let Some(object) = binding.object() {
        panic!("{context}: expected a negative binding, got object {}", object.id());
    }
}

/// Symbolic name of the errno values the bridge produces.
pub fn errno_name(errno: i32) -> &'static str {
    match errno {
        libc::ENOENT => "ENOENT",
        libc::EEXIST => "EEXIST",
        libc::ENOTDIR => "ENOTDIR",
        libc::EISDIR => "EISDIR",
        libc::EINVAL => "EINVAL",
        libc::ENOTEMPTY => "ENOTEMPTY",
        libc::ENAMETOOLONG => "ENAMETOOLONG",
        libc::ENOMEM => "ENOMEM",
        libc::EPROTO => "EPROTO",
        libc::EIO => "EIO",
        libc::EPERM => "EPERM",
        libc::EACCES => "EACCES",
        libc::ENOTCONN => "ENOTCONN",
        libc::ETIMEDOUT => "ETIMEDOUT",
        _ => "UNKNOWN",
    }
}
