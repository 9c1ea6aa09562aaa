//! Tests for error types.
//!
//! Validates display formatting and the retryability classification.

use magikspec::Error;
use std::path::PathBuf;

// =============================================================================
// Display Tests
// =============================================================================

#[test]
fn test_invalid_device_display() {
    let err = Error::InvalidDevice {
        path: "/dev/bogus".to_string(),
        reason: "not a block or character device".to_string(),
    };
    let msg = format!("{}", err);

    assert!(msg.contains("/dev/bogus"), "should include device path");
    assert!(msg.contains("not a block"), "should include reason");
}

#[test]
fn test_invalid_mount_option_display() {
    let err = Error::InvalidMountOption {
        destination: "/data".to_string(),
        option: "ro".to_string(),
        reason: "only one of 'rw' and 'ro' can be used".to_string(),
    };
    let msg = format!("{}", err);

    assert!(msg.contains("/data"), "should include destination");
    assert!(msg.contains("'ro'"), "should include option");
}

#[test]
fn test_id_map_malformed_display() {
    let err = Error::IdMapMalformed {
        path: PathBuf::from("/proc/self/gid_map"),
        line: 3,
        reason: "expected 3 fields, found 2".to_string(),
    };
    let msg = format!("{}", err);

    assert!(msg.contains("/proc/self/gid_map"));
    assert!(msg.contains("line 3"));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: Error = io.into();
    assert!(matches!(err, Error::Io(_)));
}

// =============================================================================
// Retryability Tests
// =============================================================================

#[test]
fn test_probe_errors_are_retryable() {
    let err = Error::IdMapUnreadable {
        path: PathBuf::from("/proc/self/gid_map"),
        reason: "permission denied".to_string(),
    };
    assert!(err.is_retryable());
}

#[test]
fn test_configuration_errors_are_not_retryable() {
    let errors = [
        Error::InvalidSpec("bad".to_string()),
        Error::UnsupportedMountType {
            destination: "/x".to_string(),
            mount_type: "ext9".to_string(),
        },
        Error::InvalidDevice {
            path: "/dev/x".to_string(),
            reason: "missing".to_string(),
        },
    ];
    for err in errors {
        assert!(!err.is_retryable(), "{} should not be retryable", err);
    }
}
