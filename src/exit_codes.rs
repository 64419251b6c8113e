//! Standard exit codes for the stubattr binaries
//!
//! Each attribution failure kind gets its own code so that calling scripts
//! can tell an unprepared stub from a bad attribution code.

use crate::exceptions::AttributionError;

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Generic error (avoid using - be more specific)
pub const EXIT_ERROR: i32 = 1;

/// Panic or unrecoverable error
pub const EXIT_PANIC: i32 = 101;

/// Stub is not a recognizable image (short buffer, unknown magic)
pub const EXIT_MALFORMED_IMAGE: i32 = 102;

/// Stub carries no certificate table
pub const EXIT_UNSIGNED: i32 = 103;

/// Certificate table has no attribution tag
pub const EXIT_TAG_NOT_FOUND: i32 = 104;

/// Invalid command-line arguments
pub const EXIT_INVALID_ARGS: i32 = 105;

/// I/O error (file not found, permission denied, disk error)
pub const EXIT_IO_ERROR: i32 = 106;

/// Attribution code longer than the accepted raw length
pub const EXIT_CODE_TOO_LONG: i32 = 107;

/// Attribution code has missing, extra or duplicate keys
pub const EXIT_INVALID_KEYS: i32 = 108;

/// Canonical attribution code does not fit the reserved space
pub const EXIT_PAYLOAD_TOO_LARGE: i32 = 109;

/// Read-back after writing did not match
pub const EXIT_VERIFY_ERROR: i32 = 110;

/// Map an error to the exit code reported by the binaries
pub fn for_error(err: &AttributionError) -> i32 {
    match err {
        AttributionError::MalformedImage(_) => EXIT_MALFORMED_IMAGE,
        AttributionError::Unsigned => EXIT_UNSIGNED,
        AttributionError::TagNotFound => EXIT_TAG_NOT_FOUND,
        AttributionError::CodeTooLong(_) => EXIT_CODE_TOO_LONG,
        AttributionError::InvalidKeys(_) => EXIT_INVALID_KEYS,
        AttributionError::PayloadTooLarge(_) => EXIT_PAYLOAD_TOO_LARGE,
        AttributionError::IoError(_) => EXIT_IO_ERROR,
        AttributionError::JsonError(_) | AttributionError::Generic(_) => EXIT_ERROR,
    }
}
