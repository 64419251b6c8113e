//! Minimal PE header access for locating the attribution region

pub mod finder;
pub mod locator;
pub mod span;

pub use finder::{ATTRIBUTION_TAG, PAYLOAD_CAPACITY, RESERVED_SIZE, find_reserved_offset};
pub use locator::{DirectoryEntry, locate_cert_directory};
pub use span::ByteSpan;

/// Check if data starts with the "MZ" DOS signature.
///
/// Attribution does not require it (prepared fixtures carry no signature),
/// but inspection output reports it.
pub fn is_pe_executable(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == b'M' && data[1] == b'Z'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pe_executable() {
        assert!(is_pe_executable(b"MZ\x90\x00"));
        assert!(!is_pe_executable(b"\x7fELF"));
        assert!(!is_pe_executable(b"M"));
    }
}
