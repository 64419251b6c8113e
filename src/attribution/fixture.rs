//! Synthetic stub generator for tests and local tooling.
//!
//! Builds the smallest buffer that the locator and finder accept: a DOS
//! header pointing at an optional header, a certificate directory entry, and
//! a certificate table holding only the tag and a zeroed payload. It is the
//! structural inverse of [`crate::pe::locate_cert_directory`] followed by
//! [`crate::pe::find_reserved_offset`].

use log::debug;
use std::fmt;
use std::str::FromStr;

use crate::exceptions::AttributionError;
use crate::pe::locator::{
    DIRECTORY_ENTRY_SIZE, DOS_HEADER_SIZE, E_LFANEW_OFFSET, OPTIONAL_HEADER_DELTA, PE32_MAGIC,
    PE32_PLUS_MAGIC, cert_entry_delta,
};
use crate::pe::{ATTRIBUTION_TAG, PAYLOAD_CAPACITY, RESERVED_SIZE};

/// Image width of a generated stub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bitness {
    /// 32-bit image (optional header magic 0x10b)
    Pe32,
    /// 64-bit image (optional header magic 0x20b)
    Pe32Plus,
}

impl Bitness {
    pub fn magic(self) -> u16 {
        match self {
            Bitness::Pe32 => PE32_MAGIC,
            Bitness::Pe32Plus => PE32_PLUS_MAGIC,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Bitness::Pe32 => 32,
            Bitness::Pe32Plus => 64,
        }
    }
}

impl fmt::Display for Bitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl FromStr for Bitness {
    type Err = AttributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "32" => Ok(Bitness::Pe32),
            "64" => Ok(Bitness::Pe32Plus),
            other => Err(AttributionError::Generic(format!(
                "invalid stub type {other:?}, must be 32 or 64"
            ))),
        }
    }
}

/// PE header placed directly after the DOS header
const STUB_PE_HEADER_OFFSET: usize = DOS_HEADER_SIZE;

/// Generate a zero-filled stub with a prepared certificate table.
pub fn generate_stub(bitness: Bitness) -> Vec<u8> {
    let optional_header_offset = STUB_PE_HEADER_OFFSET + OPTIONAL_HEADER_DELTA;
    let magic = bitness.magic();
    // Both magics map to a delta, so the fallback is unreachable
    let cert_entry_offset = optional_header_offset + cert_entry_delta(magic).unwrap_or_default();

    // Certificate table follows the directory entry
    let cert_table_offset = cert_entry_offset + DIRECTORY_ENTRY_SIZE;
    let cert_table_size = ATTRIBUTION_TAG.len() + PAYLOAD_CAPACITY;

    let mut stub = vec![0u8; cert_table_offset + cert_table_size];

    stub[E_LFANEW_OFFSET..E_LFANEW_OFFSET + 4]
        .copy_from_slice(&(STUB_PE_HEADER_OFFSET as u32).to_le_bytes());
    stub[optional_header_offset..optional_header_offset + 2].copy_from_slice(&magic.to_le_bytes());
    stub[cert_entry_offset..cert_entry_offset + 4]
        .copy_from_slice(&(cert_table_offset as u32).to_le_bytes());
    stub[cert_entry_offset + 4..cert_entry_offset + 8]
        .copy_from_slice(&(cert_table_size as u32).to_le_bytes());
    stub[cert_table_offset..cert_table_offset + ATTRIBUTION_TAG.len()].copy_from_slice(ATTRIBUTION_TAG);

    debug!(
        "Generated {}-bit stub: len={}, cert_table=0x{:x}+{}",
        bitness,
        stub.len(),
        cert_table_offset,
        RESERVED_SIZE
    );

    stub
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pe::{find_reserved_offset, locate_cert_directory};

    #[test]
    fn test_layout_is_minimal() {
        // 0x40 + 24 + {128,144} + 8, then 1024 reserved bytes
        assert_eq!(generate_stub(Bitness::Pe32).len(), 0x40 + 24 + 128 + 8 + 1024);
        assert_eq!(generate_stub(Bitness::Pe32Plus).len(), 0x40 + 24 + 144 + 8 + 1024);
    }

    #[test]
    fn test_generated_stub_locates() {
        for bitness in [Bitness::Pe32, Bitness::Pe32Plus] {
            let stub = generate_stub(bitness);
            let directory = locate_cert_directory(&stub).unwrap();
            assert_eq!(directory.size as usize, RESERVED_SIZE);
            assert_eq!(directory.file_offset as usize + RESERVED_SIZE, stub.len());

            let offset = find_reserved_offset(&stub, &directory).unwrap();
            assert_eq!(offset + PAYLOAD_CAPACITY, stub.len());
            assert!(stub[offset..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_bitness_parse() {
        assert_eq!("32".parse::<Bitness>().unwrap(), Bitness::Pe32);
        assert_eq!("64".parse::<Bitness>().unwrap(), Bitness::Pe32Plus);
        assert!("16".parse::<Bitness>().is_err());
        assert_eq!(Bitness::Pe32Plus.to_string(), "64");
    }
}
