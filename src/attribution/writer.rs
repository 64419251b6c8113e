//! Write (and read back) attribution payloads in a prepared, signed stub.
//!
//! The payload goes into the reserved span after the attribution tag inside
//! the certificate table. That span is excluded from the Authenticode hash,
//! so the signature stays valid. The certificate directory entry, the
//! signature blob and the optional header checksum are never touched; the
//! checksum is not validated for executables.

use log::{debug, info, trace, warn};

use super::code::{AttributionCode, validate};
use crate::exceptions::{AttributionError, Result};
use crate::pe::{PAYLOAD_CAPACITY, find_reserved_offset, locate_cert_directory};

/// Resolved byte range that a payload may occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PayloadRegion {
    start: usize,
    /// Exclusive limit: end of the reserved span, clipped to the
    /// certificate table and to the buffer
    limit: usize,
}

impl PayloadRegion {
    fn capacity(&self) -> usize {
        self.limit - self.start
    }
}

fn payload_region(data: &[u8]) -> Result<PayloadRegion> {
    let directory = locate_cert_directory(data)?;
    let start = find_reserved_offset(data, &directory)?;

    // find_reserved_offset has already checked the table lies inside the buffer
    let table_end = directory.file_offset as usize + directory.size as usize;
    let limit = (start + PAYLOAD_CAPACITY).min(table_end).min(data.len());

    trace!(
        "Payload region: start=0x{:x}, limit=0x{:x}, table_end=0x{:x}",
        start, limit, table_end
    );

    Ok(PayloadRegion { start, limit })
}

fn copy_into(data: &mut [u8], region: PayloadRegion, payload: &[u8]) -> Result<()> {
    if payload.len() > PAYLOAD_CAPACITY {
        warn!(
            "Payload of {} bytes exceeds reserved capacity {}",
            payload.len(),
            PAYLOAD_CAPACITY
        );
        return Err(AttributionError::PayloadTooLarge(payload.len()));
    }

    if payload.len() > region.capacity() {
        warn!(
            "Payload of {} bytes would run past the certificate table ({} bytes available)",
            payload.len(),
            region.capacity()
        );
        return Err(AttributionError::PayloadTooLarge(payload.len()));
    }

    data[region.start..region.start + payload.len()].copy_from_slice(payload);
    debug!(
        "Wrote {} payload bytes at 0x{:x}",
        payload.len(),
        region.start
    );
    Ok(())
}

/// Copy an already-canonical payload into the reserved region.
///
/// All checks run before the first byte is written, so a failing call
/// leaves `data` unchanged. Bytes after the payload are not cleared.
/// Returns the file offset the payload was written at.
pub fn write_payload(data: &mut [u8], payload: &[u8]) -> Result<usize> {
    let region = payload_region(data)?;
    copy_into(data, region, payload)?;
    Ok(region.start)
}

/// Validate `raw_code` and write its canonical form into `data` in place.
///
/// The image is located before the code is validated, so an unprepared
/// stub is reported as such even when the code is also bad.
pub fn write_attribution(data: &mut [u8], raw_code: &str) -> Result<AttributionCode> {
    let region = payload_region(data)?;
    let code = validate(raw_code)?;
    copy_into(data, region, code.as_bytes())?;

    info!(
        "Attributed stub: offset=0x{:x}, code_len={}",
        region.start,
        code.len()
    );
    Ok(code)
}

/// Copy-then-mutate variant of [`write_attribution`].
///
/// The input is left untouched; callers serving concurrent requests from one
/// cached stub use this so no two requests share a mutable buffer.
pub fn attribute(data: &[u8], raw_code: &str) -> Result<(Vec<u8>, AttributionCode)> {
    let mut patched = data.to_vec();
    let code = write_attribution(&mut patched, raw_code)?;
    Ok((patched, code))
}

/// Return the raw reserved payload bytes, clipped to the certificate table.
pub fn read_payload(data: &[u8]) -> Result<&[u8]> {
    let region = payload_region(data)?;
    Ok(&data[region.start..region.limit])
}

/// Read the attribution currently stored in `data`.
///
/// The payload is taken up to the first NUL. A shorter code written over a
/// longer one is therefore read back with the longer code's tail attached.
pub fn read_attribution(data: &[u8]) -> Result<String> {
    let payload = read_payload(data)?;
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    Ok(String::from_utf8_lossy(&payload[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::fixture::{Bitness, generate_stub};
    use crate::pe::locator::{OPTIONAL_HEADER_DELTA, PE32_PLUS_CERT_ENTRY_DELTA};
    use crate::pe::{ATTRIBUTION_TAG, RESERVED_SIZE};

    const GOOGLE: &str = "source%3Dgoogle.com%26medium%3Dorganic%26campaign%3D(not+set)%26content%3D(not+set)";
    const GOOGLE_CANONICAL: &str =
        "source=google.com&medium=organic&campaign=%28not+set%29&content=%28not+set%29";

    /// Buffer with explicit header fields and a tag at the start of the table
    fn build_mapped(
        total_len: usize,
        pe_offset: u32,
        magic: u16,
        table_offset: u32,
        table_size: u32,
        tag: &[u8],
    ) -> Vec<u8> {
        let mut data = vec![0u8; total_len];
        let opt = pe_offset as usize + OPTIONAL_HEADER_DELTA;
        let entry = opt + if magic == 0x20b { 144 } else { 128 };
        data[0x3C..0x40].copy_from_slice(&pe_offset.to_le_bytes());
        data[opt..opt + 2].copy_from_slice(&magic.to_le_bytes());
        if total_len > entry + 8 {
            data[entry..entry + 4].copy_from_slice(&table_offset.to_le_bytes());
            data[entry + 4..entry + 8].copy_from_slice(&table_size.to_le_bytes());
            let t = table_offset as usize;
            data[t..t + tag.len()].copy_from_slice(tag);
        }
        data
    }

    fn payload_of_len(len: usize) -> Vec<u8> {
        (0..len).map(|i| b'a' + (i % 26) as u8).collect()
    }

    #[test]
    fn test_roundtrip_both_bitnesses() {
        for bitness in [Bitness::Pe32, Bitness::Pe32Plus] {
            let stub = generate_stub(bitness);
            let (patched, code) = attribute(&stub, GOOGLE).unwrap();

            assert_eq!(code.as_str(), GOOGLE_CANONICAL);
            assert_eq!(patched.len(), stub.len());

            let payload = read_payload(&patched).unwrap();
            assert_eq!(payload.len(), PAYLOAD_CAPACITY);
            assert!(payload.starts_with(GOOGLE_CANONICAL.as_bytes()));
            assert!(payload[GOOGLE_CANONICAL.len()..].iter().all(|&b| b == 0));
            assert_eq!(read_attribution(&patched).unwrap(), GOOGLE_CANONICAL);
        }
    }

    #[test]
    fn test_only_reserved_span_changes() {
        let stub = generate_stub(Bitness::Pe32Plus);
        let (patched, _) = attribute(&stub, GOOGLE).unwrap();
        let start = find_reserved_offset(&stub, &locate_cert_directory(&stub).unwrap()).unwrap();

        assert_eq!(&patched[..start], &stub[..start]);
        assert_eq!(
            &patched[start + GOOGLE_CANONICAL.len()..],
            &stub[start + GOOGLE_CANONICAL.len()..]
        );
        assert_eq!(
            locate_cert_directory(&patched).unwrap(),
            locate_cert_directory(&stub).unwrap()
        );
    }

    #[test]
    fn test_idempotent() {
        let stub = generate_stub(Bitness::Pe32);
        let mut once = stub.clone();
        write_attribution(&mut once, GOOGLE).unwrap();
        let mut twice = once.clone();
        write_attribution(&mut twice, GOOGLE).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_shorter_rewrite_leaves_residue() {
        let mut stub = generate_stub(Bitness::Pe32);
        write_attribution(&mut stub, "source=longsource&medium=m&campaign=c&content=d").unwrap();
        write_attribution(&mut stub, "source=s&medium=m&campaign=c&content=d").unwrap();

        let stored = read_attribution(&stub).unwrap();
        assert!(stored.starts_with("source=s&medium=m&campaign=c&content=d"));
        assert_ne!(stored, "source=s&medium=m&campaign=c&content=d");
    }

    #[test]
    fn test_capacity_boundary() {
        let mut stub = generate_stub(Bitness::Pe32Plus);
        let exact = payload_of_len(PAYLOAD_CAPACITY);
        write_payload(&mut stub, &exact).unwrap();
        assert_eq!(read_payload(&stub).unwrap(), exact.as_slice());

        let before = stub.clone();
        let over = payload_of_len(PAYLOAD_CAPACITY + 1);
        assert!(matches!(
            write_payload(&mut stub, &over),
            Err(AttributionError::PayloadTooLarge(1011))
        ));
        assert_eq!(stub, before);
    }

    #[test]
    fn test_payload_past_cert_table() {
        // Table is only 300 bytes; the file continues well beyond it
        let mut data = build_mapped(0x160 + 6000, 0x80, 0x20b, 0x160, 300, ATTRIBUTION_TAG);
        let before = data.clone();
        assert!(matches!(
            write_payload(&mut data, &[b'x'; 980]),
            Err(AttributionError::PayloadTooLarge(980))
        ));
        assert_eq!(data, before);

        write_payload(&mut data, &[b'x'; 300 - 14]).unwrap();
    }

    #[test]
    fn test_successful_run_on_hand_built_buffer() {
        let mut data = build_mapped(0x160 + 6000, 0x80, 0x20b, 0x160, 2000, ATTRIBUTION_TAG);
        let code = write_attribution(&mut data, "source=a&medium=b&campaign=c&content=d").unwrap();
        let at = 0x160 + ATTRIBUTION_TAG.len();
        assert_eq!(&data[at..at + code.len()], code.as_bytes());
    }

    #[test]
    fn test_unsigned() {
        let mut data = build_mapped(0x80 + 1000, 0x80, 0x20b, 0x160, 0, b"");
        assert!(matches!(
            write_attribution(&mut data, GOOGLE),
            Err(AttributionError::Unsigned)
        ));

        let mut stub = generate_stub(Bitness::Pe32Plus);
        let entry = 0x40 + OPTIONAL_HEADER_DELTA + PE32_PLUS_CERT_ENTRY_DELTA;
        stub[entry..entry + 4].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            write_attribution(&mut stub, GOOGLE),
            Err(AttributionError::Unsigned)
        ));
    }

    #[test]
    fn test_tag_not_found() {
        let mut data = build_mapped(0x80 + 1000, 0x80, 0x20b, 0x160, 300, b"FAIL");
        assert!(matches!(
            write_attribution(&mut data, GOOGLE),
            Err(AttributionError::TagNotFound)
        ));
    }

    #[test]
    fn test_malformed_inputs() {
        let mut empty: Vec<u8> = Vec::new();
        assert!(matches!(
            write_attribution(&mut empty, GOOGLE),
            Err(AttributionError::MalformedImage(_))
        ));

        let mut bad_magic = build_mapped(0x80 + 400, 0x80, 0x999, 0, 0, b"");
        assert!(matches!(
            write_attribution(&mut bad_magic, GOOGLE),
            Err(AttributionError::MalformedImage(_))
        ));

        // Table declared larger than the file
        let mut short = build_mapped(0x80 + 1000, 0x80, 0x20b, 0x160, 1000, ATTRIBUTION_TAG);
        assert!(matches!(
            write_attribution(&mut short, GOOGLE),
            Err(AttributionError::MalformedImage(_))
        ));
    }

    #[test]
    fn test_bad_code_leaves_buffer_unchanged() {
        let stub = generate_stub(Bitness::Pe32);
        let mut data = stub.clone();
        assert!(matches!(
            write_attribution(&mut data, "medium=organic"),
            Err(AttributionError::InvalidKeys(_))
        ));
        assert!(matches!(
            write_attribution(&mut data, &"a".repeat(201)),
            Err(AttributionError::CodeTooLong(201))
        ));
        assert_eq!(data, stub);
    }

    #[test]
    fn test_image_errors_take_precedence_over_code_errors() {
        let mut data = build_mapped(0x80 + 1000, 0x80, 0x20b, 0x160, 0, b"");
        assert!(matches!(
            write_attribution(&mut data, "not a code"),
            Err(AttributionError::Unsigned)
        ));
    }

    #[test]
    fn test_garbage_never_panics() {
        // Deterministic xorshift so the corpus is stable across runs
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        for _ in 0..200 {
            let len = (next() % 4096) as usize;
            let mut data: Vec<u8> = (0..len).map(|_| next() as u8).collect();
            if len >= 0x40 && next() % 2 == 0 {
                // Keep e_lfanew small so later headers are sometimes reachable
                let pe = (next() % 512) as u32;
                data[0x3C..0x40].copy_from_slice(&pe.to_le_bytes());
            }
            let _ = write_attribution(&mut data, GOOGLE);
            let _ = read_attribution(&data);
        }
    }

    #[test]
    fn test_reserved_span_constants() {
        let stub = generate_stub(Bitness::Pe32);
        let directory = locate_cert_directory(&stub).unwrap();
        assert_eq!(directory.size as usize, RESERVED_SIZE);
    }
}
