//
// SPDX-FileCopyrightText: Copyright (c) 2025 provide.io llc. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//

//! Bounds-checked little-endian reads over an untrusted byte buffer.
//!
//! Every accessor verifies that the requested range lies inside the buffer
//! before slicing, so adversarial header values surface as
//! [`AttributionError::MalformedImage`] rather than a panic.

use crate::exceptions::{AttributionError, Result};
use log::trace;

/// Read-only view over a PE buffer with named, checked accessors
#[derive(Debug, Clone, Copy)]
pub struct ByteSpan<'a> {
    data: &'a [u8],
}

impl<'a> ByteSpan<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Return `data[offset..offset + len]`, or an error naming `field` if the
    /// range overflows or runs past the end of the buffer.
    pub fn window(&self, offset: usize, len: usize, field: &str) -> Result<&'a [u8]> {
        let end = offset.checked_add(len).ok_or_else(|| {
            AttributionError::MalformedImage(format!(
                "{field} range overflows: offset=0x{offset:x}, len={len}"
            ))
        })?;

        if end > self.data.len() {
            trace!(
                "Rejected {} read: end=0x{:x}, buffer_len={}",
                field,
                end,
                self.data.len()
            );
            return Err(AttributionError::MalformedImage(format!(
                "buffer is shorter than {field} end: need {end} bytes, have {}",
                self.data.len()
            )));
        }

        Ok(&self.data[offset..end])
    }

    pub fn read_u16_le(&self, offset: usize, field: &str) -> Result<u16> {
        let bytes = self.window(offset, 2, field)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32_le(&self, offset: usize, field: &str) -> Result<u32> {
        let bytes = self.window(offset, 4, field)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian() {
        let data = [0x0b, 0x01, 0x78, 0x56, 0x34, 0x12];
        let span = ByteSpan::new(&data);
        assert_eq!(span.read_u16_le(0, "magic").unwrap(), 0x10b);
        assert_eq!(span.read_u32_le(2, "value").unwrap(), 0x1234_5678);
    }

    #[test]
    fn test_short_reads_are_malformed() {
        let data = [0u8; 5];
        let span = ByteSpan::new(&data);
        assert!(matches!(
            span.read_u32_le(2, "value"),
            Err(AttributionError::MalformedImage(_))
        ));
        assert!(matches!(
            span.read_u16_le(4, "magic"),
            Err(AttributionError::MalformedImage(_))
        ));
    }

    #[test]
    fn test_window_overflow_does_not_panic() {
        let data = [0u8; 8];
        let span = ByteSpan::new(&data);
        let err = span.window(usize::MAX, 2, "cert table").unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_window_at_exact_end() {
        let data = [1u8, 2, 3, 4];
        let span = ByteSpan::new(&data);
        assert_eq!(span.window(2, 2, "tail").unwrap(), &[3, 4]);
        assert_eq!(span.window(4, 0, "empty").unwrap(), &[] as &[u8]);
    }
}
