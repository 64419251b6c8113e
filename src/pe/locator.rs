//
// SPDX-FileCopyrightText: Copyright (c) 2025 provide.io llc. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//

//! Certificate (security) data directory lookup.
//!
//! Only the handful of header fields needed to reach the certificate table
//! entry are read. The rest of the image is never interpreted.

use log::{debug, trace};
use serde::Serialize;

use super::span::ByteSpan;
use crate::exceptions::{AttributionError, Result};

/// Position of the `e_lfanew` field in the DOS header
pub const E_LFANEW_OFFSET: usize = 0x3C;

/// Minimum buffer length that contains a complete `e_lfanew` field
pub const DOS_HEADER_SIZE: usize = 0x40;

/// Optional header starts after the PE signature (4) and COFF header (20)
pub const OPTIONAL_HEADER_DELTA: usize = 24;

/// Optional header magic for PE32 images
pub const PE32_MAGIC: u16 = 0x10b;

/// Optional header magic for PE32+ images
pub const PE32_PLUS_MAGIC: u16 = 0x20b;

/// Certificate directory entry offset within a PE32 optional header
pub const PE32_CERT_ENTRY_DELTA: usize = 128;

/// Certificate directory entry offset within a PE32+ optional header.
/// The wider ImageBase and stack/heap fields shift every data directory by 16.
pub const PE32_PLUS_CERT_ENTRY_DELTA: usize = 144;

/// Size of one data directory entry (offset + size)
pub const DIRECTORY_ENTRY_SIZE: usize = 8;

/// Location and length of the certificate table within the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    /// Absolute file offset (the security directory is not an RVA)
    pub file_offset: u32,
    pub size: u32,
}

impl DirectoryEntry {
    /// A zero offset or size means no certificate table was emitted
    pub fn is_empty(&self) -> bool {
        self.file_offset == 0 || self.size == 0
    }
}

/// Read the PE header offset (`e_lfanew`) from the DOS header.
pub fn pe_header_offset(data: &[u8]) -> Result<usize> {
    if data.len() < DOS_HEADER_SIZE {
        return Err(AttributionError::MalformedImage(format!(
            "buffer must be at least {DOS_HEADER_SIZE} bytes, have {}",
            data.len()
        )));
    }

    let span = ByteSpan::new(data);
    let offset = span.read_u32_le(E_LFANEW_OFFSET, "e_lfanew")? as usize;
    trace!("Read e_lfanew: pe_header_offset=0x{:x}", offset);
    Ok(offset)
}

/// File offset of the optional header.
pub fn optional_header_offset(data: &[u8]) -> Result<usize> {
    pe_header_offset(data)?
        .checked_add(OPTIONAL_HEADER_DELTA)
        .ok_or_else(|| AttributionError::MalformedImage("optional header offset overflows".into()))
}

/// Map an optional header magic value to its certificate entry delta.
pub fn cert_entry_delta(magic: u16) -> Option<usize> {
    match magic {
        PE32_MAGIC => Some(PE32_CERT_ENTRY_DELTA),
        PE32_PLUS_MAGIC => Some(PE32_PLUS_CERT_ENTRY_DELTA),
        _ => None,
    }
}

/// File offset of the 8-byte certificate directory entry.
pub fn cert_entry_offset(data: &[u8]) -> Result<usize> {
    let span = ByteSpan::new(data);
    let opt_offset = optional_header_offset(data)?;
    let magic = span.read_u16_le(opt_offset, "optional header magic")?;

    let delta = cert_entry_delta(magic).ok_or_else(|| {
        debug!("Unknown optional header magic: 0x{:x}", magic);
        AttributionError::MalformedImage(format!("unknown optional header magic 0x{magic:x}"))
    })?;

    trace!(
        "Optional header at 0x{:x}, magic=0x{:x}, cert entry delta={}",
        opt_offset, magic, delta
    );

    opt_offset
        .checked_add(delta)
        .ok_or_else(|| AttributionError::MalformedImage("cert entry offset overflows".into()))
}

/// Locate the certificate table described by the security data directory.
///
/// Header fields are re-read on every call; a caller that swaps the buffer
/// between calls always gets the entry for the current contents.
pub fn locate_cert_directory(data: &[u8]) -> Result<DirectoryEntry> {
    let span = ByteSpan::new(data);
    let entry_offset = cert_entry_offset(data)?;

    let entry = span.window(entry_offset, DIRECTORY_ENTRY_SIZE, "cert directory entry")?;
    let file_offset = u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]]);
    let size = u32::from_le_bytes([entry[4], entry[5], entry[6], entry[7]]);

    debug!(
        "Certificate directory: entry_offset=0x{:x}, table_offset=0x{:x}, size={}",
        entry_offset, file_offset, size
    );

    Ok(DirectoryEntry { file_offset, size })
}
