//
// SPDX-FileCopyrightText: Copyright (c) 2025 provide.io llc. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//

//! Locate the reserved attribution region inside the certificate table.

use log::{debug, trace};

use super::locator::DirectoryEntry;
use super::span::ByteSpan;
use crate::exceptions::{AttributionError, Result};

/// Tag that prefixes the reserved attribution region
pub const ATTRIBUTION_TAG: &[u8] = b"__MOZCUSTOM__:";

/// Total reserved span, tag included
pub const RESERVED_SIZE: usize = 1024;

/// Payload bytes available after the tag
pub const PAYLOAD_CAPACITY: usize = RESERVED_SIZE - ATTRIBUTION_TAG.len();

/// Return the index of the first occurrence of `needle` in `haystack`.
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Find the file offset immediately following the attribution tag.
///
/// The search is confined to the certificate table's declared range so that
/// a stray copy of the tag in code or data sections is never picked up.
pub fn find_reserved_offset(data: &[u8], directory: &DirectoryEntry) -> Result<usize> {
    if directory.is_empty() {
        debug!(
            "Certificate directory is empty: offset=0x{:x}, size={}",
            directory.file_offset, directory.size
        );
        return Err(AttributionError::Unsigned);
    }

    let table_offset = directory.file_offset as usize;
    let table = ByteSpan::new(data).window(table_offset, directory.size as usize, "cert table")?;

    let tag_index = find_subslice(table, ATTRIBUTION_TAG).ok_or(AttributionError::TagNotFound)?;
    let reserved = table_offset + tag_index + ATTRIBUTION_TAG.len();

    trace!(
        "Found attribution tag at 0x{:x}, payload starts at 0x{:x}",
        table_offset + tag_index,
        reserved
    );

    Ok(reserved)
}
