//! Attribution code validation and canonical encoding.
//!
//! Input is a percent-encoded query string (`source%3D...%26medium%3D...`).
//! The canonical form re-encodes the four required values in a fixed order
//! using the form convention (space as `+`).

use log::{debug, warn};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;
use std::fmt;

use crate::exceptions::{AttributionError, Result};

/// Longest raw (still encoded) code accepted, in characters
pub const MAX_RAW_CODE_LEN: usize = 200;

/// Required keys, in canonical output order
pub const REQUIRED_KEYS: [&str; 4] = ["source", "medium", "campaign", "content"];

/// Bytes left unescaped in canonical values: alphanumerics, `_ . - ~`, and
/// space (rewritten to `+` afterwards).
const FORM_VALUE_ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b' ');

/// A validated attribution code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributionCode {
    source: String,
    medium: String,
    campaign: String,
    content: String,
    canonical: String,
}

impl AttributionCode {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn medium(&self) -> &str {
        &self.medium
    }

    pub fn campaign(&self) -> &str {
        &self.campaign
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Canonical `key=value&...` encoding
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Canonical encoding as the bytes written into the stub
    pub fn as_bytes(&self) -> &[u8] {
        self.canonical.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

impl fmt::Display for AttributionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Form-decode one key or value: `+` is a space, then `%XX` escapes.
fn form_decode(component: &str) -> String {
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Form-encode a value for canonical output.
fn form_encode(value: &str) -> String {
    utf8_percent_encode(value, FORM_VALUE_ESCAPE_SET)
        .to_string()
        .replace(' ', "+")
}

/// Split a decoded query into `(key, value)` pairs, in input order.
fn parse_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((key, value)) => (form_decode(key), form_decode(value)),
            None => (form_decode(segment), String::new()),
        })
        .collect()
}

/// Validate a raw attribution code and produce its canonical form.
///
/// Fails with [`AttributionError::CodeTooLong`] when the encoded input exceeds
/// [`MAX_RAW_CODE_LEN`], and with [`AttributionError::InvalidKeys`] unless every
/// required key appears exactly once and nothing else does.
pub fn validate(raw_code: &str) -> Result<AttributionCode> {
    let char_count = raw_code.chars().count();
    if char_count > MAX_RAW_CODE_LEN {
        warn!(
            "Rejected attribution code: {} characters exceeds {}",
            char_count, MAX_RAW_CODE_LEN
        );
        return Err(AttributionError::CodeTooLong(char_count));
    }

    // Outer layer only; `+` survives so the pair parser can treat it as a space
    let unescaped = percent_decode_str(raw_code).decode_utf8_lossy();
    let pairs = parse_pairs(&unescaped);

    let mut values: [Option<String>; 4] = Default::default();
    for (key, value) in pairs {
        let Some(slot) = REQUIRED_KEYS.iter().position(|k| *k == key) else {
            warn!("Rejected attribution code: unexpected key {key:?}");
            return Err(AttributionError::InvalidKeys(format!("unexpected key {key:?}")));
        };
        if values[slot].is_some() {
            warn!("Rejected attribution code: duplicate key {key:?}");
            return Err(AttributionError::InvalidKeys(format!("duplicate key {key:?}")));
        }
        values[slot] = Some(value);
    }

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .zip(values.iter())
        .filter(|(_, v)| v.is_none())
        .map(|(k, _)| *k)
        .collect();
    if !missing.is_empty() {
        warn!("Rejected attribution code: missing keys {missing:?}");
        return Err(AttributionError::InvalidKeys(format!(
            "missing keys: {}",
            missing.join(", ")
        )));
    }

    let [source, medium, campaign, content] = values.map(Option::unwrap_or_default);

    let canonical = REQUIRED_KEYS
        .iter()
        .zip([&source, &medium, &campaign, &content])
        .map(|(key, value)| format!("{key}={}", form_encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    debug!("Canonical attribution code: {}", canonical);

    Ok(AttributionCode {
        source,
        medium,
        campaign,
        content,
        canonical,
    })
}
