//! Error types for stubattr

use std::fmt;

/// Main error type for attribution operations
#[derive(Debug)]
pub enum AttributionError {
    /// Buffer too short, unknown optional header magic, or certificate
    /// window outside the buffer
    MalformedImage(String),

    /// Certificate directory offset or size is zero
    Unsigned,

    /// Reserved tag absent from the certificate window
    TagNotFound,

    /// Raw attribution code longer than the accepted limit (carries the length)
    CodeTooLong(usize),

    /// Decoded key set is not exactly the required keys
    InvalidKeys(String),

    /// Canonical code does not fit the reserved payload space (carries the length)
    PayloadTooLarge(usize),

    /// IO error
    IoError(std::io::Error),

    /// JSON serialization error
    JsonError(serde_json::Error),

    /// Generic error with message
    Generic(String),
}

impl AttributionError {
    /// Short, stable name of the error kind, used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            AttributionError::MalformedImage(_) => "MalformedImage",
            AttributionError::Unsigned => "Unsigned",
            AttributionError::TagNotFound => "TagNotFound",
            AttributionError::CodeTooLong(_) => "CodeTooLong",
            AttributionError::InvalidKeys(_) => "InvalidKeys",
            AttributionError::PayloadTooLarge(_) => "PayloadTooLarge",
            AttributionError::IoError(_) => "IoError",
            AttributionError::JsonError(_) => "JsonError",
            AttributionError::Generic(_) => "Generic",
        }
    }
}

impl fmt::Display for AttributionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributionError::MalformedImage(msg) => write!(f, "Malformed image: {msg}"),
            AttributionError::Unsigned => write!(f, "Image is not signed"),
            AttributionError::TagNotFound => {
                write!(f, "Certificate table does not contain the attribution tag")
            }
            AttributionError::CodeTooLong(len) => {
                write!(f, "Attribution code too long: {len} characters")
            }
            AttributionError::InvalidKeys(msg) => {
                write!(f, "Attribution code contains invalid or is missing keys: {msg}")
            }
            AttributionError::PayloadTooLarge(len) => {
                write!(f, "Attribution payload too large: {len} bytes")
            }
            AttributionError::IoError(err) => write!(f, "IO error: {err}"),
            AttributionError::JsonError(err) => write!(f, "JSON error: {err}"),
            AttributionError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for AttributionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttributionError::IoError(err) => Some(err),
            AttributionError::JsonError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AttributionError {
    fn from(err: std::io::Error) -> Self {
        AttributionError::IoError(err)
    }
}

impl From<serde_json::Error> for AttributionError {
    fn from(err: serde_json::Error) -> Self {
        AttributionError::JsonError(err)
    }
}

impl From<anyhow::Error> for AttributionError {
    fn from(err: anyhow::Error) -> Self {
        // Keep the typed error when the anyhow chain wraps one of ours
        let err = match err.downcast::<AttributionError>() {
            Ok(inner) => return inner,
            Err(err) => err,
        };

        // IO failures keep their kind, with the context chain as the message
        if let Some(io_err) = err.root_cause().downcast_ref::<std::io::Error>() {
            return AttributionError::IoError(std::io::Error::new(
                io_err.kind(),
                format!("{err:#}"),
            ));
        }

        AttributionError::Generic(format!("{err:#}"))
    }
}

/// Result type for attribution operations
pub type Result<T> = std::result::Result<T, AttributionError>;
