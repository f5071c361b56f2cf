//! Ordered-attempt text decoding.
//!
//! Source files are mostly UTF-8, but older ones were saved as Latin-1. The
//! decoder tries each configured encoding in order and reports which one
//! succeeded, so the caller never has to branch on a failed attempt.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("not valid in any of: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", "))]
    Undecodable(Vec<TextEncoding>),
    #[error("unknown encoding: {0}")]
    Unknown(String),
}

/// A supported source text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value, so
    /// decoding never fails.
    Latin1,
}

impl TextEncoding {
    /// Attempt to decode `bytes`. `None` when the bytes are invalid.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => f.write_str("utf-8"),
            TextEncoding::Latin1 => f.write_str("latin-1"),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(DecodeError::Unknown(other.to_string())),
        }
    }
}

/// Decode `bytes` with the first encoding in `order` that accepts them.
pub fn decode(bytes: &[u8], order: &[TextEncoding]) -> Result<(String, TextEncoding), DecodeError> {
    order
        .iter()
        .find_map(|&enc| enc.decode(bytes).map(|text| (text, enc)))
        .ok_or_else(|| DecodeError::Undecodable(order.to_vec()))
}
