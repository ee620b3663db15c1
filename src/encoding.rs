//! Source encodings understood by the repository

use std::fmt;
use std::str::FromStr;

use crate::error::{EncodingFailureKind, Error};

/// Character encoding of the files stored in the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceEncoding {
    #[default]
    Utf8,
    Ascii,
    Latin1,
}

impl SourceEncoding {
    /// Decode `bytes` into text.
    ///
    /// Binary data (anything containing NUL) is refused with
    /// [`EncodingFailureKind::Base64Required`] even when it happens to decode,
    /// because it cannot travel as entry text.
    pub fn decode(&self, bytes: &[u8]) -> std::result::Result<String, (EncodingFailureKind, String)> {
        if bytes.contains(&0) {
            return Err((
                EncodingFailureKind::Base64Required,
                "data contains NUL bytes".to_string(),
            ));
        }
        match self {
            SourceEncoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| (EncodingFailureKind::Decode, e.to_string())),
            SourceEncoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(pos) => Err((
                    EncodingFailureKind::Decode,
                    format!("byte 0x{:02x} at offset {} is not ascii", bytes[pos], pos),
                )),
                None => Ok(bytes.iter().map(|&b| b as char).collect()),
            },
            SourceEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// Encode text for writing back to the repository; `None` when a
    /// character has no representation.
    pub fn encode(&self, text: &str) -> Option<Vec<u8>> {
        match self {
            SourceEncoding::Utf8 => Some(text.as_bytes().to_vec()),
            SourceEncoding::Ascii => text.is_ascii().then(|| text.as_bytes().to_vec()),
            SourceEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).ok())
                .collect(),
        }
    }
}

impl FromStr for SourceEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(SourceEncoding::Utf8),
            "ascii" | "us-ascii" => Ok(SourceEncoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(SourceEncoding::Latin1),
            other => Err(Error::Config {
                message: format!("unknown encoding '{}'", other),
                hint: Some("use utf-8, ascii or latin-1".to_string()),
            }),
        }
    }
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceEncoding::Utf8 => write!(f, "utf-8"),
            SourceEncoding::Ascii => write!(f, "ascii"),
            SourceEncoding::Latin1 => write!(f, "latin-1"),
        }
    }
}
