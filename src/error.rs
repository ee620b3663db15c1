//! # Error Handling
//!
//! This module defines the centralized error type for `cfg-repo`. It uses the
//! `thiserror` library to build a single `Error` enum that covers every
//! failure the repository can report, from filename parsing at index time to
//! the individual stages of the binding pipeline.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Some variants are fatal to a single binding
//!   call (`MissingGenerator`, `VerificationFailure`, `EncodingFailure`,
//!   `Generator`), others are diagnostics that the entry index records and
//!   logs while it carries on (`MalformedSpecificity`, `UnclassifiedFile`,
//!   `DuplicateCandidate`, `AmbiguousInfo`, `AmbiguousVerifier`).
//!
//! - **`EncodingFailureKind`**: Distinguishes the reasons the encode stage can
//!   refuse a payload.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Index maintenance never fails the index itself: a bad file produces a
//! logged `Error` value for that file only. Binding errors are scoped to the
//! call that produced them.

use std::fmt;

use thiserror::Error;

/// Why the encode stage refused to turn bytes into entry text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFailureKind {
    /// The bytes are not valid in the configured source encoding.
    Decode,
    /// The bytes are binary; the entry must request base64 transport.
    Base64Required,
}

impl fmt::Display for EncodingFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingFailureKind::Decode => write!(f, "decode error"),
            EncodingFailureKind::Base64Required => write!(f, "missing base64 declaration"),
        }
    }
}

/// Main error type for cfg-repo operations
#[derive(Error, Debug)]
pub enum Error {
    /// A filename carried a specificity token that could not be parsed,
    /// e.g. `motd.Gxx_web` or `motd.H_`.
    #[error("Malformed specificity in {filename}: {message}")]
    MalformedSpecificity { filename: String, message: String },

    /// No registered handler claims or ignores the file.
    #[error("Unclassified file in {basename}: no handler claims {filename}")]
    UnclassifiedFile { basename: String, filename: String },

    /// A second "created" event arrived for a file that is already indexed.
    #[error("Duplicate candidate {filename}: already indexed, keeping the original")]
    DuplicateCandidate { filename: String },

    /// No generator applies to the requesting client.
    #[error("No generator found for {entry}")]
    MissingGenerator { entry: String },

    /// More than one info file applies to the requesting client.
    #[error("More than one info supplier found for {entry}: {}", candidates.join(", "))]
    AmbiguousInfo {
        entry: String,
        candidates: Vec<String>,
    },

    /// More than one equally specific verifier of the same type applies.
    #[error("Ambiguous {verifier} verifiers for {entry}: {}", candidates.join(", "))]
    AmbiguousVerifier {
        entry: String,
        verifier: String,
        candidates: Vec<String>,
    },

    /// Equally specific generators compete for the same client.
    #[error("Ambiguous generators for {entry}: {}", candidates.join(", "))]
    AmbiguousGenerator {
        entry: String,
        candidates: Vec<String>,
    },

    /// A verifier rejected the bound data.
    #[error("Data for {entry} for {client} failed to verify: {message}")]
    VerificationFailure {
        entry: String,
        client: String,
        message: String,
    },

    /// The encode stage could not produce entry text.
    #[error("Failed to encode {entry} ({kind}): {message}\n  hint: request base64 transport for {entry}")]
    EncodingFailure {
        entry: String,
        kind: EncodingFailureKind,
        message: String,
    },

    /// A generator or filter failed to produce data.
    #[error("Exception rendering {entry} with {handler}: {message}")]
    Generator {
        entry: String,
        handler: String,
        message: String,
    },

    /// An error occurred during template rendering.
    ///
    /// May include the name of the problematic variable when applicable.
    #[error("Template processing error: {message}{}", variable.as_ref().map(|v| format!(" (variable: {})", v)).unwrap_or_default())]
    Template {
        message: String,
        /// The template variable that caused the error, if applicable
        variable: Option<String>,
    },

    /// An info file (`info.xml`, `info`, `:info`) could not be understood.
    #[error("Invalid info file {path}: {message}")]
    InfoFile { path: String, message: String },

    /// Writing pulled data back into the repository failed.
    #[error("Cannot accept pulled data for {entry}: {message}")]
    Pull { entry: String, message: String },

    /// The requested entry has no directory in the repository.
    #[error("Unknown entry: {entry}")]
    UnknownEntry { entry: String },

    /// The settings file is invalid.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error indicating that a lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A TOML parsing error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A directory traversal error, wrapped from `walkdir::Error`.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error is a diagnostic that never aborts processing.
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            Error::MalformedSpecificity { .. }
                | Error::UnclassifiedFile { .. }
                | Error::DuplicateCandidate { .. }
                | Error::AmbiguousInfo { .. }
                | Error::AmbiguousVerifier { .. }
                | Error::AmbiguousGenerator { .. }
        )
    }

    pub(crate) fn poisoned(context: impl Into<String>) -> Self {
        Error::LockPoisoned {
            context: context.into(),
        }
    }
}
