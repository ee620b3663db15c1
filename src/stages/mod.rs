//! The five stages of binding an entry for a client.
//!
//! ## Overview
//!
//! 1. Info - default attributes, overlaid with the best info file
//! 2. Generate - initial content from the single most specific generator
//! 3. Filter - every applicable filter, least specific first
//! 4. Verify - the most specific verifier of each type (when enabled)
//! 5. Encode - entry text, base64 or an explicit empty marker
//!
//! Each stage reads the same [`EntrySnapshot`] and a working copy of the
//! entry. Any stage's error ends the bind; [`pipeline::bind`] only writes to
//! the caller's entry once every stage has succeeded.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::warn;

use crate::candidate::CandidateFile;
use crate::config::Settings;
use crate::defaults;
use crate::encoding::SourceEncoding;
use crate::error::{Error, Result};
use crate::index::EntrySnapshot;
use crate::metadata::ClientMetadata;

pub mod encode;
pub mod filter;
pub mod generate;
pub mod info;
pub mod pipeline;
pub mod verify;

pub use encode as stage5;
pub use filter as stage3;
pub use generate as stage2;
pub use info as stage1;
pub use verify as stage4;

/// Settings that shape a bind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOptions {
    /// Run verifiers
    pub validate: bool,
    /// Encoding used to turn generated bytes into entry text
    pub encoding: SourceEncoding,
    /// Attributes every entry starts from
    pub defaults: BTreeMap<String, String>,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            validate: defaults::default_validate(),
            encoding: SourceEncoding::default(),
            defaults: defaults::default_file_metadata(),
        }
    }
}

impl BindOptions {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            validate: settings.validate,
            encoding: settings.source_encoding()?,
            defaults: settings.file_metadata(),
        })
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

/// State shared by the stages of one bind
pub struct BindContext<'a, 's> {
    pub snapshot: &'a EntrySnapshot<'s>,
    pub client: &'a ClientMetadata,
    pub options: &'a BindOptions,
    /// Non-fatal problems found so far
    pub diagnostics: Vec<String>,
}

impl<'a, 's> BindContext<'a, 's> {
    pub fn new(snapshot: &'a EntrySnapshot<'s>, client: &'a ClientMetadata, options: &'a BindOptions) -> Self {
        Self {
            snapshot,
            client,
            options,
            diagnostics: Vec::new(),
        }
    }

    /// Log a non-fatal error and keep it for the bound result
    pub fn diagnostic(&mut self, error: Error) {
        warn!("Cfg: {}", error);
        self.diagnostics.push(error.to_string());
    }
}

/// Outcome of picking the most specific candidate
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub winner: &'a CandidateFile,
    /// Every candidate sharing the winner's rank, by filename; the winner
    /// is the first
    pub tied: Vec<&'a CandidateFile>,
}

impl Selection<'_> {
    /// More than one candidate shares the top rank
    pub fn is_ambiguous(&self) -> bool {
        self.tied.len() > 1
    }

    pub fn tied_names(&self) -> Vec<String> {
        self.tied.iter().map(|c| c.filename.clone()).collect()
    }
}

/// Pick the most specific of `candidates` that applies to `client`.
///
/// Hosts beat groups, groups beat the default, and the higher group
/// priority wins. Candidates that share the top rank are a configuration
/// error; the one with the smallest filename is chosen so the result is
/// deterministic, and the tie is reported through [`Selection::tied`].
pub fn select_most_specific<'a>(candidates: &[&'a CandidateFile], client: &ClientMetadata) -> Option<Selection<'a>> {
    let applicable: Vec<&'a CandidateFile> = candidates
        .iter()
        .copied()
        .filter(|c| c.specificity.matches(client))
        .collect();
    let top = applicable.iter().map(|c| c.specificity.rank()).max()?;
    let mut tied: Vec<&'a CandidateFile> = applicable
        .into_iter()
        .filter(|c| c.specificity.rank() == top)
        .collect();
    tied.sort_by(|a, b| a.filename.cmp(&b.filename));
    Some(Selection {
        winner: tied[0],
        tied,
    })
}

/// Least specific first, then by filename
pub fn specificity_order(a: &CandidateFile, b: &CandidateFile) -> Ordering {
    a.specificity
        .rank()
        .cmp(&b.specificity.rank())
        .then_with(|| a.filename.cmp(&b.filename))
}
