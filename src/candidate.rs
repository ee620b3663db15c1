//! Candidate files
//!
//! A [`CandidateFile`] is one on-disk source in an entry directory together
//! with the handler that claimed it. The entry index owns every candidate;
//! handlers are shared, stateless behaviour and only ever see a candidate by
//! reference for the duration of a call.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::encoding::SourceEncoding;
use crate::filesystem::File;
use crate::grammar::ParsedName;
use crate::handlers::{Handler, HandlerRole};
use crate::specificity::Specificity;

/// One indexed source file
#[derive(Clone)]
pub struct CandidateFile {
    /// Filename within the entry directory
    pub filename: String,
    /// Full path of the file
    pub path: PathBuf,
    /// Basename the filename was parsed against
    pub basename: String,
    pub specificity: Specificity,
    pub extension: Option<String>,
    /// Raw file contents
    pub data: Vec<u8>,
    /// Encoding the contents are stored in
    pub encoding: SourceEncoding,
    /// On-disk permission bits, used for inherited permissions
    pub mode: Option<u32>,
    /// Registration order within the entry set
    pub sequence: u64,
    handler: Arc<dyn Handler>,
}

impl CandidateFile {
    pub(crate) fn new(
        path: PathBuf,
        filename: &str,
        parsed: ParsedName,
        handler: Arc<dyn Handler>,
        file: File,
        encoding: SourceEncoding,
        sequence: u64,
    ) -> Self {
        Self {
            filename: filename.to_string(),
            path,
            basename: parsed.basename,
            specificity: parsed.specificity,
            extension: parsed.extension,
            data: file.content,
            encoding,
            mode: file.mode,
            sequence,
            handler,
        }
    }

    /// Replace the contents in place after a "changed" event.
    pub(crate) fn update(&mut self, file: File) {
        self.data = file.content;
        self.mode = file.mode;
    }

    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }

    pub fn handler_name(&self) -> &'static str {
        self.handler.name()
    }

    pub fn role(&self) -> HandlerRole {
        self.handler.role().kind()
    }

    pub fn deprecated(&self) -> bool {
        self.handler.deprecated()
    }

    /// Contents as text in the candidate's encoding, lossily.
    pub fn text(&self) -> String {
        self.encoding
            .decode(&self.data)
            .unwrap_or_else(|_| String::from_utf8_lossy(&self.data).into_owned())
    }
}

impl fmt::Debug for CandidateFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateFile")
            .field("filename", &self.filename)
            .field("handler", &self.handler.name())
            .field("specificity", &self.specificity)
            .field("size", &self.data.len())
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl fmt::Display for CandidateFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.handler.name(), self.filename)
    }
}
