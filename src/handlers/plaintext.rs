//! Plain files: the content is the file itself

use crate::candidate::CandidateFile;
use crate::entry::{AbstractEntry, Data};
use crate::error::Result;
use crate::handlers::{Generator, Handler, Role};
use crate::metadata::ClientMetadata;

/// Serves the candidate's bytes unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextGenerator;

impl Handler for PlaintextGenerator {
    fn name(&self) -> &'static str {
        "PlaintextGenerator"
    }

    fn ignore(&self) -> &'static [&'static str] {
        &["swp", "swx", "bak", "orig", "rej", "tmp"]
    }

    fn role(&self) -> Role<'_> {
        Role::Generator(self)
    }
}

impl Generator for PlaintextGenerator {
    fn generate(&self, file: &CandidateFile, _entry: &AbstractEntry, _client: &ClientMetadata) -> Result<Data> {
        Ok(Data::Bytes(file.data.clone()))
    }
}
