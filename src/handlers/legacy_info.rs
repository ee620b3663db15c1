//! Legacy `info` and `:info` metadata files
//!
//! One `key: value` pair per line. Superseded by `info.xml`.

use std::collections::BTreeMap;

use crate::candidate::CandidateFile;
use crate::entry::AbstractEntry;
use crate::error::{Error, Result};
use crate::handlers::{Handler, Info, Role};
use crate::metadata::ClientMetadata;

#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyInfo;

impl Handler for LegacyInfo {
    fn name(&self) -> &'static str {
        "LegacyInfo"
    }

    fn basenames(&self) -> &'static [&'static str] {
        &["info", ":info"]
    }

    fn specific(&self) -> bool {
        false
    }

    fn deprecated(&self) -> bool {
        true
    }

    fn role(&self) -> Role<'_> {
        Role::Info(self)
    }

    fn check(&self, file: &CandidateFile) -> Result<()> {
        parse_info(file).map(|_| ())
    }
}

impl Info for LegacyInfo {
    fn info(
        &self,
        file: &CandidateFile,
        _entry: &AbstractEntry,
        _client: &ClientMetadata,
    ) -> Result<BTreeMap<String, String>> {
        parse_info(file)
    }
}

fn parse_info(file: &CandidateFile) -> Result<BTreeMap<String, String>> {
    let mut info = BTreeMap::new();
    for (number, line) in file.text().lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(Error::InfoFile {
                path: file.path.display().to_string(),
                message: format!("line {}: expected 'key: value'", number + 1),
            });
        };
        let key = match key.trim().to_ascii_lowercase().as_str() {
            "mode" => "perms".to_string(),
            other => other.to_string(),
        };
        info.insert(key, value.trim().to_string());
    }
    Ok(info)
}
