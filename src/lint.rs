//! Repository lint
//!
//! Reports candidate files that still work but use deprecated handlers.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::repository::CfgRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LintCode {
    CatFileUsed,
    DiffFileUsed,
    DeprecatedInfoFile,
}

impl fmt::Display for LintCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintCode::CatFileUsed => write!(f, "cat-file-used"),
            LintCode::DiffFileUsed => write!(f, "diff-file-used"),
            LintCode::DeprecatedInfoFile => write!(f, "deprecated-info-file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintFinding {
    pub code: LintCode,
    pub entry: String,
    pub filename: String,
    pub message: String,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}/{}: {}", self.code, self.entry, self.filename, self.message)
    }
}

/// Findings for every indexed entry, in entry then registration order
pub fn lint(repository: &CfgRepository) -> Result<Vec<LintFinding>> {
    let mut findings = Vec::new();
    for name in repository.entry_names()? {
        let Some(set) = repository.entry_set(&name)? else {
            continue;
        };
        let snapshot = set.snapshot()?;
        for candidate in snapshot.candidates() {
            let (code, message) = match candidate.handler_name() {
                "CatFilter" => (LintCode::CatFileUsed, "cat files are deprecated; use a template instead"),
                "DiffFilter" => (LintCode::DiffFileUsed, "diff files are deprecated; use a template instead"),
                "LegacyInfo" => (LintCode::DeprecatedInfoFile, "info and :info files are deprecated; use info.xml"),
                _ => continue,
            };
            findings.push(LintFinding {
                code,
                entry: name.clone(),
                filename: candidate.filename.clone(),
                message: message.to_string(),
            });
        }
    }
    Ok(findings)
}
