//! # Settings
//!
//! This module defines the `cfg-repo.toml` settings file and the logic for
//! loading it.
//!
//! ```toml
//! repository = "/var/lib/cfg-repo/Cfg"
//! encoding = "utf-8"
//! validate = true
//!
//! [defaults]
//! owner = "root"
//! group = "wheel"
//! perms = "0640"
//! ```
//!
//! Every key is optional. The `[defaults]` table is merged over the built-in
//! default file metadata, so it only needs to list what differs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::encoding::SourceEncoding;
use crate::error::{Error, Result};

/// Parsed settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Root directory of the Cfg tree.
    #[serde(default = "defaults::default_repository")]
    pub repository: PathBuf,
    /// Encoding the repository's files are stored in.
    #[serde(default = "defaults::default_encoding")]
    pub encoding: String,
    /// Whether verifiers run during binding.
    #[serde(default = "defaults::default_validate")]
    pub validate: bool,
    /// Overrides of the built-in default file metadata.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repository: defaults::default_repository(),
            encoding: defaults::default_encoding(),
            validate: defaults::default_validate(),
            defaults: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Parse settings from a TOML string and validate them.
    pub fn parse(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a file.
    ///
    /// A relative `repository` is resolved against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut settings = Self::parse(&content)?;
        if settings.repository.is_relative() {
            if let Some(parent) = path.parent() {
                settings.repository = parent.join(&settings.repository);
            }
        }
        Ok(settings)
    }

    /// Check values serde cannot check for us.
    pub fn validate(&self) -> Result<()> {
        self.source_encoding()?;
        if let Some(key) = self.defaults.keys().find(|k| k.trim().is_empty()) {
            return Err(Error::Config {
                message: format!("invalid default attribute name '{}'", key),
                hint: None,
            });
        }
        Ok(())
    }

    pub fn source_encoding(&self) -> Result<SourceEncoding> {
        self.encoding.parse()
    }

    /// Built-in default file metadata with the `[defaults]` overrides applied.
    pub fn file_metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = defaults::default_file_metadata();
        metadata.extend(self.defaults.clone());
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.validate);
        assert_eq!(settings.source_encoding().unwrap(), SourceEncoding::Utf8);
    }

    #[test]
    fn test_parse_full() {
        let settings = Settings::parse(
            r#"
repository = "/srv/cfg"
encoding = "latin-1"
validate = false

[defaults]
group = "wheel"
perms = "0640"
"#,
        )
        .unwrap();
        assert_eq!(settings.repository, PathBuf::from("/srv/cfg"));
        assert!(!settings.validate);
        let metadata = settings.file_metadata();
        assert_eq!(metadata["group"], "wheel");
        assert_eq!(metadata["perms"], "0640");
        assert_eq!(metadata["owner"], "root");
    }

    #[test]
    fn test_unknown_encoding_is_rejected() {
        let err = Settings::parse(r#"encoding = "ebcdic""#).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = Settings::parse(r#"validation = true"#).unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_from_file_resolves_relative_repository() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg-repo.toml");
        std::fs::write(&path, "repository = \"Cfg\"\n").unwrap();
        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.repository, dir.path().join("Cfg"));
    }
}
