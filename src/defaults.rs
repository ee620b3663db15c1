//! Default values for cfg-repo configuration.
//!
//! This module provides centralized default values used across the library
//! and the commands, ensuring consistency and avoiding duplication.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Name of the settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "cfg-repo.toml";

/// Environment variable naming an explicit settings file.
pub const SETTINGS_ENV: &str = "CFG_REPO_CONFIG";

/// Default repository root, relative to the working directory.
pub fn default_repository() -> PathBuf {
    PathBuf::from("Cfg")
}

/// Default source encoding name.
pub fn default_encoding() -> String {
    "utf-8".to_string()
}

pub fn default_validate() -> bool {
    true
}

/// Built-in file metadata applied to every entry before its info file.
///
/// Keys beginning with `__` are internal and never copied onto entries.
pub fn default_file_metadata() -> BTreeMap<String, String> {
    [
        ("owner", "root"),
        ("group", "root"),
        ("perms", "0644"),
        ("important", "false"),
        ("paranoid", "false"),
        ("sensitive", "false"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Returns the per-user settings file location.
///
/// - Linux: `~/.config/cfg-repo/cfg-repo.toml`
/// - macOS: `~/Library/Application Support/cfg-repo/cfg-repo.toml`
///
/// `None` when the platform config directory cannot be determined.
pub fn user_settings_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cfg-repo").join(SETTINGS_FILE))
}
