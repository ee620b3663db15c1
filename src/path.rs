//! Path manipulation utilities for cfg-repo
//!
//! An entry named `/etc/ssh/sshd_config` lives in the directory
//! `<root>/etc/ssh/sshd_config/`, whose last component is the basename every
//! candidate file inside it starts with.

use std::path::{Component, Path, PathBuf};

/// Entry name for an entry directory, or `None` for the root itself and for
/// paths outside the root.
pub fn entry_name_for_dir(root: &Path, dir: &Path) -> Option<String> {
    let relative = dir.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(format!("/{}", parts.join("/")))
    }
}

/// Directory holding the candidates for an entry name.
pub fn dir_for_entry(root: &Path, name: &str) -> PathBuf {
    name.split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .fold(root.to_path_buf(), |dir, part| dir.join(part))
}

/// Basename for an entry name: its last path component.
pub fn basename_of(name: &str) -> &str {
    name.rsplit('/').find(|part| !part.is_empty()).unwrap_or(name)
}

/// Whether `name` is `prefix` or lies below it, comparing whole components.
pub fn is_at_or_below(name: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    name == prefix || (name.starts_with(prefix) && name[prefix.len()..].starts_with('/'))
}
