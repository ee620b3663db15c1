//! Filesystem events
//!
//! The repository is kept current by a stream of [`FileEvent`]s. Any
//! notification transport can produce them; [`PseudoMonitor`] is the
//! static one, which walks the tree once and reports every file as
//! existing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Kind of change reported for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCode {
    /// Present when monitoring started
    Exists,
    Created,
    Changed,
    Deleted,
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventCode::Exists => write!(f, "exists"),
            EventCode::Created => write!(f, "created"),
            EventCode::Changed => write!(f, "changed"),
            EventCode::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for EventCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exists" => Ok(EventCode::Exists),
            "created" => Ok(EventCode::Created),
            "changed" => Ok(EventCode::Changed),
            "deleted" => Ok(EventCode::Deleted),
            other => Err(Error::Config {
                message: format!("unknown event code '{}'", other),
                hint: Some("expected exists, created, changed or deleted".to_string()),
            }),
        }
    }
}

/// One change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub code: EventCode,
    pub path: PathBuf,
}

impl FileEvent {
    pub fn new(code: EventCode, path: impl Into<PathBuf>) -> Self {
        Self {
            code,
            path: path.into(),
        }
    }

    pub fn exists(path: impl Into<PathBuf>) -> Self {
        Self::new(EventCode::Exists, path)
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(EventCode::Created, path)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::new(EventCode::Changed, path)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(EventCode::Deleted, path)
    }
}

impl fmt::Display for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.path.display())
    }
}

/// Static monitor: one `Exists` event per file under a root
#[derive(Debug, Clone)]
pub struct PseudoMonitor {
    root: PathBuf,
}

impl PseudoMonitor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root in sorted order and report every regular file.
    ///
    /// Hidden directories (`.git`, `.svn`) are skipped entirely.
    pub fn scan(&self) -> Result<Vec<FileEvent>> {
        let mut events = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden_dir(e));
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() {
                events.push(FileEvent::exists(entry.path()));
            }
        }
        debug!("Found {} files under {}", events.len(), self.root.display());
        Ok(events)
    }
}

fn is_hidden_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_event_code_round_trip_names() {
        for code in [
            EventCode::Exists,
            EventCode::Created,
            EventCode::Changed,
            EventCode::Deleted,
        ] {
            assert_eq!(code.to_string().parse::<EventCode>().unwrap(), code);
        }
        assert!("moved".parse::<EventCode>().is_err());
    }

    #[test]
    fn test_scan_is_sorted_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let motd = dir.path().join("etc/motd");
        fs::create_dir_all(&motd).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(motd.join("motd.H_web01"), "host").unwrap();
        fs::write(motd.join("motd"), "default").unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();

        let events = PseudoMonitor::new(dir.path()).scan().unwrap();
        let paths: Vec<_> = events.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec![motd.join("motd"), motd.join("motd.H_web01")]);
        assert!(events.iter().all(|e| e.code == EventCode::Exists));
    }

    #[test]
    fn test_display() {
        let event = FileEvent::deleted("/repo/etc/motd/motd");
        assert_eq!(event.to_string(), "deleted /repo/etc/motd/motd");
    }
}
