//! Access to candidate file contents
//!
//! The entry index never touches the disk directly; it reads through a
//! [`FileSource`]. [`DiskSource`] is used in production, [`MemoryFS`] lets
//! tests and embedders build a repository without a real directory tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Error, Result};

/// Contents and on-disk mode of one candidate file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
    /// Permission bits, when the source knows them
    pub mode: Option<u32>,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            mode: Some(0o644),
        }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Get file size in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Trait for reading candidate files - allows swapping the disk out in tests
pub trait FileSource: Send + Sync {
    /// Read the full contents and mode of a file
    fn read(&self, path: &Path) -> Result<File>;

    /// Whether `path` names a directory
    fn is_dir(&self, path: &Path) -> bool;

    fn exists(&self, path: &Path) -> bool;

    /// Create or replace a file, creating parent directories as needed
    fn write(&self, path: &Path, content: &[u8]) -> Result<()>;

    fn remove(&self, path: &Path) -> Result<()>;
}

/// Reads candidate files from the host filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSource;

impl FileSource for DiskSource {
    fn read(&self, path: &Path) -> Result<File> {
        let content = fs::read(path)?;
        let mode = file_mode(&fs::metadata(path)?);
        Ok(File { content, mode })
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

/// In-memory filesystem usable as a [`FileSource`]
///
/// Interior mutability lets a test change files while a repository holds a
/// shared reference to the source.
#[derive(Debug, Default)]
pub struct MemoryFS {
    files: RwLock<BTreeMap<PathBuf, File>>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a file
    pub fn add_file<P: AsRef<Path>>(&self, path: P, file: File) -> Result<()> {
        let mut files = self
            .files
            .write()
            .map_err(|_| Error::poisoned("memory filesystem"))?;
        files.insert(path.as_ref().to_path_buf(), file);
        Ok(())
    }

    /// Add a file with string content
    pub fn add_file_string<P: AsRef<Path>>(&self, path: P, content: &str) -> Result<()> {
        self.add_file(path, File::from_string(content))
    }

    /// Remove a file
    pub fn remove_file<P: AsRef<Path>>(&self, path: P) -> Result<Option<File>> {
        let mut files = self
            .files
            .write()
            .map_err(|_| Error::poisoned("memory filesystem"))?;
        Ok(files.remove(path.as_ref()))
    }

    /// Check if a file exists
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(path.as_ref()))
            .unwrap_or(false)
    }

    /// List all files in path order
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.files
            .read()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl FileSource for MemoryFS {
    fn read(&self, path: &Path) -> Result<File> {
        let files = self
            .files
            .read()
            .map_err(|_| Error::poisoned("memory filesystem"))?;
        files.get(path).cloned().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            ))
        })
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .read()
            .map(|files| files.keys().any(|p| p != path && p.starts_with(path)))
            .unwrap_or(false)
    }

    fn exists(&self, path: &Path) -> bool {
        MemoryFS::exists(self, path)
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        self.add_file(path, File::new(content.to_vec()))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.remove_file(path)?.map(|_| ()).ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            ))
        })
    }
}
