//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a Cfg tree fixture and helpers to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = CfgFixture::new().with_file("etc/motd/motd", "hello\n");
//!     let repository = fixture.repository();
//!     // ... test code
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use assert_fs::prelude::*;
use assert_fs::TempDir;

use cfg_repo::filesystem::DiskSource;
use cfg_repo::handlers::HandlerRegistry;
use cfg_repo::metadata::ClientMetadata;
use cfg_repo::repository::CfgRepository;
use cfg_repo::stages::BindOptions;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{client, CfgFixture};
}

/// A client in the given groups, all at priority 0 unless written `name:prio`.
#[allow(dead_code)]
pub fn client(host: &str, groups: &[&str]) -> ClientMetadata {
    groups.iter().fold(ClientMetadata::new(host), |client, group| {
        match group.split_once(':') {
            Some((name, prio)) => client.with_group(name, prio.parse().unwrap()),
            None => client.with_group(*group, 0),
        }
    })
}

/// A temporary directory holding a Cfg tree under `Cfg/` and, optionally,
/// a `cfg-repo.toml` next to it.
pub struct CfgFixture {
    pub temp: TempDir,
}

#[allow(dead_code)]
impl CfgFixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        temp.child("Cfg").create_dir_all().unwrap();
        Self { temp }
    }

    /// Add a file below the Cfg root.
    pub fn with_file(self, relative: &str, content: &str) -> Self {
        self.temp.child("Cfg").child(relative).write_str(content).unwrap();
        self
    }

    /// Add a file with raw bytes below the Cfg root.
    pub fn with_binary(self, relative: &str, content: &[u8]) -> Self {
        self.temp.child("Cfg").child(relative).write_binary(content).unwrap();
        self
    }

    /// Add an executable script below the Cfg root.
    #[cfg(unix)]
    pub fn with_script(self, relative: &str, script: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;
        let child = self.temp.child("Cfg").child(relative);
        child.write_str(script).unwrap();
        std::fs::set_permissions(child.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        self
    }

    /// Write `cfg-repo.toml` in the fixture directory.
    pub fn with_settings(self, content: &str) -> Self {
        self.temp.child("cfg-repo.toml").write_str(content).unwrap();
        self
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn root(&self) -> std::path::PathBuf {
        self.temp.path().join("Cfg")
    }

    /// Load a repository over the fixture with the built-in handlers.
    pub fn repository(&self) -> CfgRepository {
        self.repository_with(HandlerRegistry::builtin(), BindOptions::default())
    }

    pub fn repository_with(&self, registry: HandlerRegistry, options: BindOptions) -> CfgRepository {
        let repository = CfgRepository::with_source(self.root(), Arc::new(DiskSource), registry, options);
        repository.load().unwrap();
        repository
    }
}
