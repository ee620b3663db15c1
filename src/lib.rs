//! # Cfg Repository Library
//!
//! This library implements a specificity-ranked repository of configuration
//! files. Each configuration entry (say `/etc/motd`) is a directory holding
//! any number of candidate files, and binding the entry for a client picks
//! and combines the candidates that apply to that client.
//!
//! It is designed to be used by the `cfg-repo` command-line tool but can
//! also be embedded in a configuration server.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use cfg_repo::entry::AbstractEntry;
//! use cfg_repo::filesystem::MemoryFS;
//! use cfg_repo::handlers::HandlerRegistry;
//! use cfg_repo::metadata::ClientMetadata;
//! use cfg_repo::monitor::FileEvent;
//! use cfg_repo::repository::CfgRepository;
//! use cfg_repo::stages::BindOptions;
//!
//! let fs = Arc::new(MemoryFS::new());
//! fs.add_file_string("/srv/Cfg/etc/motd/motd", "Welcome\n").unwrap();
//! fs.add_file_string("/srv/Cfg/etc/motd/motd.H_web01", "Welcome to web01\n").unwrap();
//!
//! let repo = CfgRepository::with_source(
//!     "/srv/Cfg",
//!     fs.clone(),
//!     HandlerRegistry::builtin(),
//!     BindOptions::default(),
//! );
//! for path in fs.list_files() {
//!     repo.handle_event(&FileEvent::exists(path));
//! }
//!
//! let mut entry = AbstractEntry::path("/etc/motd");
//! let result = repo.bind(&mut entry, &ClientMetadata::new("web01")).unwrap();
//! assert_eq!(result.text(), Some("Welcome to web01\n"));
//!
//! let mut entry = AbstractEntry::path("/etc/motd");
//! let result = repo.bind(&mut entry, &ClientMetadata::new("db01")).unwrap();
//! assert_eq!(result.text(), Some("Welcome\n"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Filename grammar (`grammar`)**: `<basename>[.H_<host> | .G<NN>_<group>][.<ext>]`.
//! - **Specificity (`specificity`)**: which clients a candidate applies to,
//!   and which of several applicable candidates wins.
//! - **Handlers (`handlers`)**: the generator, filter, info and verifier
//!   roles, and the ordered registry that decides which handler claims a file.
//! - **Entry index (`index`, `repository`)**: the live set of candidates,
//!   kept current by filesystem events (`monitor`).
//! - **Binding stages (`stages`)**: info, generate, filter, verify, encode.
//! - **Pull (`pull`)**: writing client data back into the repository.
//!
//! ## Execution Flow
//!
//! 1.  **Indexing**: every file event is routed to the entry set of its
//!     directory, where the first handler whose grammar accepts the filename
//!     claims it.
//! 2.  **Binding**: a client request takes a read snapshot of one entry set
//!     and runs the five stages in [`stages::pipeline`].

pub mod candidate;
pub mod config;
pub mod defaults;
pub mod encoding;
pub mod entry;
pub mod error;
pub mod filesystem;
pub mod grammar;
pub mod handlers;
pub mod index;
pub mod lint;
pub mod metadata;
pub mod monitor;
pub mod path;
pub mod pull;
pub mod repository;
pub mod specificity;
pub mod stages;

#[cfg(test)]
mod grammar_proptest;
