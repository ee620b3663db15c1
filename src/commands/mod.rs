//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `cfg-repo` command-line tool, one file per subcommand.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the global options and the parsed
//!   `Args` and performs the command's logic.
//!
//! The helpers here resolve the settings file, build the client a command
//! acts for and load the repository index.

pub mod bind;
pub mod lint;
pub mod ls;
pub mod pull;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::debug;

use cfg_repo::config::Settings;
use cfg_repo::defaults::{user_settings_file, SETTINGS_ENV, SETTINGS_FILE};
use cfg_repo::metadata::ClientMetadata;
use cfg_repo::repository::CfgRepository;
use cfg_repo::stages::BindOptions;

/// Options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub repository: Option<PathBuf>,
    pub encoding: Option<String>,
}

/// The client a command acts for
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Client hostname
    #[arg(long, value_name = "HOST")]
    pub host: String,

    /// Group membership as NAME or NAME:PRIORITY (repeatable)
    #[arg(short, long = "group", value_name = "NAME[:PRIO]")]
    pub groups: Vec<String>,
}

impl ClientArgs {
    pub fn metadata(&self) -> Result<ClientMetadata> {
        self.groups
            .iter()
            .try_fold(ClientMetadata::new(self.host.clone()), |client, group| {
                let (name, priority) = parse_group(group)?;
                Ok(client.with_group(name, priority))
            })
    }
}

/// Parse `NAME` or `NAME:PRIORITY`; the priority defaults to 0.
pub fn parse_group(value: &str) -> Result<(String, u32)> {
    let (name, priority) = match value.split_once(':') {
        Some((name, priority)) => {
            let priority = priority
                .parse::<u32>()
                .with_context(|| format!("invalid priority in group '{}'", value))?;
            (name, priority)
        }
        None => (value, 0),
    };
    if name.is_empty() {
        anyhow::bail!("empty group name in '{}'", value);
    }
    Ok((name.to_string(), priority))
}

/// Find the settings file: `--config`, `$CFG_REPO_CONFIG`, `./cfg-repo.toml`,
/// then the per-user settings file.
pub fn settings_path(global: &GlobalArgs) -> Option<PathBuf> {
    if let Some(path) = &global.config {
        return Some(path.clone());
    }
    if let Some(path) = std::env::var_os(SETTINGS_ENV) {
        return Some(PathBuf::from(path));
    }
    let local = Path::new(SETTINGS_FILE);
    if local.exists() {
        return Some(local.to_path_buf());
    }
    user_settings_file().filter(|path| path.exists())
}

/// Load settings and apply the command-line overrides.
pub fn load_settings(global: &GlobalArgs) -> Result<Settings> {
    let mut settings = match settings_path(global) {
        Some(path) => {
            debug!("Loading settings from {}", path.display());
            Settings::from_file(&path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?
        }
        None => Settings::default(),
    };
    if let Some(repository) = &global.repository {
        settings.repository = repository.clone();
    }
    if let Some(encoding) = &global.encoding {
        settings.encoding = encoding.clone();
    }
    settings.validate()?;
    Ok(settings)
}

/// Load settings and index the repository.
pub fn load_repository(global: &GlobalArgs, validate: Option<bool>) -> Result<CfgRepository> {
    let settings = load_settings(global)?;
    let mut options = BindOptions::from_settings(&settings)?;
    if let Some(validate) = validate {
        options.validate = validate;
    }
    let repository = CfgRepository::new(&settings)?.with_options(options);
    repository
        .load()
        .with_context(|| format!("Failed to index {}", settings.repository.display()))?;
    Ok(repository)
}
