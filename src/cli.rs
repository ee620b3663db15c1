//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Cfg Repository - Bind specificity-ranked configuration files for clients
#[derive(Parser, Debug)]
#[command(name = "cfg-repo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to $CFG_REPO_CONFIG, then ./cfg-repo.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Repository root, overriding the settings file
    #[arg(short, long, global = true, value_name = "DIR")]
    repository: Option<PathBuf>,

    /// Source encoding, overriding the settings file
    #[arg(long, global = true, value_name = "ENCODING")]
    encoding: Option<String>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bind an entry for a client and print the result
    Bind(commands::bind::BindArgs),

    /// List entries and their candidate files
    Ls(commands::ls::LsArgs),

    /// Report deprecated files in the repository
    Lint(commands::lint::LintArgs),

    /// Write a client's copy of an entry back into the repository
    Pull(commands::pull::PullArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .parse_default_env()
            .format_timestamp(None)
            .init();

        let global = commands::GlobalArgs {
            config: self.config,
            repository: self.repository,
            encoding: self.encoding,
        };
        match self.command {
            Commands::Bind(args) => commands::bind::execute(&global, args),
            Commands::Ls(args) => commands::ls::execute(&global, args),
            Commands::Lint(args) => commands::lint::execute(&global, args),
            Commands::Pull(args) => commands::pull::execute(&global, args),
        }
    }
}
