//! # Ls Command Implementation
//!
//! This module implements the `ls` subcommand, which lists every indexed
//! entry together with its candidate files.
//!
//! Each candidate is printed with the role of the handler that claimed it
//! and its specificity. When `--host` is given, only candidates that apply
//! to that client are listed.

use anyhow::Result;
use clap::Args;

use cfg_repo::metadata::ClientMetadata;

use super::{load_repository, parse_group, GlobalArgs};

/// List entries and their candidate files
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Only show candidates that apply to this client
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Group membership as NAME or NAME:PRIORITY (repeatable, needs --host)
    #[arg(short, long = "group", value_name = "NAME[:PRIO]", requires = "host")]
    pub groups: Vec<String>,
}

impl LsArgs {
    fn client(&self) -> Result<Option<ClientMetadata>> {
        let Some(host) = &self.host else {
            return Ok(None);
        };
        let mut client = ClientMetadata::new(host.clone());
        for group in &self.groups {
            let (name, priority) = parse_group(group)?;
            client = client.with_group(name, priority);
        }
        Ok(Some(client))
    }
}

/// Execute the `ls` command.
pub fn execute(global: &GlobalArgs, args: LsArgs) -> Result<()> {
    let repository = load_repository(global, None)?;
    let client = args.client()?;

    let names = repository.entry_names()?;
    if names.is_empty() {
        println!("No entries in {}", repository.root().display());
        return Ok(());
    }

    for name in names {
        let Some(set) = repository.entry_set(&name)? else {
            continue;
        };
        let snapshot = set.snapshot()?;
        let mut candidates = snapshot.candidates();
        if let Some(client) = &client {
            candidates.retain(|candidate| candidate.specificity.matches(client));
        }
        candidates.sort_by(|a, b| a.filename.cmp(&b.filename));

        println!("{}", name);
        for candidate in candidates {
            let deprecated = if candidate.deprecated() { " (deprecated)" } else { "" };
            println!(
                "  {:<32} {:<10} {}{}",
                candidate.filename,
                candidate.role().to_string(),
                candidate.specificity,
                deprecated
            );
        }
    }
    Ok(())
}
