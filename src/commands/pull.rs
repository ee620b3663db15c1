//! # Pull Command Implementation
//!
//! This module implements the `pull` subcommand, which writes a client's
//! current copy of an entry back into the repository.
//!
//! The content, read from `--text-file` or with `--stdin`, is written as the
//! plain file the client currently binds from, or as the client's
//! host-specific file with `--host-specific`. Owner, group and permission
//! changes are recorded in the entry's `info.xml`. Without a content source
//! only the metadata is updated.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use cfg_repo::pull::PullData;

use super::{load_repository, ClientArgs, GlobalArgs};

/// Write a client's copy of an entry back into the repository
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Entry name, e.g. /etc/motd
    #[arg(value_name = "ENTRY")]
    pub entry: String,

    #[command(flatten)]
    pub client: ClientArgs,

    /// Read the content from this file
    #[arg(long, value_name = "FILE", conflicts_with = "stdin")]
    pub text_file: Option<PathBuf>,

    /// Read the content from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Write a host-specific file even if a less specific one is in use
    #[arg(long)]
    pub host_specific: bool,

    /// Owner to record in info.xml
    #[arg(long, value_name = "USER")]
    pub owner: Option<String>,

    /// Group to record in info.xml
    #[arg(long, value_name = "GROUP")]
    pub group_owner: Option<String>,

    /// Permissions to record in info.xml, e.g. 0644
    #[arg(long, value_name = "MODE")]
    pub perms: Option<String>,
}

impl PullArgs {
    fn data(&self) -> Result<PullData> {
        let mut data = match &self.text_file {
            Some(path) => PullData::new(
                std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?,
            ),
            None if self.stdin => {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .context("Failed to read content from stdin")?;
                PullData::new(text)
            }
            None => PullData::metadata_only(),
        };
        if let Some(owner) = &self.owner {
            data = data.with_owner(owner.clone());
        }
        if let Some(group) = &self.group_owner {
            data = data.with_group(group.clone());
        }
        if let Some(perms) = &self.perms {
            data = data.with_perms(perms.clone());
        }
        if data.text.is_none() && data.metadata_updates().is_empty() {
            bail!("Nothing to pull: pass --text-file, --stdin, --owner, --group-owner or --perms");
        }
        Ok(data)
    }
}

/// Execute the `pull` command.
pub fn execute(global: &GlobalArgs, args: PullArgs) -> Result<()> {
    let repository = load_repository(global, None)?;
    let client = args.client.metadata()?;
    let data = args.data()?;

    let choices = repository.list_accept_choices(&args.entry, &client)?;
    let target = if args.host_specific {
        choices.last()
    } else {
        choices.first()
    }
    .with_context(|| format!("No place to write {} for {}", args.entry, client.hostname))?;
    log::info!("Pulling {} for {} as {}", args.entry, client.hostname, target);

    let outcome = repository.write_update(&args.entry, target, &data)?;
    for path in &outcome.removed {
        println!("Removed {}", path.display());
    }
    for path in &outcome.written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
