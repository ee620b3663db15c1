//! # Bind Command Implementation
//!
//! This module implements the `bind` subcommand, which resolves one entry
//! (or, with `--all`, every entry) for a client and prints the result.
//!
//! ## Functionality
//!
//! - **Text output**: prints the bound content as the client would receive it
//! - **JSON output**: prints the content, attributes, transport encoding and
//!   any diagnostics raised while binding
//! - **Base64 transport**: `--base64` requests base64 encoding, which is
//!   required for binary content
//!
//! This command is read-only.

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;

use cfg_repo::entry::{AbstractEntry, BoundResult};

use super::{load_repository, ClientArgs, GlobalArgs};

/// Bind an entry for a client and print the result
#[derive(Args, Debug)]
pub struct BindArgs {
    /// Entry name, e.g. /etc/motd
    #[arg(value_name = "ENTRY", required_unless_present = "all", conflicts_with = "all")]
    pub entry: Option<String>,

    /// Bind every entry in the repository
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub client: ClientArgs,

    /// Request base64 transport
    #[arg(long)]
    pub base64: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Skip verifiers
    #[arg(long)]
    pub no_validate: bool,
}

/// Output formats for bound entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// The bound content only
    #[default]
    Text,
    /// Content, attributes and diagnostics as JSON
    Json,
}

#[derive(Serialize)]
struct JsonBinding<'a> {
    entry: &'a str,
    #[serde(flatten)]
    result: &'a BoundResult,
}

#[derive(Serialize)]
struct JsonFailure<'a> {
    entry: &'a str,
    error: String,
}

/// Execute the `bind` command.
pub fn execute(global: &GlobalArgs, args: BindArgs) -> Result<()> {
    let repository = load_repository(global, args.no_validate.then_some(false))?;
    let client = args.client.metadata()?;

    let results = match &args.entry {
        Some(name) => {
            let mut entry = request(name, args.base64);
            vec![(name.clone(), repository.bind(&mut entry, &client))]
        }
        None if args.base64 => {
            let entries = repository
                .entry_names()?
                .iter()
                .map(|name| request(name, true))
                .collect();
            repository.bind_many(entries, &client)
        }
        None => repository.bind_all(&client)?,
    };

    let single = args.entry.is_some();
    let mut failures = 0;
    for (name, result) in &results {
        match (result, args.format) {
            (Ok(bound), OutputFormat::Text) => {
                if !single {
                    println!("== {} ==", name);
                }
                if let Some(text) = bound.text() {
                    print!("{}", text);
                    if !text.ends_with('\n') {
                        println!();
                    }
                }
            }
            (Ok(bound), OutputFormat::Json) => {
                let json = JsonBinding {
                    entry: name,
                    result: bound,
                };
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            (Err(err), OutputFormat::Text) => {
                failures += 1;
                eprintln!("{}: {}", name, err);
            }
            (Err(err), OutputFormat::Json) => {
                failures += 1;
                let json = JsonFailure {
                    entry: name,
                    error: err.to_string(),
                };
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} entries failed to bind", failures, results.len());
    }
    Ok(())
}

fn request(name: &str, base64: bool) -> AbstractEntry {
    let entry = AbstractEntry::path(name);
    if base64 {
        entry.with_attribute("encoding", "base64")
    } else {
        entry
    }
}
