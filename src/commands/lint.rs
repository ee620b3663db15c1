//! # Lint Command Implementation
//!
//! Prints a line per deprecated file in the repository. With `--strict`
//! the command fails when anything was reported, for use in CI.

use anyhow::Result;
use clap::Args;

use cfg_repo::lint::lint;

use super::{load_repository, GlobalArgs};

/// Report deprecated files in the repository
#[derive(Args, Debug)]
pub struct LintArgs {
    /// Exit with an error if any findings are reported
    #[arg(long)]
    pub strict: bool,
}

/// Execute the `lint` command.
pub fn execute(global: &GlobalArgs, args: LintArgs) -> Result<()> {
    let repository = load_repository(global, None)?;
    let findings = lint(&repository)?;

    if findings.is_empty() {
        println!("No issues found");
        return Ok(());
    }
    for finding in &findings {
        println!("{}", finding);
    }
    if args.strict {
        anyhow::bail!("{} lint finding(s)", findings.len());
    }
    Ok(())
}
