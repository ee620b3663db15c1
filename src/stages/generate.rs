//! Stage 2: generate the initial content

use log::{error, warn};

use crate::candidate::CandidateFile;
use crate::entry::{AbstractEntry, Data};
use crate::error::{Error, Result};
use crate::handlers::{HandlerRole, Role};

use super::{select_most_specific, BindContext};

/// Run the single most specific generator.
///
/// When `inherit_perms` is set the winning generator's on-disk mode
/// replaces the entry's `perms` before the generator runs.
pub fn execute<'a>(
    ctx: &mut BindContext<'a, '_>,
    entry: &mut AbstractEntry,
    inherit_perms: bool,
) -> Result<(Data, &'a CandidateFile)> {
    let snapshot = ctx.snapshot;
    let generators = snapshot.query(HandlerRole::Generator, ctx.client);
    let selection = select_most_specific(&generators, ctx.client).ok_or_else(|| Error::MissingGenerator {
        entry: entry.name.clone(),
    })?;
    if selection.is_ambiguous() {
        ctx.diagnostic(Error::AmbiguousGenerator {
            entry: entry.name.clone(),
            candidates: selection.tied_names(),
        });
    }
    let winner = selection.winner;

    if inherit_perms {
        inherit_mode(entry, winner);
    }

    let Role::Generator(generator) = winner.handler().role() else {
        return Err(Error::MissingGenerator {
            entry: entry.name.clone(),
        });
    };
    let data = generator.generate(winner, entry, ctx.client).map_err(|err| {
        error!("Cfg: exception rendering {} with {}: {}", entry.name, winner, err);
        err
    })?;
    Ok((data, winner))
}

fn inherit_mode(entry: &mut AbstractEntry, winner: &CandidateFile) {
    warn!(
        "Cfg: {}: inheriting permissions from the source file is deprecated",
        entry.name
    );
    match winner.mode {
        Some(mode) => entry.set("perms", format!("{:04o}", mode)),
        None => warn!("Cfg: {} has no on-disk mode to inherit", winner),
    }
}
