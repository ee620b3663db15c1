//! Stage 1: bind attributes

use crate::entry::AbstractEntry;
use crate::error::{Error, Result};
use crate::handlers::{HandlerRole, Role};

use super::{select_most_specific, BindContext};

/// Apply the default attributes and then the best info file to `entry`.
///
/// More than one applicable info file is reported as ambiguous and only
/// the most specific one (smallest filename on a tie) is used.
pub fn execute(ctx: &mut BindContext<'_, '_>, entry: &mut AbstractEntry) -> Result<()> {
    let snapshot = ctx.snapshot;
    let mut attributes = ctx.options.defaults.clone();

    let suppliers = snapshot.query(HandlerRole::Info, ctx.client);
    if let Some(selection) = select_most_specific(&suppliers, ctx.client) {
        if suppliers.len() > 1 {
            let mut candidates: Vec<String> = suppliers.iter().map(|c| c.filename.clone()).collect();
            candidates.sort();
            ctx.diagnostic(Error::AmbiguousInfo {
                entry: entry.name.clone(),
                candidates,
            });
        }
        let winner = selection.winner;
        if let Role::Info(info) = winner.handler().role() {
            attributes.extend(info.info(winner, entry, ctx.client)?);
        }
    }

    for (key, value) in attributes {
        if !key.starts_with("__") {
            entry.set(key, value);
        }
    }
    if entry.tag == "Path" {
        entry.set("type", "file");
    }
    Ok(())
}
