//! Stage 4: run verifiers

use std::collections::BTreeMap;

use log::{debug, error};

use crate::candidate::CandidateFile;
use crate::entry::AbstractEntry;
use crate::error::{Error, Result};
use crate::handlers::{HandlerRole, Role};

use super::{select_most_specific, BindContext};

/// Run the most specific verifier of each verifier type.
///
/// Every selected verifier runs; the first failure, in verifier-name order,
/// is returned.
pub fn execute(ctx: &mut BindContext<'_, '_>, entry: &AbstractEntry, data: &[u8]) -> Result<()> {
    if !ctx.options.validate {
        debug!("Cfg: validation disabled, not verifying {}", entry.name);
        return Ok(());
    }
    let snapshot = ctx.snapshot;
    let mut groups: BTreeMap<&'static str, Vec<&CandidateFile>> = BTreeMap::new();
    for candidate in snapshot.query(HandlerRole::Verifier, ctx.client) {
        groups.entry(candidate.handler_name()).or_default().push(candidate);
    }

    let mut failure = None;
    for (name, candidates) in groups {
        let Some(selection) = select_most_specific(&candidates, ctx.client) else {
            continue;
        };
        if selection.is_ambiguous() {
            ctx.diagnostic(Error::AmbiguousVerifier {
                entry: entry.name.clone(),
                verifier: name.to_string(),
                candidates: selection.tied_names(),
            });
        }
        let winner = selection.winner;
        let Role::Verifier(verifier) = winner.handler().role() else {
            continue;
        };
        if let Err(err) = verifier.verify(winner, entry, ctx.client, data) {
            let err = match err {
                err @ Error::VerificationFailure { .. } => err,
                other => Error::VerificationFailure {
                    entry: entry.name.clone(),
                    client: ctx.client.hostname.clone(),
                    message: other.to_string(),
                },
            };
            error!("Cfg: {} rejected {}: {}", winner, entry.name, err);
            failure.get_or_insert(err);
        }
    }
    failure.map_or(Ok(()), Err)
}
