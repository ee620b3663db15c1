//! Orchestrator for a complete bind
//!
//! Runs stages 1-5 against a working copy of the entry. The caller's entry
//! receives the bound attributes and content only when every stage
//! succeeded; a failed bind leaves it exactly as it was.

use log::debug;

use super::{stage1, stage2, stage3, stage4, stage5, BindContext, BindOptions};
use crate::entry::{AbstractEntry, BoundResult};
use crate::error::Result;
use crate::index::EntrySnapshot;
use crate::metadata::ClientMetadata;

/// Bind `entry` for `client` against a snapshot of its entry set.
pub fn bind(
    snapshot: &EntrySnapshot<'_>,
    entry: &mut AbstractEntry,
    client: &ClientMetadata,
    options: &BindOptions,
) -> Result<BoundResult> {
    let mut ctx = BindContext::new(snapshot, client, options);
    let mut working = entry.clone();
    let requested_inherit = working.inherits_perms();

    // Stage 1: Info
    stage1::execute(&mut ctx, &mut working)?;

    // Stage 2: Generate
    let inherit = requested_inherit || working.inherits_perms();
    let (data, generator) = stage2::execute(&mut ctx, &mut working, inherit)?;
    debug!("Cfg: generated {} for {} with {}", working.name, client.hostname, generator);

    // Stage 3: Filter
    let data = stage3::execute(&mut ctx, &working, data)?;

    // Stage 4: Verify
    stage4::execute(&mut ctx, &working, data.as_bytes())?;

    // Stage 5: Encode
    let (content, encoding) = stage5::execute(&ctx, &working, data)?;

    let result = BoundResult {
        content,
        attributes: working.attributes,
        encoding,
        diagnostics: ctx.diagnostics,
    };
    result.apply_to(entry);
    Ok(result)
}
