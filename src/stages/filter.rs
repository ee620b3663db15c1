//! Stage 3: apply filters

use log::debug;

use crate::entry::{AbstractEntry, Data};
use crate::error::Result;
use crate::handlers::{HandlerRole, Role};

use super::{specificity_order, BindContext};

/// Thread `data` through every applicable filter, least specific first.
pub fn execute(ctx: &mut BindContext<'_, '_>, entry: &AbstractEntry, data: Data) -> Result<Data> {
    let snapshot = ctx.snapshot;
    let mut filters = snapshot.query(HandlerRole::Filter, ctx.client);
    filters.sort_by(|a, b| specificity_order(a, b));

    filters.into_iter().try_fold(data, |data, file| {
        debug!("Cfg: applying {} to {}", file, entry.name);
        match file.handler().role() {
            Role::Filter(filter) => filter.modify(file, entry, ctx.client, data),
            _ => Ok(data),
        }
    })
}
