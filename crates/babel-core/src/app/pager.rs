//! Summary pager.
//!
//! Walks every row matching a filter in fixed-size batches so aggregates
//! never depend on the caller's page size.

use crate::domain::{Assignment, CoreError, RequestContext};
use crate::ports::{AssignmentStore, ListFilter, ListOptions, SortField, SortOrder};

/// Calls `visit` once per matching row. Checks the context between batches.
///
/// Returns the total reported by the first batch.
pub async fn for_each_matching<F>(
    store: &dyn AssignmentStore,
    ctx: &RequestContext,
    filter: &ListFilter,
    batch_size: usize,
    mut visit: F,
) -> Result<usize, CoreError>
where
    F: FnMut(&Assignment),
{
    let mut options = ListOptions {
        filter: filter.clone(),
        ..ListOptions::default()
    }
    .sorted_by(SortField::CreatedAt, SortOrder::Asc)
    .page(1, batch_size);
    let batch_size = options.clamped_per_page();

    let mut total = None;
    let mut seen = 0usize;
    loop {
        ctx.check()?;
        let page = store.list(&options).await?;
        let expected = *total.get_or_insert(page.total);
        let fetched = page.rows.len();
        seen += fetched;
        page.rows.iter().for_each(&mut visit);

        if fetched < batch_size || seen >= expected {
            return Ok(expected);
        }
        options.page += 1;
    }
}
