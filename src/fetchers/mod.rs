//! Intake: each fetcher turns one external capability into raw candidate
//! items and feeds them through the shared dedup-then-insert path. A
//! single item's failure never aborts its batch; failures come back as
//! one string per item in the outcome.

pub mod search;
pub mod social;
pub mod web;

use crate::queue::{SeenUrls, SuggestionQueue};
use crate::types::{RawItem, Result};
use tracing::debug;
use uuid::Uuid;

/// Dedup-check an item against the invocation's seen-set and insert it as
/// a pending suggestion. The seen-set is extended immediately on accept so
/// near-duplicates later in the same batch are skipped too. Returns true
/// when a suggestion row was actually created.
pub(crate) async fn accept_item(
    queue: &SuggestionQueue,
    seen: &mut SeenUrls,
    source_id: Option<Uuid>,
    item: &RawItem,
) -> Result<bool> {
    if seen.contains(&item.source_url) {
        debug!("Skipping duplicate: {}", item.source_url);
        return Ok(false);
    }

    let inserted = queue.insert_raw(source_id, item).await?;
    seen.insert(&item.source_url);

    if !inserted {
        // The normalized_url constraint caught a duplicate our snapshot
        // missed (a concurrent invocation).
        debug!("Storage-level duplicate: {}", item.source_url);
    }
    Ok(inserted)
}
