use crate::capabilities::{SearchHit, Searcher};
use crate::classifier::{
    is_about_primary_source, is_finance_title, is_homepage_url, is_primary_source_url,
};
use crate::fetchers::accept_item;
use crate::queue::SuggestionQueue;
use crate::types::{RawItem, Result, SearchOutcome, TrendingOutcome};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Standing queries for the regular content sweep.
const CONTENT_QUERIES: &[&str] = &[
    "AI news this week",
    "new AI model release",
    "open source LLM release",
    "AI research breakthrough",
    "AI tools for developers",
    "AI agent framework",
];

/// Standing queries for the trending sweep.
const TRENDING_QUERIES: &[&str] = &[
    "trending AI story",
    "viral AI demo",
    "AI announcement today",
    "AI feature launch",
];

/// Turns the web-search capability into queue intake, screening hits
/// through the classifier on the way in.
pub struct SearchFetcher {
    queue: SuggestionQueue,
    searcher: Arc<dyn Searcher>,
}

impl SearchFetcher {
    pub fn new(queue: SuggestionQueue, searcher: Arc<dyn Searcher>) -> Self {
        Self { queue, searcher }
    }

    /// Sweep the standing content queries. `fetched` counts raw hits,
    /// `approved` counts hits that survived screening and entered the
    /// queue.
    pub async fn search_for_content(&self) -> Result<SearchOutcome> {
        let mut seen = self.queue.seen_urls().await?;
        let mut outcome = SearchOutcome::default();

        for query in CONTENT_QUERIES {
            let hits = match self.searcher.search(query).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Search failed for '{}': {}", query, e);
                    outcome.errors.push(format!("{}: {}", query, e));
                    continue;
                }
            };
            outcome.fetched += hits.len();

            for hit in hits {
                if !screen_hit(&hit, false) {
                    continue;
                }
                match accept_item(&self.queue, &mut seen, None, &hit_to_item(&hit)).await {
                    Ok(true) => outcome.approved += 1,
                    Ok(false) => {}
                    Err(e) => outcome.errors.push(format!("{}: {}", hit.url, e)),
                }
            }
        }

        info!(
            "Content search: {} hits, {} accepted, {} errors",
            outcome.fetched,
            outcome.approved,
            outcome.errors.len()
        );
        Ok(outcome)
    }

    /// Sweep the trending queries. Primary-source hits are counted and
    /// exempt from the homepage screen: a vendor's announcement page is
    /// worth taking even when it sits one segment deep.
    pub async fn search_trending(&self) -> Result<TrendingOutcome> {
        let mut seen = self.queue.seen_urls().await?;
        let mut outcome = TrendingOutcome::default();

        for query in TRENDING_QUERIES {
            let hits = match self.searcher.search(query).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Trending search failed for '{}': {}", query, e);
                    outcome.errors.push(format!("{}: {}", query, e));
                    continue;
                }
            };
            outcome.fetched += hits.len();

            for hit in hits {
                let primary = is_primary_source_url(&hit.url)
                    || is_about_primary_source(&hit.title, &hit.snippet);
                if !screen_hit(&hit, primary) {
                    continue;
                }
                match accept_item(&self.queue, &mut seen, None, &hit_to_item(&hit)).await {
                    Ok(true) => {
                        outcome.approved += 1;
                        if primary {
                            outcome.primary += 1;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => outcome.errors.push(format!("{}: {}", hit.url, e)),
                }
            }
        }

        info!(
            "Trending search: {} hits, {} accepted ({} primary), {} errors",
            outcome.fetched,
            outcome.approved,
            outcome.primary,
            outcome.errors.len()
        );
        Ok(outcome)
    }
}

/// Shared screen for search hits: finance noise is always dropped, and
/// probable homepages are dropped unless the hit is primary-source.
fn screen_hit(hit: &SearchHit, primary: bool) -> bool {
    if is_finance_title(&hit.title) {
        debug!("Dropping finance hit: {}", hit.title);
        return false;
    }
    if !primary && is_homepage_url(&hit.url) {
        debug!("Dropping probable homepage: {}", hit.url);
        return false;
    }
    true
}

fn hit_to_item(hit: &SearchHit) -> RawItem {
    RawItem {
        source_url: hit.url.clone(),
        title: hit.title.clone(),
        content: hit.snippet.clone(),
    }
}
