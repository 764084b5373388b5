use crate::capabilities::Scraper;
use crate::classifier::is_homepage_url;
use crate::fetchers::accept_item;
use crate::queue::{SeenUrls, SuggestionQueue};
use crate::registry::SourceRegistry;
use crate::types::{CuratorError, FetchOutcome, RawItem, Result, Source, SourceKind};
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const RSS_MAX_RETRIES: u32 = 3;
const RSS_RETRY_DELAY_SECS: u64 = 5;

/// Pulls candidate items from every active configured source: websites go
/// through the scrape capability, Google-Alerts feeds are fetched and
/// parsed here, twitter sources are left to the social fetcher.
pub struct WebFetcher {
    registry: SourceRegistry,
    queue: SuggestionQueue,
    scraper: Arc<dyn Scraper>,
    client: Client,
}

impl WebFetcher {
    pub fn new(registry: SourceRegistry, queue: SuggestionQueue, scraper: Arc<dyn Scraper>) -> Self {
        let client = Client::builder()
            .user_agent("content-curator/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            registry,
            queue,
            scraper,
            client,
        }
    }

    /// One intake pass over all active sources, sequential. A failing
    /// source is recorded and the pass moves on.
    pub async fn fetch_from_all_active_sources(&self) -> Result<FetchOutcome> {
        let sources = self.registry.list_sources(true).await?;
        let mut seen = self.queue.seen_urls().await?;
        let mut outcome = FetchOutcome::default();

        info!("Fetching from {} active sources", sources.len());

        for source in &sources {
            match self.fetch_one_source(source, &mut seen, &mut outcome).await {
                Ok(()) => {}
                Err(e) => {
                    warn!("Source {} failed: {}", source.name, e);
                    outcome.errors.push(format!("{}: {}", source.name, e));
                }
            }
        }

        info!(
            "Fetch pass done: {} new suggestions, {} errors",
            outcome.fetched,
            outcome.errors.len()
        );
        Ok(outcome)
    }

    async fn fetch_one_source(
        &self,
        source: &Source,
        seen: &mut SeenUrls,
        outcome: &mut FetchOutcome,
    ) -> Result<()> {
        match source.kind {
            SourceKind::Website => {
                let page = self.scraper.scrape(&source.url).await?;
                if is_homepage_url(&source.url) {
                    // Admin chose to watch this page; the signal is logged
                    // but does not veto a configured source.
                    debug!("Source {} looks like a homepage", source.name);
                }
                let item = RawItem {
                    source_url: source.url.clone(),
                    title: page.title,
                    content: page.markdown_content,
                };
                if accept_item(&self.queue, seen, Some(source.id), &item).await? {
                    outcome.fetched += 1;
                }
            }
            SourceKind::GoogleAlertsRss => {
                let items = self.fetch_alert_items(&source.url).await?;
                for item in items {
                    if is_homepage_url(&item.source_url) {
                        debug!("Skipping probable homepage: {}", item.source_url);
                        continue;
                    }
                    match accept_item(&self.queue, seen, Some(source.id), &item).await {
                        Ok(true) => outcome.fetched += 1,
                        Ok(false) => {}
                        Err(e) => outcome
                            .errors
                            .push(format!("{}: {}: {}", source.name, item.source_url, e)),
                    }
                }
            }
            SourceKind::Twitter => {
                // Served by the social-likes fetcher, which has the signed
                // API access these need.
                debug!("Skipping twitter source {} in web fetch", source.name);
            }
        }
        Ok(())
    }

    /// Fetch and parse a Google-Alerts feed, unwrapping the redirect links
    /// to the real target URLs.
    async fn fetch_alert_items(&self, feed_url: &str) -> Result<Vec<RawItem>> {
        let body = self.fetch_with_retry(feed_url).await?;
        let feed = feed_rs::parser::parse(body.as_bytes())
            .map_err(|e| CuratorError::Parse(format!("feed parse failed: {}", e)))?;

        let mut items = Vec::new();
        for entry in feed.entries {
            let Some(link) = entry.links.first() else {
                continue;
            };
            let target = unwrap_google_alert_link(&link.href);
            let title = entry
                .title
                .as_ref()
                .map(|t| strip_tags(&t.content))
                .unwrap_or_default();
            let content = entry
                .summary
                .as_ref()
                .map(|s| strip_tags(&s.content))
                .unwrap_or_default();
            items.push(RawItem {
                source_url: target,
                title,
                content,
            });
        }
        Ok(items)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(RSS_RETRY_DELAY_SECS),
            initial_interval: Duration::from_secs(RSS_RETRY_DELAY_SECS),
            max_interval: Duration::from_secs(RSS_RETRY_DELAY_SECS * 8),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(RSS_RETRY_DELAY_SECS * 20)),
            ..Default::default()
        };

        let mut last_error = None;
        for attempt in 0..=RSS_MAX_RETRIES {
            match self.try_fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < RSS_MAX_RETRIES {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| CuratorError::General(format!("fetch failed for {}", url))))
    }

    async fn try_fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(CuratorError::General(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }
        Ok(response.text().await?)
    }
}

/// Google Alerts wraps every entry link in a google.com/url redirect with
/// the real target in the `url` query parameter. Unknown shapes pass
/// through untouched.
pub fn unwrap_google_alert_link(href: &str) -> String {
    let Ok(parsed) = Url::parse(href) else {
        return href.to_string();
    };
    let is_google_redirect = parsed
        .host_str()
        .map(|h| h == "www.google.com" || h == "google.com")
        .unwrap_or(false)
        && parsed.path() == "/url";
    if !is_google_redirect {
        return href.to_string();
    }
    parsed
        .query_pairs()
        .find(|(k, _)| k == "url" || k == "q")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| href.to_string())
}

/// Drop markup from feed-provided titles and snippets; alerts embed `<b>`
/// highlights.
fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}
