use crate::capabilities::{SocialPost, SocialTimeline};
use crate::fetchers::accept_item;
use crate::queue::{SeenUrls, SuggestionQueue};
use crate::types::{FetchOutcome, RawItem, Result};
use crate::utils::text::{collapse_whitespace, ellipsize};
use std::sync::Arc;
use tracing::{info, warn};

const LIKED_PREFIX: &str = "❤️";
const BOOKMARKED_PREFIX: &str = "🔖";

/// Composed titles are capped here, ellipsis included.
const TITLE_CAP: usize = 100;

/// Pulls the curator's liked and bookmarked posts through the signed
/// social-API capability and files them as suggestions.
pub struct SocialFetcher {
    queue: SuggestionQueue,
    timeline: Arc<dyn SocialTimeline>,
    user_id: String,
}

impl SocialFetcher {
    pub fn new(queue: SuggestionQueue, timeline: Arc<dyn SocialTimeline>, user_id: String) -> Self {
        Self {
            queue,
            timeline,
            user_id,
        }
    }

    pub async fn fetch_likes_and_bookmarks(&self) -> Result<FetchOutcome> {
        let mut seen = self.queue.seen_urls().await?;
        let mut outcome = FetchOutcome::default();

        match self.timeline.liked_posts(&self.user_id).await {
            Ok(posts) => {
                self.intake(LIKED_PREFIX, &posts, &mut seen, &mut outcome)
                    .await;
            }
            Err(e) => {
                warn!("Liked-posts fetch failed: {}", e);
                outcome.errors.push(format!("likes: {}", e));
            }
        }

        match self.timeline.bookmarked_posts(&self.user_id).await {
            Ok(posts) => {
                self.intake(BOOKMARKED_PREFIX, &posts, &mut seen, &mut outcome)
                    .await;
            }
            Err(e) => {
                warn!("Bookmarked-posts fetch failed: {}", e);
                outcome.errors.push(format!("bookmarks: {}", e));
            }
        }

        info!(
            "Social fetch: {} new suggestions, {} errors",
            outcome.fetched,
            outcome.errors.len()
        );
        Ok(outcome)
    }

    async fn intake(
        &self,
        prefix: &str,
        posts: &[SocialPost],
        seen: &mut SeenUrls,
        outcome: &mut FetchOutcome,
    ) {
        for post in posts {
            let item = item_from_post(prefix, post);
            match accept_item(&self.queue, seen, None, &item).await {
                Ok(true) => outcome.fetched += 1,
                Ok(false) => {}
                Err(e) => outcome.errors.push(format!("{}: {}", post.id, e)),
            }
        }
    }
}

/// Compose the suggestion title: origin emoji, then the post text flattened
/// to one line and capped with an ellipsis.
fn compose_title(prefix: &str, text: &str) -> String {
    let flat = collapse_whitespace(text);
    ellipsize(&format!("{} {}", prefix, flat), TITLE_CAP)
}

/// A liked/bookmarked post becomes a raw item: the first embedded outbound
/// link is the real subject when present; the post itself is the fallback
/// URL. The full text plus any links land in the content.
fn item_from_post(prefix: &str, post: &SocialPost) -> RawItem {
    let source_url = post
        .embedded_urls
        .first()
        .cloned()
        .unwrap_or_else(|| canonical_post_url(post));

    let mut content = post.text.clone();
    if !post.embedded_urls.is_empty() {
        content.push_str("\n\n");
        content.push_str(&post.embedded_urls.join("\n"));
    }

    RawItem {
        source_url,
        title: compose_title(prefix, &post.text),
        content,
    }
}

fn canonical_post_url(post: &SocialPost) -> String {
    format!("https://x.com/{}/status/{}", post.author_handle, post.id)
}
