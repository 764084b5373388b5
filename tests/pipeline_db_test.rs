//! End-to-end pipeline tests against a real Postgres. Ignored by default;
//! run with a database available:
//!
//!   DATABASE_URL=postgres://... cargo test -- --ignored

mod common;

use common::*;
use content_curator::capabilities::SearchHit;
use content_curator::fetchers::search::SearchFetcher;
use content_curator::fetchers::web::WebFetcher;
use content_curator::queue::AUTO_REJECT_PREFIX;
use content_curator::types::{
    ApproveOverrides, CuratorError, RawItem, SourceKind, SuggestionPatch, SuggestionStatus,
};
use content_curator::{
    PostStore, ReviewWorkflow, SourceRegistry, SuggestionQueue, SummarizerAdapter,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn raw_item(url: &str, title: &str) -> RawItem {
    RawItem {
        source_url: url.to_string(),
        title: title.to_string(),
        content: format!("Raw content for {}", title),
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn intake_dedups_across_url_variants() {
    let pool = test_pool().await;
    wipe(&pool).await;
    let queue = SuggestionQueue::new(pool.clone());

    let first = queue
        .insert_raw(None, &raw_item("https://www.site.com/post/", "A post"))
        .await
        .unwrap();
    assert!(first);

    // Same page under a different raw spelling: the normalized_url
    // constraint swallows it.
    let second = queue
        .insert_raw(None, &raw_item("https://site.com/post", "A post again"))
        .await
        .unwrap();
    assert!(!second);

    let pending = queue.list(Some(SuggestionStatus::Pending), None).await.unwrap();
    assert_eq!(pending.len(), 1);

    // The snapshot sees both spellings too.
    let seen = queue.seen_urls().await.unwrap();
    assert!(seen.contains("https://site.com/post"));
    assert!(seen.contains("https://www.site.com/post/?utm_source=x"));
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn web_fetch_inserts_once_per_source() {
    let pool = test_pool().await;
    wipe(&pool).await;
    let registry = SourceRegistry::new(pool.clone());
    let queue = SuggestionQueue::new(pool.clone());

    registry
        .add_source(
            "Vendor blog",
            "https://blog.example.com/ai-roundup",
            SourceKind::Website,
        )
        .await
        .unwrap();

    let scraper = Arc::new(FixedScraper {
        title: "AI roundup".to_string(),
        body: "Scraped markdown body".to_string(),
    });
    let fetcher = WebFetcher::new(registry.clone(), queue.clone(), scraper);

    let first = fetcher.fetch_from_all_active_sources().await.unwrap();
    assert_eq!(first.fetched, 1);
    assert!(first.errors.is_empty());

    // Second pass finds the same URL already queued.
    let second = fetcher.fetch_from_all_active_sources().await.unwrap();
    assert_eq!(second.fetched, 0);
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn search_reports_partial_failure_without_aborting() {
    let pool = test_pool().await;
    wipe(&pool).await;
    let queue = SuggestionQueue::new(pool.clone());

    let fetcher = SearchFetcher::new(queue.clone(), Arc::new(FailingSearcher));
    let outcome = fetcher.search_for_content().await.unwrap();
    assert_eq!(outcome.fetched, 0);
    assert_eq!(outcome.approved, 0);
    assert!(!outcome.errors.is_empty());

    // A working searcher gets screened intake.
    let hits = vec![
        SearchHit {
            title: "Lab releases new coding agent".to_string(),
            url: "https://example.com/news/coding-agent".to_string(),
            snippet: "A new agent".to_string(),
        },
        SearchHit {
            title: "Chipmaker stock jumps 8% after earnings".to_string(),
            url: "https://example.com/markets/chipmaker".to_string(),
            snippet: "Markets".to_string(),
        },
    ];
    let fetcher = SearchFetcher::new(queue.clone(), Arc::new(FixedSearcher { hits }));
    let outcome = fetcher.search_for_content().await.unwrap();
    assert!(outcome.fetched >= 2);
    assert_eq!(outcome.approved, 1, "finance hit must be screened out");
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn process_drains_in_batches_exactly_once() {
    let pool = test_pool().await;
    wipe(&pool).await;
    let queue = SuggestionQueue::new(pool.clone());

    for i in 0..7 {
        queue
            .insert_raw(None, &raw_item(&format!("https://example.com/item/{i}"), &format!("Item {i}")))
            .await
            .unwrap();
    }

    let summarizer = Arc::new(AcceptAllSummarizer::new());
    let adapter = SummarizerAdapter::new(queue.clone(), summarizer.clone());

    let mut total = 0;
    loop {
        let outcome = adapter.process_pending_batch(5).await.unwrap();
        total += outcome.processed;
        assert!(outcome.errors.is_empty());
        if outcome.processed < 5 {
            break;
        }
    }

    assert_eq!(total, 7);
    assert_eq!(summarizer.calls.load(Ordering::SeqCst), 7);

    // Nothing left, and another call is a clean no-op.
    let extra = adapter.process_pending_batch(5).await.unwrap();
    assert_eq!(extra.processed, 0);

    for suggestion in queue.list(Some(SuggestionStatus::Pending), None).await.unwrap() {
        assert!(suggestion.is_processed());
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn auto_rejected_items_are_stamped_and_not_repicked() {
    let pool = test_pool().await;
    wipe(&pool).await;
    let queue = SuggestionQueue::new(pool.clone());

    queue
        .insert_raw(None, &raw_item("https://example.com/spam", "Spammy thing"))
        .await
        .unwrap();

    let adapter = SummarizerAdapter::new(queue.clone(), Arc::new(RejectAllSummarizer));
    let outcome = adapter.process_pending_batch(5).await.unwrap();
    assert_eq!(outcome.processed, 1);

    let suggestions = queue.list(Some(SuggestionStatus::Pending), None).await.unwrap();
    assert_eq!(suggestions.len(), 1);
    let stamped = suggestions[0].suggested_title.as_deref().unwrap();
    assert!(stamped.starts_with(AUTO_REJECT_PREFIX));

    // The stamp keeps it out of later batches.
    let again = adapter.process_pending_batch(5).await.unwrap();
    assert_eq!(again.processed, 0);
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn approve_materializes_post_and_is_terminal() {
    let pool = test_pool().await;
    wipe(&pool).await;
    let queue = SuggestionQueue::new(pool.clone());
    let review = ReviewWorkflow::new(pool.clone());
    let posts = PostStore::new(pool.clone());

    queue
        .insert_raw(None, &raw_item("https://example.com/story", "Big story"))
        .await
        .unwrap();
    let adapter = SummarizerAdapter::new(queue.clone(), Arc::new(AcceptAllSummarizer::new()));
    adapter.process_pending_batch(5).await.unwrap();

    let id = queue.list(None, None).await.unwrap()[0].id;
    let approved = review.approve(id, &ApproveOverrides::default()).await.unwrap();

    let post = posts.get_by_slug(&approved.slug).await.unwrap().unwrap();
    assert_eq!(post.title, "Rewritten: Big story");
    assert_eq!(post.suggestion_id, Some(id));
    assert!(post.published);

    let suggestion = queue.get(id).await.unwrap();
    assert_eq!(suggestion.status, SuggestionStatus::Approved);
    assert!(suggestion.reviewed_at.is_some());

    // Terminal: neither a second approve nor a reject may fire again.
    assert!(matches!(
        review.approve(id, &ApproveOverrides::default()).await,
        Err(CuratorError::AlreadyReviewed { .. })
    ));
    assert!(matches!(
        review.reject(id).await,
        Err(CuratorError::AlreadyReviewed { .. })
    ));
    assert_eq!(posts.list_published(None).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn approve_of_unprocessed_suggestion_creates_no_post() {
    let pool = test_pool().await;
    wipe(&pool).await;
    let queue = SuggestionQueue::new(pool.clone());
    let review = ReviewWorkflow::new(pool.clone());
    let posts = PostStore::new(pool.clone());

    queue
        .insert_raw(None, &raw_item("https://example.com/unprocessed", "Raw only"))
        .await
        .unwrap();
    let id = queue.list(None, None).await.unwrap()[0].id;

    assert!(matches!(
        review.approve(id, &ApproveOverrides::default()).await,
        Err(CuratorError::Validation(_))
    ));
    assert!(posts.list_published(None).await.unwrap().is_empty());
    assert_eq!(
        queue.get(id).await.unwrap().status,
        SuggestionStatus::Pending
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn identical_titles_approve_to_distinct_slugs() {
    let pool = test_pool().await;
    wipe(&pool).await;
    let queue = SuggestionQueue::new(pool.clone());
    let review = ReviewWorkflow::new(pool.clone());

    for i in 0..2 {
        queue
            .insert_raw(None, &raw_item(&format!("https://example.com/dup/{i}"), "Same Title"))
            .await
            .unwrap();
    }
    let adapter = SummarizerAdapter::new(queue.clone(), Arc::new(AcceptAllSummarizer::new()));
    adapter.process_pending_batch(5).await.unwrap();

    let ids: Vec<_> = queue.list(None, None).await.unwrap().iter().map(|s| s.id).collect();
    let first = review.approve(ids[0], &ApproveOverrides::default()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = review.approve(ids[1], &ApproveOverrides::default()).await.unwrap();

    assert_ne!(first.slug, second.slug);
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn reject_is_terminal() {
    let pool = test_pool().await;
    wipe(&pool).await;
    let queue = SuggestionQueue::new(pool.clone());
    let review = ReviewWorkflow::new(pool.clone());

    queue
        .insert_raw(None, &raw_item("https://example.com/meh", "Meh"))
        .await
        .unwrap();
    let id = queue.list(None, None).await.unwrap()[0].id;

    review.reject(id).await.unwrap();
    assert!(matches!(
        review.reject(id).await,
        Err(CuratorError::AlreadyReviewed { .. })
    ));
    assert_eq!(
        queue.get(id).await.unwrap().status,
        SuggestionStatus::Rejected
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn update_gate_blocks_dangerous_content_and_leaves_record_alone() {
    let pool = test_pool().await;
    wipe(&pool).await;
    let queue = SuggestionQueue::new(pool.clone());
    let review = ReviewWorkflow::new(pool.clone());

    queue
        .insert_raw(None, &raw_item("https://example.com/edit-me", "Editable"))
        .await
        .unwrap();
    let id = queue.list(None, None).await.unwrap()[0].id;

    let bad = SuggestionPatch {
        content: Some("<script>alert(1)</script>".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        review.update(id, &bad).await,
        Err(CuratorError::Validation(_))
    ));
    assert!(queue.get(id).await.unwrap().suggested_content.is_none());

    // A clean partial patch lands, and untouched fields survive.
    let good = SuggestionPatch {
        title: Some("Edited title".to_string()),
        content: Some("Hand-written body long enough to publish".to_string()),
        ..Default::default()
    };
    review.update(id, &good).await.unwrap();
    let suggestion = queue.get(id).await.unwrap();
    assert_eq!(suggestion.suggested_title.as_deref(), Some("Edited title"));
    assert!(suggestion.suggested_excerpt.is_none());
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn bulk_reject_reports_per_item_results() {
    let pool = test_pool().await;
    wipe(&pool).await;
    let queue = SuggestionQueue::new(pool.clone());
    let review = ReviewWorkflow::new(pool.clone());

    queue
        .insert_raw(None, &raw_item("https://example.com/bulk", "Bulk item"))
        .await
        .unwrap();
    let good_id = queue.list(None, None).await.unwrap()[0].id;
    let missing_id = uuid::Uuid::new_v4();

    let outcome = review.bulk_reject(&[good_id, missing_id]).await;
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.errors.len(), 1);
}
