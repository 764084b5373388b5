use async_trait::async_trait;
use content_curator::capabilities::{
    DraftPost, Scraper, ScrapedPage, SearchHit, Searcher, SocialPost, SocialTimeline, Summarizer,
    SummaryVerdict,
};
use content_curator::types::{CuratorError, Result, Section};
use sqlx::postgres::PgPool;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Connect to the test database named by DATABASE_URL and apply migrations.
/// Tests that need this are #[ignore]d so the default test run stays
/// self-contained.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for DB tests");
    let pool = PgPool::connect(&url).await.expect("connect to test db");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

pub async fn wipe(pool: &PgPool) {
    sqlx::query("TRUNCATE sources, content_suggestions, published_posts")
        .execute(pool)
        .await
        .expect("truncate tables");
}

/// Summarizer that accepts everything, stamping recognizable output.
pub struct AcceptAllSummarizer {
    pub calls: AtomicUsize,
}

impl AcceptAllSummarizer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Summarizer for AcceptAllSummarizer {
    async fn summarize(&self, title: &str, _content: &str) -> Result<SummaryVerdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SummaryVerdict::Post(DraftPost {
            title: format!("Rewritten: {}", title),
            excerpt: "A short excerpt".to_string(),
            content: "A rewritten body long enough to publish.".to_string(),
            section: Section::Weekly,
            tag: "models".to_string(),
        }))
    }
}

/// Summarizer that rejects everything as low quality.
pub struct RejectAllSummarizer;

#[async_trait]
impl Summarizer for RejectAllSummarizer {
    async fn summarize(&self, _title: &str, _content: &str) -> Result<SummaryVerdict> {
        Ok(SummaryVerdict::Rejected {
            reason: "low quality".to_string(),
        })
    }
}

/// Scraper serving fixed content for any URL.
pub struct FixedScraper {
    pub title: String,
    pub body: String,
}

#[async_trait]
impl Scraper for FixedScraper {
    async fn scrape(&self, _url: &str) -> Result<ScrapedPage> {
        Ok(ScrapedPage {
            title: self.title.clone(),
            markdown_content: self.body.clone(),
        })
    }
}

/// Searcher returning a canned result list for every query.
pub struct FixedSearcher {
    pub hits: Vec<SearchHit>,
}

#[async_trait]
impl Searcher for FixedSearcher {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>> {
        Ok(self.hits.clone())
    }
}

/// Timeline with canned liked and bookmarked posts.
pub struct FixedTimeline {
    pub liked: Vec<SocialPost>,
    pub bookmarked: Vec<SocialPost>,
}

#[async_trait]
impl SocialTimeline for FixedTimeline {
    async fn liked_posts(&self, _user_id: &str) -> Result<Vec<SocialPost>> {
        Ok(self.liked.clone())
    }

    async fn bookmarked_posts(&self, _user_id: &str) -> Result<Vec<SocialPost>> {
        Ok(self.bookmarked.clone())
    }
}

/// Searcher that always fails, for partial-failure reporting tests.
pub struct FailingSearcher;

#[async_trait]
impl Searcher for FailingSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        Err(CuratorError::General(format!("search backend down: {}", query)))
    }
}
