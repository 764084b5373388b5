//! External collaborator interfaces: scraping, search, summarization, the
//! signed social-API fetch, and the admin identity check. Each capability
//! is a trait with an HTTP-backed implementation; internals of the remote
//! services are out of scope here.

use crate::config::{ApiCredentials, SocialConfig, SummarizerConfig};
use crate::types::{CuratorError, Result, Section};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const HTTP_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = "content-curator/0.1";

fn http_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .unwrap_or_default()
}

/// Page content as returned by the scrape capability.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedPage {
    pub title: String,
    #[serde(rename = "markdownContent")]
    pub markdown_content: String,
}

#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage>;
}

/// One hit from the search capability.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Structured candidate post produced by the summarizer.
#[derive(Debug, Clone)]
pub struct DraftPost {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub section: Section,
    pub tag: String,
}

/// The summarizer either rewrites an item into a draft or judges it
/// unpublishable.
#[derive(Debug, Clone)]
pub enum SummaryVerdict {
    Post(DraftPost),
    Rejected { reason: String },
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, title: &str, content: &str) -> Result<SummaryVerdict>;
}

/// One liked or bookmarked post from the social timeline.
#[derive(Debug, Clone, Deserialize)]
pub struct SocialPost {
    pub id: String,
    #[serde(rename = "authorHandle")]
    pub author_handle: String,
    pub text: String,
    #[serde(rename = "embeddedUrls", default)]
    pub embedded_urls: Vec<String>,
}

#[async_trait]
pub trait SocialTimeline: Send + Sync {
    async fn liked_posts(&self, user_id: &str) -> Result<Vec<SocialPost>>;
    async fn bookmarked_posts(&self, user_id: &str) -> Result<Vec<SocialPost>>;
}

/// Identity collaborator: the authorization layer boils down to this one
/// boolean for the pipeline's purposes.
pub trait AdminGate: Send + Sync {
    fn is_admin(&self, credential: &str) -> bool;
}

/// Gate backed by a single shared token. A gate with no token configured
/// admits nobody over the wire; local tooling constructs it explicitly.
pub struct TokenAdminGate {
    token: Option<String>,
}

impl TokenAdminGate {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl AdminGate for TokenAdminGate {
    fn is_admin(&self, credential: &str) -> bool {
        match &self.token {
            Some(token) => !token.is_empty() && credential == token,
            None => false,
        }
    }
}

/// Reject before any other processing when the caller is not an admin.
pub fn ensure_admin(gate: &dyn AdminGate, credential: &str) -> Result<()> {
    if gate.is_admin(credential) {
        Ok(())
    } else {
        Err(CuratorError::AccessDenied)
    }
}

/// Scrape capability over a hosted scraping service.
pub struct HttpScraper {
    client: Client,
    creds: ApiCredentials,
}

impl HttpScraper {
    pub fn new(creds: ApiCredentials) -> Self {
        Self {
            client: http_client(),
            creds,
        }
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage> {
        debug!("Scraping {}", url);
        let response = self
            .client
            .post(format!("{}/scrape", self.creds.base_url))
            .bearer_auth(&self.creds.api_key)
            .json(&json!({ "url": url }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CuratorError::General(format!(
                "scrape failed for {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let page: ScrapedPage = response.json().await?;
        Ok(page)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Search capability over a hosted web-search API.
pub struct HttpSearcher {
    client: Client,
    creds: ApiCredentials,
}

impl HttpSearcher {
    pub fn new(creds: ApiCredentials) -> Self {
        Self {
            client: http_client(),
            creds,
        }
    }
}

#[async_trait]
impl Searcher for HttpSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        debug!("Searching for: {}", query);
        let response = self
            .client
            .post(format!("{}/search", self.creds.base_url))
            .bearer_auth(&self.creds.api_key)
            .json(&json!({ "q": query }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CuratorError::General(format!(
                "search failed for '{}': HTTP {}",
                query,
                response.status()
            )));
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.results)
    }
}

const SUMMARIZER_SYSTEM_PROMPT: &str = "You are the rewrite desk of an AI-news publication. \
Given a raw title and raw content, either rewrite them into a publishable post or reject \
low-quality/off-topic items. Reply with strict JSON only: \
{\"reject\": bool, \"reason\": string?, \"title\": string?, \"excerpt\": string?, \
\"content\": string?, \"section\": \"weekly\"|\"features\"|\"tools\"|\"viral\"?, \"tag\": string?}";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct SummaryReply {
    #[serde(default)]
    reject: bool,
    reason: Option<String>,
    title: Option<String>,
    excerpt: Option<String>,
    content: Option<String>,
    section: Option<String>,
    tag: Option<String>,
}

/// Summarize capability over an OpenAI-compatible chat endpoint that is
/// instructed to reply with strict JSON.
pub struct HttpSummarizer {
    client: Client,
    config: SummarizerConfig,
}

impl HttpSummarizer {
    pub fn new(config: SummarizerConfig) -> Self {
        Self {
            client: http_client(),
            config,
        }
    }

    fn parse_reply(raw: &str) -> Result<SummaryVerdict> {
        let reply: SummaryReply = serde_json::from_str(raw.trim())
            .map_err(|e| CuratorError::Summarizer(format!("malformed reply: {}", e)))?;

        if reply.reject {
            return Ok(SummaryVerdict::Rejected {
                reason: reply
                    .reason
                    .unwrap_or_else(|| "judged low quality".to_string()),
            });
        }

        let section = reply
            .section
            .as_deref()
            .map(Section::from_str)
            .transpose()?
            .unwrap_or(Section::Weekly);

        let title = reply
            .title
            .ok_or_else(|| CuratorError::Summarizer("reply missing title".to_string()))?;
        let content = reply
            .content
            .ok_or_else(|| CuratorError::Summarizer("reply missing content".to_string()))?;

        Ok(SummaryVerdict::Post(DraftPost {
            title,
            excerpt: reply.excerpt.unwrap_or_default(),
            content,
            section,
            tag: reply.tag.unwrap_or_default(),
        }))
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, title: &str, content: &str) -> Result<SummaryVerdict> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SUMMARIZER_SYSTEM_PROMPT },
                { "role": "user", "content": format!("Title: {}\n\nContent: {}", title, content) },
            ],
            "temperature": 0.3,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CuratorError::Summarizer(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let raw = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| CuratorError::Summarizer("empty reply".to_string()))?;

        Self::parse_reply(raw)
    }
}

/// Signed social-API client. Every request carries a timestamp header and
/// an HMAC-SHA256 signature over `METHOD\npath\ntimestamp`, hex-encoded.
pub struct SignedSocialClient {
    client: Client,
    config: SocialConfig,
}

impl SignedSocialClient {
    pub fn new(config: SocialConfig) -> Self {
        Self {
            client: http_client(),
            config,
        }
    }

    fn sign(&self, method: &str, path: &str, timestamp: i64) -> String {
        let payload = format!("{}\n{}\n{}", method, path, timestamp);
        let mut mac = HmacSha256::new_from_slice(self.config.signing_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    async fn fetch_timeline(&self, path: &str) -> Result<Vec<SocialPost>> {
        let timestamp = Utc::now().timestamp();
        let signature = self.sign("GET", path, timestamp);

        let response = self
            .client
            .get(format!("{}{}", self.config.base_url, path))
            .header("x-timestamp", timestamp)
            .header("x-signature", signature)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CuratorError::General(format!(
                "social fetch failed for {}: HTTP {}",
                path,
                response.status()
            )));
        }

        let posts: Vec<SocialPost> = response.json().await?;
        Ok(posts)
    }
}

#[async_trait]
impl SocialTimeline for SignedSocialClient {
    async fn liked_posts(&self, user_id: &str) -> Result<Vec<SocialPost>> {
        self.fetch_timeline(&format!("/users/{}/likes", user_id)).await
    }

    async fn bookmarked_posts(&self, user_id: &str) -> Result<Vec<SocialPost>> {
        self.fetch_timeline(&format!("/users/{}/bookmarks", user_id))
            .await
    }
}
