use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of external capability behind a configured source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Twitter,
    Website,
    GoogleAlertsRss,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Twitter => "twitter",
            SourceKind::Website => "website",
            SourceKind::GoogleAlertsRss => "google_alerts_rss",
        }
    }
}

impl FromStr for SourceKind {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "twitter" => Ok(SourceKind::Twitter),
            "website" => Ok(SourceKind::Website),
            "google_alerts_rss" => Ok(SourceKind::GoogleAlertsRss),
            other => Err(CuratorError::Validation(format!(
                "unknown source kind: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured content source. Created and toggled by admins, never
/// mutated by the pipeline itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a suggestion. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Approved => "approved",
            SuggestionStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for SuggestionStatus {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SuggestionStatus::Pending),
            "approved" => Ok(SuggestionStatus::Approved),
            "rejected" => Ok(SuggestionStatus::Rejected),
            other => Err(CuratorError::Validation(format!(
                "unknown suggestion status: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content category a published post is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Weekly,
    Features,
    Tools,
    Viral,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Weekly => "weekly",
            Section::Features => "features",
            Section::Tools => "tools",
            Section::Viral => "viral",
        }
    }
}

impl FromStr for Section {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "weekly" => Ok(Section::Weekly),
            "features" => Ok(Section::Features),
            "tools" => Ok(Section::Tools),
            "viral" => Ok(Section::Viral),
            other => Err(CuratorError::Validation(format!(
                "unknown section: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An intake record for one discovered candidate item, pending editorial
/// decision. The suggested_* fields stay NULL until the summarizer fills
/// them in or an editor writes them by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: Uuid,
    pub source_id: Option<Uuid>,
    pub source_url: Option<String>,
    pub original_title: String,
    pub original_content: String,
    pub status: SuggestionStatus,
    pub suggested_title: Option<String>,
    pub suggested_excerpt: Option<String>,
    pub suggested_content: Option<String>,
    pub suggested_section: Option<String>,
    pub suggested_tag: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Suggestion {
    /// A suggestion is processed once the summarizer has produced both a
    /// title and a body. Unprocessed suggestions cannot be approved as-is.
    pub fn is_processed(&self) -> bool {
        self.suggested_title.is_some() && self.suggested_content.is_some()
    }
}

/// A post materialized from an approved suggestion. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub suggestion_id: Option<Uuid>,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub section: Section,
    pub tag: String,
    pub source_url: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub date: NaiveDate,
}

/// One raw candidate item as produced by a fetcher, before screening.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub source_url: String,
    pub title: String,
    pub content: String,
}

/// Outcome of a fetch batch: how many suggestions were inserted, plus one
/// error string per item or source that failed along the way.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchOutcome {
    pub fetched: usize,
    pub errors: Vec<String>,
}

/// Outcome of a content search run. `fetched` counts raw hits, `approved`
/// counts hits that survived screening and entered the queue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub fetched: usize,
    pub approved: usize,
    pub errors: Vec<String>,
}

/// Outcome of a trending search run; `primary` counts accepted items that
/// were flagged as primary-source content.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendingOutcome {
    pub fetched: usize,
    pub approved: usize,
    pub primary: usize,
    pub errors: Vec<String>,
}

/// Outcome of one summarizer batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessOutcome {
    pub processed: usize,
    pub errors: Vec<String>,
}

/// Outcome of a bulk approve/reject: sequential per-item results, partial
/// failure expected.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Partial patch for a pending suggestion. Only provided fields are
/// overwritten; everything else is retained.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionPatch {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub section: Option<Section>,
    pub tag: Option<String>,
}

impl SuggestionPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.excerpt.is_none()
            && self.content.is_none()
            && self.section.is_none()
            && self.tag.is_none()
    }
}

/// Explicit field overrides for an approve call. Overrides take precedence
/// over suggested_* fields, which take precedence over the original title.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproveOverrides {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub section: Option<Section>,
    pub tag: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CuratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Source not found: {id}")]
    SourceNotFound { id: Uuid },

    #[error("Suggestion not found: {id}")]
    SuggestionNotFound { id: Uuid },

    #[error("Suggestion {id} has already been reviewed")]
    AlreadyReviewed { id: Uuid },

    #[error("Access denied")]
    AccessDenied,

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, CuratorError>;
