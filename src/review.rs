//! The editorial decision point. Suggestions move `pending -> approved`
//! or `pending -> rejected`, both terminal; `update` patches suggested
//! fields while still pending. Approval is the only place a published
//! post is ever created, and it happens in the same transaction as the
//! status flip.

use crate::types::{
    ApproveOverrides, BulkOutcome, CuratorError, Result, Section, Suggestion, SuggestionPatch,
    SuggestionStatus,
};
use crate::queue::row_to_suggestion;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

/// Minimum resolved content length an approval will accept.
pub const MIN_CONTENT_CHARS: usize = 10;

const SLUG_MAX_CHARS: usize = 80;

/// Markup that must never reach a published post. Any match in title,
/// excerpt or content blocks the whole request; nothing is sanitized.
static DANGEROUS_MARKUP: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<script",
        r"(?i)javascript:",
        r"(?i)\bon\w+\s*=",
        r"(?i)<iframe",
        r"(?i)<object",
        r"(?i)<embed",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("denylist pattern"))
    .collect()
});

/// Reference to the post materialized by a successful approval.
#[derive(Debug, Clone)]
pub struct ApprovedPost {
    pub post_id: Uuid,
    pub slug: String,
}

/// Final field values for a post, after override/suggested/original
/// precedence has been applied and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPost {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub section: Section,
    pub tag: String,
}

#[derive(Clone)]
pub struct ReviewWorkflow {
    db: Pool<Postgres>,
}

impl ReviewWorkflow {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }

    /// Approve a pending suggestion and materialize its published post.
    /// The post insert and the conditional status flip share a transaction:
    /// losing the race, or any insert failure, leaves the suggestion
    /// untouched.
    pub async fn approve(&self, id: Uuid, overrides: &ApproveOverrides) -> Result<ApprovedPost> {
        let suggestion = self.fetch_suggestion(id).await?;
        if suggestion.status != SuggestionStatus::Pending {
            return Err(CuratorError::AlreadyReviewed { id });
        }

        let resolved = resolve_approval(&suggestion, overrides)?;
        ensure_safe_fields(&[
            ("title", Some(&resolved.title)),
            ("excerpt", Some(&resolved.excerpt)),
            ("content", Some(&resolved.content)),
        ])?;

        let now = chrono::Utc::now();
        let slug = derive_slug(&resolved.title, now.timestamp_millis());
        let post_id = Uuid::new_v4();

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO published_posts
                (id, suggestion_id, slug, title, excerpt, content, section, tag, source_url, published, created_at, date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, true, $10, $11)
            "#,
        )
        .bind(post_id)
        .bind(suggestion.id)
        .bind(&slug)
        .bind(&resolved.title)
        .bind(&resolved.excerpt)
        .bind(&resolved.content)
        .bind(resolved.section.as_str())
        .bind(&resolved.tag)
        .bind(&suggestion.source_url)
        .bind(now)
        .bind(now.date_naive())
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query(
            r#"
            UPDATE content_suggestions
            SET status = 'approved', reviewed_at = $1
            WHERE id = $2 AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Someone else decided this suggestion between our read and the
            // conditional update. Dropping the transaction rolls the post
            // insert back.
            warn!("Lost approve race for suggestion {}", id);
            return Err(CuratorError::AlreadyReviewed { id });
        }

        tx.commit().await?;

        info!("Approved suggestion {} as post {} ({})", id, post_id, slug);
        Ok(ApprovedPost { post_id, slug })
    }

    /// Reject a pending suggestion. Terminal; no content requirements.
    pub async fn reject(&self, id: Uuid) -> Result<()> {
        let now = chrono::Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE content_suggestions
            SET status = 'rejected', reviewed_at = $1
            WHERE id = $2 AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish "never existed" from "already decided".
            let suggestion = self.fetch_suggestion(id).await?;
            return Err(CuratorError::AlreadyReviewed { id: suggestion.id });
        }

        info!("Rejected suggestion {}", id);
        Ok(())
    }

    /// Patch the suggested fields of a pending suggestion. Only provided
    /// fields are overwritten.
    pub async fn update(&self, id: Uuid, patch: &SuggestionPatch) -> Result<()> {
        if patch.is_empty() {
            return Err(CuratorError::Validation(
                "update patch contains no fields".to_string(),
            ));
        }

        ensure_safe_fields(&[
            ("title", patch.title.as_deref()),
            ("excerpt", patch.excerpt.as_deref()),
            ("content", patch.content.as_deref()),
        ])?;

        let current = self.fetch_suggestion(id).await?;
        if current.status != SuggestionStatus::Pending {
            return Err(CuratorError::AlreadyReviewed { id });
        }

        let title = patch.title.clone().or(current.suggested_title);
        let excerpt = patch.excerpt.clone().or(current.suggested_excerpt);
        let content = patch.content.clone().or(current.suggested_content);
        let section = patch
            .section
            .map(|s| s.as_str().to_string())
            .or(current.suggested_section);
        let tag = patch.tag.clone().or(current.suggested_tag);

        let result = sqlx::query(
            r#"
            UPDATE content_suggestions
            SET suggested_title = $1,
                suggested_excerpt = $2,
                suggested_content = $3,
                suggested_section = $4,
                suggested_tag = $5
            WHERE id = $6 AND status = 'pending'
            "#,
        )
        .bind(title)
        .bind(excerpt)
        .bind(content)
        .bind(section)
        .bind(tag)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CuratorError::AlreadyReviewed { id });
        }
        Ok(())
    }

    /// Approve a client-selected set sequentially. Partial failure is
    /// expected and reported, not propagated.
    pub async fn bulk_approve(&self, ids: &[Uuid]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            match self.approve(id, &ApproveOverrides::default()).await {
                Ok(_) => outcome.succeeded += 1,
                Err(e) => {
                    outcome.failed += 1;
                    outcome.errors.push(format!("{}: {}", id, e));
                }
            }
        }
        outcome
    }

    pub async fn bulk_reject(&self, ids: &[Uuid]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            match self.reject(id).await {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    outcome.failed += 1;
                    outcome.errors.push(format!("{}: {}", id, e));
                }
            }
        }
        outcome
    }

    async fn fetch_suggestion(&self, id: Uuid) -> Result<Suggestion> {
        let row = sqlx::query("SELECT * FROM content_suggestions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => row_to_suggestion(&row),
            None => Err(CuratorError::SuggestionNotFound { id }),
        }
    }
}

/// Resolve final post fields: explicit override, then suggested field,
/// then original fallback (title only; an unprocessed suggestion without
/// a content override cannot pass the length check below).
pub fn resolve_approval(
    suggestion: &Suggestion,
    overrides: &ApproveOverrides,
) -> Result<ResolvedPost> {
    let title = overrides
        .title
        .clone()
        .or_else(|| suggestion.suggested_title.clone())
        .unwrap_or_else(|| suggestion.original_title.clone());

    if title.trim().is_empty() {
        return Err(CuratorError::Validation(
            "approval requires a non-empty title".to_string(),
        ));
    }

    let excerpt = overrides
        .excerpt
        .clone()
        .or_else(|| suggestion.suggested_excerpt.clone())
        .unwrap_or_default();

    let content = overrides
        .content
        .clone()
        .or_else(|| suggestion.suggested_content.clone())
        .unwrap_or_default();

    if content.trim().chars().count() < MIN_CONTENT_CHARS {
        return Err(CuratorError::Validation(format!(
            "approval requires at least {} characters of content; process or edit the suggestion first",
            MIN_CONTENT_CHARS
        )));
    }

    let section = match overrides.section {
        Some(section) => section,
        None => suggestion
            .suggested_section
            .as_deref()
            .map(Section::from_str)
            .transpose()?
            .unwrap_or(Section::Weekly),
    };

    let tag = overrides
        .tag
        .clone()
        .or_else(|| suggestion.suggested_tag.clone())
        .unwrap_or_default();

    Ok(ResolvedPost {
        title,
        excerpt,
        content,
        section,
        tag,
    })
}

/// Block the whole request when any provided field carries dangerous
/// markup.
pub fn ensure_safe_fields(fields: &[(&str, Option<&str>)]) -> Result<()> {
    for (name, value) in fields {
        let Some(value) = value else { continue };
        if DANGEROUS_MARKUP.iter().any(|p| p.is_match(value)) {
            return Err(CuratorError::Validation(format!(
                "{} contains disallowed markup",
                name
            )));
        }
    }
    Ok(())
}

/// Derive a URL-safe slug from a title: lowercase, whitespace collapsed to
/// single hyphens, everything but word characters (Hebrew included) and
/// hyphens dropped, capped at 80 chars, then a base-36 millisecond suffix
/// for uniqueness.
pub fn derive_slug(title: &str, now_millis: i64) -> String {
    let lowered = title.to_lowercase();

    let mut filtered = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        if c.is_whitespace() {
            filtered.push('-');
        } else if c.is_ascii_alphanumeric()
            || c == '_'
            || c == '-'
            || ('\u{0590}'..='\u{05FF}').contains(&c)
        {
            filtered.push(c);
        }
    }

    let mut slug = String::with_capacity(filtered.len());
    for c in filtered.chars() {
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    let slug: String = slug.trim_matches('-').chars().take(SLUG_MAX_CHARS).collect();
    let slug = slug.trim_end_matches('-');

    let base = if slug.is_empty() { "post" } else { slug };
    format!("{}-{}", base, to_base36(now_millis.max(0) as u64))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pending_suggestion() -> Suggestion {
        Suggestion {
            id: Uuid::new_v4(),
            source_id: None,
            source_url: Some("https://example.com/post".to_string()),
            original_title: "Original title".to_string(),
            original_content: "Original body text".to_string(),
            status: SuggestionStatus::Pending,
            suggested_title: None,
            suggested_excerpt: None,
            suggested_content: None,
            suggested_section: None,
            suggested_tag: None,
            fetched_at: Utc::now(),
            reviewed_at: None,
        }
    }

    #[test]
    fn approval_of_unprocessed_suggestion_fails_on_content() {
        let suggestion = pending_suggestion();
        let err = resolve_approval(&suggestion, &ApproveOverrides::default()).unwrap_err();
        assert!(matches!(err, CuratorError::Validation(_)));
    }

    #[test]
    fn content_has_no_original_fallback_but_title_does() {
        let mut suggestion = pending_suggestion();
        suggestion.suggested_content = Some("A body long enough to publish".to_string());

        let resolved = resolve_approval(&suggestion, &ApproveOverrides::default()).unwrap();
        assert_eq!(resolved.title, "Original title");
        assert_eq!(resolved.content, "A body long enough to publish");
        assert_eq!(resolved.section, Section::Weekly);
    }

    #[test]
    fn overrides_win_over_suggested_fields() {
        let mut suggestion = pending_suggestion();
        suggestion.suggested_title = Some("Suggested".to_string());
        suggestion.suggested_content = Some("Suggested content body".to_string());
        suggestion.suggested_section = Some("tools".to_string());

        let overrides = ApproveOverrides {
            title: Some("Override".to_string()),
            section: Some(Section::Viral),
            ..Default::default()
        };

        let resolved = resolve_approval(&suggestion, &overrides).unwrap();
        assert_eq!(resolved.title, "Override");
        assert_eq!(resolved.content, "Suggested content body");
        assert_eq!(resolved.section, Section::Viral);
    }

    #[test]
    fn short_content_is_rejected() {
        let mut suggestion = pending_suggestion();
        suggestion.suggested_content = Some("too short".to_string());
        assert!(resolve_approval(&suggestion, &ApproveOverrides::default()).is_err());
    }

    #[test]
    fn safety_gate_blocks_dangerous_markup() {
        for bad in [
            "<script>alert(1)</script>",
            "click <a href=\"JAVASCRIPT:alert(1)\">here</a>",
            "<img src=x onerror=alert(1)>",
            "<IFRAME src=\"https://evil.example\">",
            "<object data=x>",
            "<embed src=x>",
        ] {
            assert!(
                ensure_safe_fields(&[("content", Some(bad))]).is_err(),
                "should block: {bad}"
            );
        }
        assert!(ensure_safe_fields(&[("content", Some("plain <b>bold</b> text"))]).is_ok());
        assert!(ensure_safe_fields(&[("content", None)]).is_ok());
    }

    #[test]
    fn slug_shape() {
        let slug = derive_slug("Hello, World! This is News", 1_700_000_000_000);
        let (base, ts) = slug.rsplit_once('-').unwrap();
        assert_eq!(base, "hello-world-this-is-news");
        assert_eq!(ts, to_base36(1_700_000_000_000));
    }

    #[test]
    fn slug_keeps_hebrew() {
        let slug = derive_slug("חדשות AI השבוע", 42);
        assert!(slug.starts_with("חדשות-ai-השבוע-"));
    }

    #[test]
    fn identical_titles_get_distinct_slugs() {
        let a = derive_slug("Same Title", 1_000);
        let b = derive_slug("Same Title", 1_001);
        assert_ne!(a, b);
    }

    #[test]
    fn slug_caps_base_length() {
        let long_title = "word ".repeat(50);
        let slug = derive_slug(&long_title, 7);
        let (base, _) = slug.rsplit_once('-').unwrap();
        assert!(base.chars().count() <= 80);
    }

    #[test]
    fn empty_title_falls_back_to_post() {
        assert!(derive_slug("!!!", 7).starts_with("post-"));
    }
}
