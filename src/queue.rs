use crate::capabilities::DraftPost;
use crate::normalize::normalize_url;
use crate::types::{CuratorError, RawItem, Result, Section, Suggestion, SuggestionStatus};
use crate::utils::text::truncate_chars;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Defensive storage bounds on raw intake text.
pub const MAX_TITLE_CHARS: usize = 500;
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Title prefix the summarizer stamps on auto-rejected items so the review
/// side can surface them without deleting the record.
pub const AUTO_REJECT_PREFIX: &str = "[REJECTED]";

/// Snapshot of every URL already in the queue, in raw and normalized form.
/// Built once per fetch invocation and extended as the batch accepts items,
/// so near-duplicates discovered in the same batch collapse too. Snapshots
/// are not shared across concurrent invocations; that race is closed by
/// the UNIQUE constraint on the normalized_url column, not here.
#[derive(Debug, Default)]
pub struct SeenUrls {
    inner: HashSet<String>,
}

impl SeenUrls {
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = Self::default();
        for url in urls {
            seen.insert(url.as_ref());
        }
        seen
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner.contains(url) || self.inner.contains(&normalize_url(url))
    }

    pub fn insert(&mut self, url: &str) {
        self.inner.insert(url.to_string());
        self.inner.insert(normalize_url(url));
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// The persisted intake queue. Fetchers insert pending suggestions, the
/// summarizer adapter fills them in, the review workflow decides them.
#[derive(Clone)]
pub struct SuggestionQueue {
    db: Pool<Postgres>,
}

impl SuggestionQueue {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }

    /// Build the dedup snapshot from every stored suggestion URL.
    pub async fn seen_urls(&self) -> Result<SeenUrls> {
        let rows = sqlx::query(
            "SELECT source_url FROM content_suggestions WHERE source_url IS NOT NULL",
        )
        .fetch_all(&self.db)
        .await?;

        let urls: Vec<String> = rows
            .iter()
            .filter_map(|row| row.try_get::<Option<String>, _>("source_url").ok().flatten())
            .collect();

        let seen = SeenUrls::from_urls(&urls);
        debug!("Loaded {} seen URLs for dedup", seen.len());
        Ok(seen)
    }

    /// Insert a raw item as a pending suggestion. Returns false when the
    /// normalized URL is already present (the UNIQUE constraint makes the
    /// insert a no-op rather than a failure).
    pub async fn insert_raw(&self, source_id: Option<Uuid>, item: &RawItem) -> Result<bool> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let normalized = normalize_url(&item.source_url);

        let result = sqlx::query(
            r#"
            INSERT INTO content_suggestions
                (id, source_id, source_url, normalized_url, original_title, original_content, status, fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            ON CONFLICT (normalized_url) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(source_id)
        .bind(&item.source_url)
        .bind(&normalized)
        .bind(truncate_chars(&item.title, MAX_TITLE_CHARS))
        .bind(truncate_chars(&item.content, MAX_CONTENT_CHARS))
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, id: Uuid) -> Result<Suggestion> {
        let row = sqlx::query("SELECT * FROM content_suggestions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => row_to_suggestion(&row),
            None => Err(CuratorError::SuggestionNotFound { id }),
        }
    }

    pub async fn list(
        &self,
        status: Option<SuggestionStatus>,
        section: Option<Section>,
    ) -> Result<Vec<Suggestion>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM content_suggestions
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR suggested_section = $2)
            ORDER BY fetched_at DESC
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(section.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(row_to_suggestion).collect()
    }

    /// Oldest pending suggestions the summarizer has not touched yet.
    /// Auto-rejected items carry a stamped title, so they drop out of this
    /// query without leaving the queue.
    pub async fn next_unprocessed(&self, limit: usize) -> Result<Vec<Suggestion>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM content_suggestions
            WHERE status = 'pending' AND suggested_title IS NULL
            ORDER BY fetched_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(row_to_suggestion).collect()
    }

    /// Write back the summarizer's draft. Conditioned on the suggestion
    /// still being pending.
    pub async fn apply_summary(&self, id: Uuid, draft: &DraftPost) -> Result<()> {
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
        .bind(&draft.title)
        .bind(&draft.excerpt)
        .bind(&draft.content)
        .bind(draft.section.as_str())
        .bind(&draft.tag)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CuratorError::AlreadyReviewed { id });
        }
        Ok(())
    }

    /// Stamp an auto-rejected item: the title gets the reject prefix, the
    /// record stays in the queue for the review side to see.
    pub async fn mark_auto_rejected(&self, id: Uuid, original_title: &str) -> Result<()> {
        let stamped = format!("{} {}", AUTO_REJECT_PREFIX, original_title);
        let stamped = truncate_chars(&stamped, MAX_TITLE_CHARS);

        let result = sqlx::query(
            r#"
            UPDATE content_suggestions
            SET suggested_title = $1
            WHERE id = $2 AND status = 'pending'
            "#,
        )
        .bind(stamped)
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CuratorError::AlreadyReviewed { id });
        }

        info!("Auto-rejected suggestion {}", id);
        Ok(())
    }

    /// Queue counters for the stats command.
    pub async fn stats(&self) -> Result<HashMap<String, i64>> {
        let mut stats = HashMap::new();

        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM content_suggestions GROUP BY status",
        )
        .fetch_all(&self.db)
        .await?;

        for row in rows {
            let status: String = row.try_get("status")?;
            let count: i64 = row.try_get("count")?;
            stats.insert(status, count);
        }

        let unprocessed: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM content_suggestions WHERE status = 'pending' AND suggested_title IS NULL",
        )
        .fetch_one(&self.db)
        .await?;
        stats.insert("unprocessed".to_string(), unprocessed.unwrap_or(0));

        Ok(stats)
    }
}

pub(crate) fn row_to_suggestion(row: &PgRow) -> Result<Suggestion> {
    let status: String = row.try_get("status")?;
    Ok(Suggestion {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        source_url: row.try_get("source_url")?,
        original_title: row.try_get("original_title")?,
        original_content: row.try_get("original_content")?,
        status: SuggestionStatus::from_str(&status)?,
        suggested_title: row.try_get("suggested_title")?,
        suggested_excerpt: row.try_get("suggested_excerpt")?,
        suggested_content: row.try_get("suggested_content")?,
        suggested_section: row.try_get("suggested_section")?,
        suggested_tag: row.try_get("suggested_tag")?,
        fetched_at: row.try_get("fetched_at")?,
        reviewed_at: row.try_get("reviewed_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seen_set_matches_across_normalization_variants() {
        let seen = SeenUrls::from_urls(["https://www.site.com/post/"]);
        assert!(seen.contains("https://site.com/post"));
        assert!(seen.contains("https://www.site.com/post/?utm_source=x"));
        assert!(!seen.contains("https://site.com/other-post"));
    }

    #[test]
    fn same_batch_near_duplicates_collapse() {
        let mut seen = SeenUrls::default();
        assert!(!seen.contains("https://site.com/post"));
        seen.insert("https://site.com/post");
        assert!(seen.contains("https://www.site.com/post/"));
        assert!(seen.contains("https://site.com/post#frag"));
    }

    #[test]
    fn empty_snapshot_sees_nothing() {
        let seen = SeenUrls::default();
        assert!(seen.is_empty());
        assert!(!seen.contains("https://site.com/post"));
    }
}
