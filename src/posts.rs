use crate::types::{Post, Result, Section};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use std::str::FromStr;

/// Read side of the published catalog. Posts are created exclusively by
/// the review workflow's approve operation; `published` is write-once-true
/// and no unpublish path exists.
#[derive(Clone)]
pub struct PostStore {
    db: Pool<Postgres>,
}

impl PostStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }

    pub async fn list_published(&self, section: Option<Section>) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM published_posts
            WHERE published = true
              AND ($1::text IS NULL OR section = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(section.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(row_to_post).collect()
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let row = sqlx::query("SELECT * FROM published_posts WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(row_to_post).transpose()
    }
}

fn row_to_post(row: &PgRow) -> Result<Post> {
    let section: String = row.try_get("section")?;
    Ok(Post {
        id: row.try_get("id")?,
        suggestion_id: row.try_get("suggestion_id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        excerpt: row.try_get("excerpt")?,
        content: row.try_get("content")?,
        section: Section::from_str(&section)?,
        tag: row.try_get("tag")?,
        source_url: row.try_get("source_url")?,
        published: row.try_get("published")?,
        created_at: row.try_get("created_at")?,
        date: row.try_get("date")?,
    })
}
