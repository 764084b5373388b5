use crate::types::{CuratorError, Result, Source, SourceKind};
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use std::str::FromStr;
use tracing::info;
use url::Url;
use uuid::Uuid;

/// CRUD over configured content sources. The pipeline only ever reads
/// these; all mutation is admin-driven.
#[derive(Clone)]
pub struct SourceRegistry {
    db: Pool<Postgres>,
}

impl SourceRegistry {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }

    pub async fn add_source(&self, name: &str, url: &str, kind: SourceKind) -> Result<Uuid> {
        validate_source_url(url)?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO sources (id, name, url, kind, active, created_at)
            VALUES ($1, $2, $3, $4, true, $5)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(url)
        .bind(kind.as_str())
        .bind(now)
        .execute(&self.db)
        .await?;

        info!("Added source: {} ({}) with ID: {}", name, url, id);
        Ok(id)
    }

    pub async fn get_source(&self, id: Uuid) -> Result<Source> {
        let row = sqlx::query("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some(row) => row_to_source(&row),
            None => Err(CuratorError::SourceNotFound { id }),
        }
    }

    pub async fn list_sources(&self, only_active: bool) -> Result<Vec<Source>> {
        let rows = if only_active {
            sqlx::query("SELECT * FROM sources WHERE active = true ORDER BY created_at")
                .fetch_all(&self.db)
                .await?
        } else {
            sqlx::query("SELECT * FROM sources ORDER BY created_at")
                .fetch_all(&self.db)
                .await?
        };

        rows.iter().map(row_to_source).collect()
    }

    /// Patch name and/or url; omitted fields are retained.
    pub async fn update_source(
        &self,
        id: Uuid,
        name: Option<&str>,
        url: Option<&str>,
    ) -> Result<()> {
        if let Some(url) = url {
            validate_source_url(url)?;
        }

        let current = self.get_source(id).await?;
        let name = name.unwrap_or(&current.name);
        let url = url.unwrap_or(&current.url);

        sqlx::query("UPDATE sources SET name = $1, url = $2 WHERE id = $3")
            .bind(name)
            .bind(url)
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    pub async fn toggle_source(&self, id: Uuid, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE sources SET active = $1 WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CuratorError::SourceNotFound { id });
        }

        info!("Source {} set active={}", id, active);
        Ok(())
    }

    /// Delete a source. Suggestions keep their weak reference, nothing
    /// cascades.
    pub async fn delete_source(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM sources WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CuratorError::SourceNotFound { id });
        }

        info!("Deleted source: {}", id);
        Ok(())
    }
}

fn validate_source_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(CuratorError::Validation(
            "source url must not be empty".to_string(),
        ));
    }
    let parsed = Url::parse(url)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CuratorError::Validation(format!(
            "source url must be http(s), got scheme '{}'",
            parsed.scheme()
        )));
    }
    Ok(())
}

fn row_to_source(row: &PgRow) -> Result<Source> {
    let kind: String = row.try_get("kind")?;
    Ok(Source {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        url: row.try_get("url")?,
        kind: SourceKind::from_str(&kind)?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
    })
}
