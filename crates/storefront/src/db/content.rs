//! CMS page repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use anna_paris_core::ContentPageId;

use super::RepositoryError;
use crate::models::ContentPageSummary;

#[derive(sqlx::FromRow)]
struct ContentPageRow {
    id: ContentPageId,
    title: String,
    slug: String,
    published: bool,
    updated_at: DateTime<Utc>,
}

/// Repository for content pages.
pub struct ContentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContentRepository<'a> {
    /// Create a new content repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All content pages, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ContentPageSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ContentPageRow>(
            r"
            SELECT id, title, slug, published, updated_at
            FROM shop.content_page
            ORDER BY updated_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ContentPageSummary {
                id: r.id,
                title: r.title,
                slug: r.slug,
                published: r.published,
                updated_at: r.updated_at,
            })
            .collect())
    }
}
