//! Category repository.

use sqlx::PgPool;

use anna_paris_core::CategoryId;

use super::RepositoryError;
use crate::models::Category;

/// The six canonical categories as `(slug, name, sort order)`.
pub const CANONICAL_CATEGORIES: [(&str, &str, i32); 6] = [
    ("necklaces", "Necklaces", 1),
    ("earrings", "Earrings", 2),
    ("bracelets", "Bracelets", 3),
    ("rings", "Rings", 4),
    ("sets", "Sets", 5),
    ("others", "Others", 6),
];

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    slug: String,
    name: String,
    sort_order: i32,
    product_count: i64,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            sort_order: row.sort_order,
            product_count: row.product_count,
        }
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert the canonical categories, refreshing name and sort order.
    ///
    /// Idempotent; safe to call on every catalog read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure_canonical(&self) -> Result<(), RepositoryError> {
        let slugs: Vec<&str> = CANONICAL_CATEGORIES.iter().map(|c| c.0).collect();
        let names: Vec<&str> = CANONICAL_CATEGORIES.iter().map(|c| c.1).collect();
        let orders: Vec<i32> = CANONICAL_CATEGORIES.iter().map(|c| c.2).collect();

        sqlx::query(
            r"
            INSERT INTO shop.category (slug, name, sort_order)
            SELECT * FROM UNNEST($1::text[], $2::text[], $3::int4[])
            ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name, sort_order = EXCLUDED.sort_order
            ",
        )
        .bind(&slugs)
        .bind(&names)
        .bind(&orders)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// List all categories by sort order with their product counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT c.id, c.slug, c.name, c.sort_order,
                   COUNT(p.id) AS product_count
            FROM shop.category c
            LEFT JOIN shop.product p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.sort_order, c.id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// Look up a category id by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn id_by_slug(&self, slug: &str) -> Result<Option<CategoryId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, CategoryId>("SELECT id FROM shop.category WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_categories_are_ordered() {
        let orders: Vec<i32> = CANONICAL_CATEGORIES.iter().map(|(_, _, o)| *o).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(CANONICAL_CATEGORIES[0].0, "necklaces");
        assert_eq!(CANONICAL_CATEGORIES[5].0, "others");
    }
}
