//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use anna_paris_core::{ProductId, ReviewId, ReviewStatus, UserId};

use super::RepositoryError;
use crate::models::Review;

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    author_name: String,
    rating: i16,
    title: Option<String>,
    body: String,
    status: ReviewStatus,
    verified_purchase: bool,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            author_name: row.author_name,
            rating: row.rating,
            title: row.title,
            body: row.body,
            status: row.status,
            verified_purchase: row.verified_purchase,
            created_at: row.created_at,
        }
    }
}

/// A review as submitted by a customer.
#[derive(Debug, Clone)]
pub struct NewReview<'a> {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub author_name: &'a str,
    pub rating: i16,
    pub title: Option<&'a str>,
    pub body: &'a str,
    pub verified_purchase: bool,
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of a product's approved reviews, newest first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_approved(
        &self,
        product_id: ProductId,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Review>, i64), RepositoryError> {
        let offset = (page - 1).saturating_mul(page_size);

        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, product_id, author_name, rating, title, body, status,
                   verified_purchase, created_at
            FROM shop.review
            WHERE product_id = $1 AND status = 'approved'
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(product_id)
        .bind(page_size)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM shop.review WHERE product_id = $1 AND status = 'approved'",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok((rows.into_iter().map(Review::from).collect(), total))
    }

    /// Whether the user has a paid order containing the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_paid_order_with_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1
                FROM shop.order o
                JOIN shop.order_item i ON i.order_id = o.id
                WHERE o.user_id = $1 AND i.product_id = $2 AND o.payment_status = 'paid'
            )
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Store a new review awaiting moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, review: &NewReview<'_>) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            INSERT INTO shop.review
                (product_id, user_id, author_name, rating, title, body, status, verified_purchase)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            RETURNING id, product_id, author_name, rating, title, body, status,
                      verified_purchase, created_at
            ",
        )
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(review.author_name)
        .bind(review.rating)
        .bind(review.title)
        .bind(review.body)
        .bind(review.verified_purchase)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
