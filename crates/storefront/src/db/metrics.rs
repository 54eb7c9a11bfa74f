//! Dashboard counters.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use anna_paris_core::Price;

use super::RepositoryError;
use crate::models::StoreMetrics;

#[derive(sqlx::FromRow)]
struct MetricsRow {
    orders: i64,
    revenue: i64,
    products: i64,
    customers: i64,
}

/// Repository for back-office metrics.
pub struct MetricsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MetricsRepository<'a> {
    /// Create a new metrics repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store-wide counters.
    ///
    /// The optional range bounds (inclusive) apply to the order count and
    /// revenue only; products and customers are always all-time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<StoreMetrics, RepositoryError> {
        let row = sqlx::query_as::<_, MetricsRow>(
            r"
            WITH ranged AS (
                SELECT total FROM shop.order
                WHERE ($1::timestamptz IS NULL OR created_at >= $1)
                  AND ($2::timestamptz IS NULL OR created_at <= $2)
            )
            SELECT
                (SELECT COUNT(*) FROM ranged) AS orders,
                (SELECT COALESCE(SUM(total), 0)::BIGINT FROM ranged) AS revenue,
                (SELECT COUNT(*) FROM shop.product) AS products,
                (SELECT COUNT(*) FROM shop.user WHERE role = 'customer') AS customers
            ",
        )
        .bind(from)
        .bind(to)
        .fetch_one(self.pool)
        .await?;

        Ok(StoreMetrics {
            orders: row.orders,
            products: row.products,
            customers: row.customers,
            revenue: Price::new(row.revenue),
        })
    }
}
