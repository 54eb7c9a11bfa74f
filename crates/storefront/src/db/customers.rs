//! Back-office customer listing.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use anna_paris_core::UserId;

use super::{RepositoryError, contains_pattern};
use crate::models::CustomerSummary;

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: UserId,
    email: String,
    name: Option<String>,
    created_at: DateTime<Utc>,
    order_count: i64,
}

/// Repository for customer queries.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Customers (role `customer`) with their order counts, newest first.
    ///
    /// `query` filters on email or name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: Option<&str>) -> Result<Vec<CustomerSummary>, RepositoryError> {
        let mut sql = QueryBuilder::<Postgres>::new(
            r"
            SELECT u.id, u.email, u.name, u.created_at,
                   (SELECT COUNT(*) FROM shop.order o WHERE o.user_id = u.id) AS order_count
            FROM shop.user u
            WHERE u.role = 'customer'
            ",
        );

        if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = contains_pattern(q);
            sql.push(" AND (u.email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        sql.push(" ORDER BY u.created_at DESC, u.id DESC");

        let rows = sql.build_query_as::<CustomerRow>().fetch_all(self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|r| CustomerSummary {
                id: r.id,
                email: r.email,
                name: r.name,
                created_at: r.created_at,
                order_count: r.order_count,
            })
            .collect())
    }
}
