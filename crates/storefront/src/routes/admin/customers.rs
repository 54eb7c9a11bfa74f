//! Back-office customer list.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::CustomerRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::CustomerSummary;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CustomerListQuery {
    /// Substring of the email or name.
    pub q: Option<String>,
}

/// Customers with their order counts, newest first.
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<Vec<CustomerSummary>>> {
    let q = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let customers = CustomerRepository::new(state.pool()).list(q).await?;
    Ok(Json(customers))
}
