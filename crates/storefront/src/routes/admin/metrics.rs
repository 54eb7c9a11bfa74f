//! Back-office dashboard counters.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::MetricsRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::StoreMetrics;
use crate::state::AppState;

use super::parse_range;

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Order count and revenue for the range, plus all-time product and
/// customer counts.
#[instrument(skip(state, _admin))]
pub async fn summary(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<StoreMetrics>> {
    let (from, to) = parse_range(query.from.as_deref(), query.to.as_deref())?;
    let metrics = MetricsRepository::new(state.pool()).summary(from, to).await?;
    Ok(Json(metrics))
}
