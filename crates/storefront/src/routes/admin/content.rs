//! Back-office CMS page list.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::ContentRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::ContentPageSummary;
use crate::state::AppState;

/// Content pages, most recently updated first.
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<ContentPageSummary>>> {
    let pages = ContentRepository::new(state.pool()).list().await?;
    Ok(Json(pages))
}
