//! Back-office order list, CSV export and internal notes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use anna_paris_core::{NoteError, OrderNote, OrderStatus, note_author};

use crate::db::OrderRepository;
use crate::db::orders::OrderFilter;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::middleware::rate_limit::{self, ADMIN_NOTES};
use crate::models::Order;
use crate::services::export::{CSV_CONTENT_TYPE, CSV_DISPOSITION, orders_to_csv};
use crate::state::AppState;

use super::parse_range;
use crate::routes::orders::order_not_found;
use crate::routes::parse_order_id;

// =============================================================================
// Request Types
// =============================================================================

/// Query parameters shared by the list and the export.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    /// Substring of the order number or customer email.
    pub q: Option<String>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl OrderListQuery {
    fn into_filter(self) -> Result<OrderFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(
                s.parse::<OrderStatus>()
                    .map_err(|_| AppError::invalid_field("status", "Unknown order status"))?,
            ),
        };
        let (from, to) = parse_range(self.from.as_deref(), self.to.as_deref())?;

        Ok(OrderFilter {
            query: self.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
            status,
            from,
            to,
        })
    }
}

/// Body of `POST /api/admin/orders/{id}/notes`.
#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddNoteResponse {
    pub ok: bool,
    pub entry: OrderNote,
}

// =============================================================================
// Handlers
// =============================================================================

/// All orders matching the filter, newest first.
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>> {
    let filter = query.into_filter()?;
    let orders = OrderRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(orders))
}

/// The same orders as a CSV download.
#[instrument(skip(state, admin), fields(admin = %admin.email))]
pub async fn export(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse> {
    let filter = query.into_filter()?;
    let orders = OrderRepository::new(state.pool()).list(&filter).await?;

    tracing::info!(count = orders.len(), "Orders exported");

    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, CSV_DISPOSITION),
        ],
        orders_to_csv(&orders),
    ))
}

/// Prepend an internal note to an order.
#[instrument(skip(state, admin, headers, body), fields(admin = %admin.email))]
pub async fn add_note(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AddNoteRequest>,
) -> Result<Json<AddNoteResponse>> {
    rate_limit::enforce(&state, &ADMIN_NOTES, &headers)?;

    let order_id = parse_order_id(&id)?;
    let author = note_author(Some(admin.email.as_str()), Some(&admin.id.to_string()));
    let entry = OrderNote::new(author, body.message.as_deref().unwrap_or_default(), chrono::Utc::now())
        .map_err(|e| match e {
            NoteError::Empty => AppError::BadRequest("Message required".to_string()),
            NoteError::TooLong => AppError::invalid_field("message", e.to_string()),
        })?;

    if !OrderRepository::new(state.pool())
        .prepend_note(order_id, &entry)
        .await?
    {
        return Err(order_not_found());
    }

    tracing::info!(%order_id, note_id = %entry.id, "Order note added");

    Ok(Json(AddNoteResponse { ok: true, entry }))
}
