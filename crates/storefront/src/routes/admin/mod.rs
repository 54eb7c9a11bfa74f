//! Back-office JSON API.
//!
//! Every handler here takes [`RequireAdmin`](crate::middleware::RequireAdmin),
//! which re-reads the role from the database and answers 403 to anonymous
//! callers as well as to non-admins.

pub mod content;
pub mod customers;
pub mod metrics;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, patch, post},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the `/api/admin` router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::list))
        .route("/orders/export", get(orders::export))
        .route("/orders/{id}/notes", post(orders::add_note))
        .route("/metrics", get(metrics::summary))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{slug}",
            patch(products::update).delete(products::delete),
        )
        .route("/customers", get(customers::list))
        .route("/content", get(content::list))
}

/// Which end of a date range a query parameter bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

/// Parse a `from`/`to` query parameter.
///
/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (UTC). A plain
/// `to` date covers the whole day. Blank values mean no bound.
fn parse_bound(field: &str, value: Option<&str>, bound: Bound) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(at.with_timezone(&Utc)));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::invalid_field(field, "Expected a date (YYYY-MM-DD)"))?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
            .ok_or_else(|| AppError::Internal("invalid end-of-day time".to_string()))?,
    };

    Ok(Some(date.and_time(time).and_utc()))
}

/// Parse an optional `from`/`to` pair.
pub(crate) fn parse_range(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    Ok((
        parse_bound("from", from, Bound::Start)?,
        parse_bound("to", to, Bound::End)?,
    ))
}
