//! Product review types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use anna_paris_core::{ProductId, ReviewId, ReviewStatus};

/// A product review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub author_name: String,
    pub rating: i16,
    pub title: Option<String>,
    pub body: String,
    pub status: ReviewStatus,
    pub verified_purchase: bool,
    pub created_at: DateTime<Utc>,
}

/// A page of approved reviews plus the product's aggregate rating.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub items: Vec<Review>,
    pub total: i64,
    pub rating_avg: f64,
    pub rating_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
}

impl ReviewPage {
    /// The response served while reviews are switched off.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            rating_avg: 0.0,
            rating_count: 0,
            page: None,
            page_size: None,
        }
    }
}
