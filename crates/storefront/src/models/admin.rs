//! Back-office read models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use anna_paris_core::{ContentPageId, Price, UserId};

/// A customer with the number of orders they placed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub order_count: i64,
}

/// A CMS page as listed in the back office.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPageSummary {
    pub id: ContentPageId,
    pub title: String,
    pub slug: String,
    pub published: bool,
    pub updated_at: DateTime<Utc>,
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreMetrics {
    pub orders: i64,
    pub products: i64,
    pub customers: i64,
    pub revenue: Price,
}
