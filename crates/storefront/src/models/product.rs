//! Catalog domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use anna_paris_core::{CategoryId, JsonList, JsonObject, Price, ProductId};

/// A catalog product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub compare_at_price: Option<Price>,
    pub stock: i32,
    pub published: bool,
    pub featured: bool,
    pub category_id: CategoryId,
    pub category: Option<CategorySummary>,
    pub images: JsonList<String>,
    pub tags: JsonList<String>,
    pub variants: Option<serde_json::Value>,
    pub details: JsonObject,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// First image URL, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// The category embedded in a product.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
}

/// A category with its product count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub sort_order: i32,
    pub product_count: i64,
}
