//! Catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::products::{ProductFilter, ProductSort, SortOrder};
use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::models::{Category, Product};
use crate::state::AppState;

/// Largest page the listing returns in one request.
const MAX_LIMIT: i64 = 100;

/// Query parameters for `GET /api/products`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    /// Category slug.
    pub category: Option<String>,
    pub featured: Option<String>,
    pub search: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl ProductListQuery {
    fn into_filter(self) -> ProductFilter {
        ProductFilter {
            category_slug: self.category.filter(|c| !c.is_empty()),
            featured_only: self.featured.as_deref() == Some("true"),
            search: self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            limit: self
                .limit
                .and_then(|l| l.trim().parse::<i64>().ok())
                .filter(|l| *l > 0)
                .map(|l| l.min(MAX_LIMIT)),
            sort: ProductSort::from_param(self.sort.as_deref()),
            order: SortOrder::from_param(self.order.as_deref()),
        }
    }
}

/// Product detail response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub product: Product,
    pub related_products: Vec<Product>,
}

/// Published products.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<Product>>> {
    let filter = query.into_filter();
    let products = ProductRepository::new(state.pool())
        .list_published(&filter)
        .await?;
    Ok(Json(products))
}

/// One product by slug, with related products from its category.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let products = ProductRepository::new(state.pool());
    let product = products
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    let related_products = products.related(&product).await?;

    Ok(Json(ProductDetail {
        product,
        related_products,
    }))
}

/// All categories with product counts.
///
/// Upserts the canonical categories first. A database failure is logged and
/// answered with an empty list so navigation never breaks.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    let repo = CategoryRepository::new(state.pool());

    let result = async {
        repo.ensure_canonical().await?;
        repo.list().await
    }
    .await;

    match result {
        Ok(categories) => Json(categories),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load categories");
            Json(Vec::new())
        }
    }
}
