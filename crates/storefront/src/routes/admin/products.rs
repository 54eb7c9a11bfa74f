//! Back-office catalog management.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;
use validator::{Validate, ValidationError};

use anna_paris_core::{CategoryId, Price, ProductId};

use crate::db::ProductRepository;
use crate::db::RepositoryError;
use crate::db::products::{NewProduct, ProductUpdate};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, ValidatedJson};
use crate::models::Product;
use crate::state::AppState;

// =============================================================================
// Validation
// =============================================================================

/// Lower-case letters, digits and single hyphens between them.
fn validate_slug(slug: &str) -> std::result::Result<(), ValidationError> {
    let well_formed = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("slug")
            .with_message("Slug may only contain lower-case letters, digits and hyphens".into()))
    }
}

#[allow(clippy::ptr_arg)]
fn validate_image_urls(images: &Vec<String>) -> std::result::Result<(), ValidationError> {
    if images.iter().all(|image| url::Url::parse(image).is_ok()) {
        Ok(())
    } else {
        Err(ValidationError::new("url").with_message("Every image must be a URL".into()))
    }
}

const fn default_published() -> bool {
    true
}

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /api/admin/products`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: i64,
    #[validate(range(min = 1, message = "Compare-at price must be positive"))]
    pub compare_at_price: Option<i64>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    #[serde(default)]
    pub stock: i32,
    pub category_id: CategoryId,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub featured: bool,
    #[validate(
        length(min = 1, message = "At least one image is required"),
        custom(function = "validate_image_urls")
    )]
    pub images: Vec<String>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(body: CreateProductRequest) -> Self {
        Self {
            name: body.name.trim().to_string(),
            slug: body.slug,
            description: body.description.filter(|d| !d.trim().is_empty()),
            price: Price::new(body.price),
            compare_at_price: body.compare_at_price.map(Price::new),
            stock: body.stock,
            category_id: body.category_id,
            published: body.published,
            featured: body.featured,
            images: body.images,
        }
    }
}

/// Body of `PATCH /api/admin/products/{slug}`. Absent fields are unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Price must be positive"))]
    pub price: Option<i64>,
    #[validate(range(min = 1, message = "Compare-at price must be positive"))]
    pub compare_at_price: Option<i64>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub published: Option<bool>,
    pub featured: Option<bool>,
}

impl From<UpdateProductRequest> for ProductUpdate {
    fn from(body: UpdateProductRequest) -> Self {
        Self {
            name: body.name.map(|n| n.trim().to_string()),
            slug: body.slug,
            description: body.description,
            price: body.price.map(Price::new),
            compare_at_price: body.compare_at_price.map(Price::new),
            stock: body.stock,
            category_id: body.category_id,
            published: body.published,
            featured: body.featured,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedProduct {
    pub id: ProductId,
    pub slug: String,
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

fn slug_taken() -> AppError {
    AppError::Conflict("A product with this slug already exists".to_string())
}

// =============================================================================
// Handlers
// =============================================================================

/// Every product, published or not, newest first.
#[instrument(skip(state, _admin))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list_all().await?;
    Ok(Json(products))
}

/// Create a product.
#[instrument(skip(state, admin, body), fields(slug = %body.slug))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidatedJson(body): ValidatedJson<CreateProductRequest>,
) -> Result<Json<CreatedProduct>> {
    let (id, slug) = ProductRepository::new(state.pool())
        .create(&body.into())
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => slug_taken(),
            other => other.into(),
        })?;

    tracing::info!(product_id = %id, %slug, admin = %admin.email, "Product created");

    Ok(Json(CreatedProduct { id, slug }))
}

/// Update some fields of a product.
#[instrument(skip(state, admin, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(slug): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateProductRequest>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .update(&slug, &body.into())
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => product_not_found(),
            RepositoryError::Conflict(_) => slug_taken(),
            other => other.into(),
        })?;

    tracing::info!(product_id = %product.id, admin = %admin.email, "Product updated");

    Ok(Json(product))
}

/// Delete a product. Past orders keep their line snapshots.
#[instrument(skip(state, admin))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(slug): Path<String>,
) -> Result<Json<Value>> {
    ProductRepository::new(state.pool())
        .delete(&slug)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => product_not_found(),
            other => other.into(),
        })?;

    tracing::info!(%slug, admin = %admin.email, "Product deleted");

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn create_body(overrides: Value) -> CreateProductRequest {
        let mut body = json!({
            "name": "Pearl Drop Earrings",
            "slug": "pearl-drop-earrings",
            "price": 1290,
            "categoryId": 2,
            "images": ["https://cdn.annaparis.com/p/pearl-drop.jpg"]
        });
        if let (Some(body), Some(overrides)) = (body.as_object_mut(), overrides.as_object()) {
            body.extend(overrides.clone());
        }
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_create_defaults() {
        let body = create_body(json!({}));
        assert!(body.validate().is_ok());

        let product = NewProduct::from(body);
        assert_eq!(product.stock, 0);
        assert!(product.published);
        assert!(!product.featured);
        assert_eq!(product.price, Price::new(1290));
    }

    #[test]
    fn test_create_rejects_bad_fields() {
        assert!(create_body(json!({ "price": 0 })).validate().is_err());
        assert!(create_body(json!({ "stock": -1 })).validate().is_err());
        assert!(create_body(json!({ "images": [] })).validate().is_err());
        assert!(create_body(json!({ "images": ["not a url"] })).validate().is_err());
        assert!(create_body(json!({ "slug": "Pearl Drop" })).validate().is_err());
        assert!(create_body(json!({ "compareAtPrice": 0 })).validate().is_err());
    }

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("gold-hoop-2").is_ok());
        assert!(validate_slug("-gold").is_err());
        assert!(validate_slug("gold--hoop").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_update_is_partial() {
        let body: UpdateProductRequest =
            serde_json::from_value(json!({ "stock": 3, "featured": true })).unwrap();
        assert!(body.validate().is_ok());

        let update = ProductUpdate::from(body);
        assert_eq!(update.stock, Some(3));
        assert_eq!(update.featured, Some(true));
        assert!(update.name.is_none());
        assert!(update.price.is_none());
    }
}
