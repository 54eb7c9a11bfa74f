//! Integration tests for the ANNA PARIS storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! task db:start
//! cargo run -p anna-paris-cli -- migrate
//!
//! # Database tests
//! TEST_DATABASE_URL=postgres://... cargo test -p anna-paris-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `order_pipeline` - checkout and payment reconciliation against a real database
//! - `storefront_api` - HTTP tests against a running storefront
//!
//! Every test is `#[ignore]`d so `cargo test` stays hermetic.

use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use anna_paris_core::{CategoryId, Price, ProductId};
use anna_paris_storefront::db::products::NewProduct;
use anna_paris_storefront::db::{CategoryRepository, ProductRepository, create_pool};

/// Base URL of a running storefront (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Connect to the test database named by `TEST_DATABASE_URL`.
///
/// # Panics
///
/// Panics if the variable is unset or the database is unreachable.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to test database")
}

/// A unique, well-formed slug for test fixtures.
#[must_use]
pub fn unique_slug(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Create a published product in the `others` category.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn create_product(pool: &PgPool, price: i64, stock: i32) -> ProductId {
    let categories = CategoryRepository::new(pool);
    categories
        .ensure_canonical()
        .await
        .expect("Failed to seed categories");
    let category_id: CategoryId = categories
        .id_by_slug("others")
        .await
        .expect("Failed to look up category")
        .expect("Canonical category missing");

    let slug = unique_slug("it-product");
    let (id, _) = ProductRepository::new(pool)
        .create(&NewProduct {
            name: format!("Test Piece {slug}"),
            slug,
            description: None,
            price: Price::new(price),
            compare_at_price: None,
            stock,
            category_id,
            published: true,
            featured: false,
            images: vec!["https://cdn.annaparis.com/test.jpg".to_string()],
        })
        .await
        .expect("Failed to create product");

    id
}

/// Current stock of a product.
///
/// # Panics
///
/// Panics if the product does not exist.
pub async fn product_stock(pool: &PgPool, id: ProductId) -> i32 {
    sqlx::query_scalar::<_, i32>("SELECT stock FROM shop.product WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("Failed to read stock")
}

/// Hide a product from the shop.
///
/// # Panics
///
/// Panics if the update fails.
pub async fn unpublish_product(pool: &PgPool, id: ProductId) {
    sqlx::query("UPDATE shop.product SET published = FALSE WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .expect("Failed to unpublish product");
}

/// Number of order lines that reference a product.
///
/// # Panics
///
/// Panics if the query fails.
pub async fn order_item_count(pool: &PgPool, product_id: ProductId) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM shop.order_item WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count order items")
}

/// Number of saved addresses, and of orders shipping to them, whose
/// `company` field is `marker`.
///
/// # Panics
///
/// Panics if the query fails.
pub async fn address_and_order_count(pool: &PgPool, marker: &str) -> (i64, i64) {
    sqlx::query_as::<_, (i64, i64)>(
        r"
        SELECT COUNT(DISTINCT a.id), COUNT(o.id)
        FROM shop.address a
        LEFT JOIN shop.order o ON o.shipping_address_id = a.id
        WHERE a.company = $1
        ",
    )
    .bind(marker)
    .fetch_one(pool)
    .await
    .expect("Failed to count addresses")
}
