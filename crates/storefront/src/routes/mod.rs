//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (database)
//! GET  /api/health                     - JSON health check
//!
//! # Orders
//! POST  /api/orders                    - Place an order (guest or signed in)
//! GET   /api/orders                    - Caller's orders (?userId for admins)
//! GET   /api/orders/:id                - Order detail (owner or admin)
//! PATCH /api/orders/:id                - Set status and tracking (admin)
//!
//! # Payments
//! POST /api/payments/stripe/create-session - Hosted card checkout
//! POST /api/webhooks/stripe                - Payment provider events
//!
//! # Catalog
//! GET  /api/products                   - Published products
//! GET  /api/products/:slug             - Product detail with related products
//! GET  /api/categories                 - Categories with product counts
//!
//! # Wishlist (requires auth)
//! GET    /api/wishlist
//! POST   /api/wishlist
//! DELETE /api/wishlist/:productId
//!
//! # Reviews
//! GET  /api/reviews                    - Approved reviews of a product
//! POST /api/reviews                    - Submit a review (requires auth)
//!
//! # Auth
//! POST /api/auth/register
//! POST /api/auth/login
//! POST /api/auth/logout
//! GET  /api/auth/me
//!
//! # Admin (requires admin role)
//! GET    /api/admin/orders
//! GET    /api/admin/orders/export      - CSV
//! POST   /api/admin/orders/:id/notes
//! GET    /api/admin/metrics
//! GET    /api/admin/products
//! POST   /api/admin/products
//! PATCH  /api/admin/products/:slug
//! DELETE /api/admin/products/:slug
//! GET    /api/admin/customers
//! GET    /api/admin/content
//! ```

pub mod admin;
pub mod auth;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod wishlist;

use axum::{
    Router,
    routing::{delete, get, post},
};

use anna_paris_core::OrderId;

use crate::error::{AppError, Result};
use crate::services::access::Access;
use crate::state::AppState;

/// Create the account routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the `/api` router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::api_health))
        // Orders
        .route("/orders", get(orders::list).post(orders::create))
        .route("/orders/{id}", get(orders::get).patch(orders::update))
        // Payments
        .route(
            "/payments/stripe/create-session",
            post(payments::create_session),
        )
        .route("/webhooks/stripe", post(payments::stripe_webhook))
        // Catalog
        .route("/products", get(products::list))
        .route("/products/{slug}", get(products::show))
        .route("/categories", get(products::categories))
        // Wishlist
        .route("/wishlist", get(wishlist::list).post(wishlist::add))
        .route("/wishlist/{product_id}", delete(wishlist::remove))
        // Reviews
        .route("/reviews", get(reviews::list).post(reviews::create))
        .nest("/auth", auth_routes())
        .nest("/admin", admin::routes())
}

/// Create the full application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes())
}

/// Turn an access decision into a response error.
pub(crate) fn check_access(access: Access) -> Result<()> {
    match access {
        Access::Granted => Ok(()),
        Access::Unauthenticated => Err(AppError::Unauthorized(
            "Authentication required".to_string(),
        )),
        Access::Forbidden => Err(AppError::Forbidden),
    }
}

/// Parse an order id from a path segment. Non-numeric ids name no order.
pub(crate) fn parse_order_id(id: &str) -> Result<OrderId> {
    id.parse()
        .map_err(|_| AppError::NotFound("Order not found".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_support::{test_config, test_state};

    fn app() -> Router {
        routes().with_state(test_state(test_config()))
    }

    #[test]
    fn test_check_access() {
        assert!(check_access(Access::Granted).is_ok());
        assert!(matches!(
            check_access(Access::Unauthenticated),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(check_access(Access::Forbidden), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_parse_order_id() {
        assert_eq!(parse_order_id("17").unwrap(), OrderId::new(17));
        assert!(matches!(parse_order_id("ck_17"), Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_order_detail_requires_session() {
        let response = app()
            .oneshot(Request::get("/api/orders/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status_update_requires_admin() {
        let response = app()
            .oneshot(
                Request::patch("/api/orders/1")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"status":"shipped"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_before_the_database() {
        let response = app()
            .oneshot(
                Request::post("/api/orders")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"items":[{"productId":1,"quantity":0}]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_order_bodies_count_toward_rate_limit() {
        let app = app();
        let attempt = || {
            Request::post("/api/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .header("cf-connecting-ip", "203.0.113.9")
                .body(Body::from("{not json"))
                .unwrap()
        };

        for _ in 0..10 {
            let response = app.clone().oneshot(attempt()).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = app.oneshot(attempt()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
