//! Wishlist route handlers. All require a session.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;
use validator::Validate;

use anna_paris_core::ProductId;

use crate::db::WishlistRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, ValidatedJson};
use crate::models::WishlistEntry;
use crate::state::AppState;

/// Body of `POST /api/wishlist`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToWishlistRequest {
    pub product_id: ProductId,
}

/// The caller's wishlist, most recently added first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<WishlistEntry>>> {
    let entries = WishlistRepository::new(state.pool()).list(user.id).await?;
    Ok(Json(entries))
}

/// Add a product. Adding one that is already listed changes nothing.
#[instrument(skip(state, user, body), fields(user_id = %user.id, product_id = %body.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ValidatedJson(body): ValidatedJson<AddToWishlistRequest>,
) -> Result<Json<WishlistEntry>> {
    let entry = WishlistRepository::new(state.pool())
        .add(user.id, body.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(entry))
}

/// Remove a product if it is listed.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<Json<Value>> {
    let product_id: ProductId = product_id
        .parse()
        .map_err(|_| AppError::NotFound("Product not found".to_string()))?;

    WishlistRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;

    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::{delete, get};
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_support::{test_config, test_state};

    fn app() -> Router {
        Router::new()
            .route("/api/wishlist", get(list).post(add))
            .route("/api/wishlist/{product_id}", delete(remove))
            .with_state(test_state(test_config()))
    }

    #[test]
    fn test_add_request_accepts_camel_case() {
        let body: AddToWishlistRequest =
            serde_json::from_value(json!({ "productId": 7 })).unwrap();
        assert_eq!(body.product_id, ProductId::new(7));
    }

    #[tokio::test]
    async fn test_wishlist_requires_session() {
        let list = app()
            .oneshot(Request::get("/api/wishlist").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(list.status(), StatusCode::UNAUTHORIZED);

        let add = app()
            .oneshot(
                Request::post("/api/wishlist")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"productId": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(add.status(), StatusCode::UNAUTHORIZED);

        let remove = app()
            .oneshot(Request::delete("/api/wishlist/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(remove.status(), StatusCode::UNAUTHORIZED);
    }
}
