//! Product review handlers.
//!
//! Reading is public. Writing needs a session and stores the review as
//! `pending` until it is moderated. Both sides answer as if there were no
//! reviews while the feature is switched off.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use anna_paris_core::ReviewStatus;

use crate::db::reviews::NewReview;
use crate::db::{ProductRepository, ReviewRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, ValidatedJson};
use crate::models::{Product, ReviewPage};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 5;
const MAX_PAGE_SIZE: i64 = 20;
const MAX_AUTHOR_NAME: usize = 60;
const FALLBACK_AUTHOR: &str = "Customer";

/// Query parameters for `GET /api/reviews`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListQuery {
    /// Product slug.
    pub product: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ReviewListQuery {
    fn page(&self) -> i64 {
        parse_number(self.page.as_deref()).unwrap_or(1).max(1)
    }

    fn page_size(&self) -> i64 {
        parse_number(self.page_size.as_deref())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

fn parse_number(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Body of `POST /api/reviews`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    /// Product slug.
    #[validate(length(min = 1, message = "Product is required"))]
    pub product: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 120, message = "Title must be at most 120 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 5, max = 2000, message = "Review must be 5-2000 characters"))]
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct CreateReviewResponse {
    pub ok: bool,
    pub status: ReviewStatus,
}

/// Author label shown on a review.
fn author_name(name: Option<&str>) -> String {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_AUTHOR)
        .chars()
        .take(MAX_AUTHOR_NAME)
        .collect()
}

async fn product_by_slug(state: &AppState, slug: &str) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// Approved reviews of a product, newest first.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<ReviewPage>> {
    if !state.config().reviews_enabled {
        return Ok(Json(ReviewPage::disabled()));
    }

    let slug = query.product.as_deref().map(str::trim).unwrap_or_default();
    if slug.is_empty() {
        return Err(AppError::BadRequest("product slug required".to_string()));
    }

    let product = product_by_slug(&state, slug).await?;
    let (page, page_size) = (query.page(), query.page_size());

    let (items, total) = ReviewRepository::new(state.pool())
        .list_approved(product.id, page, page_size)
        .await?;

    Ok(Json(ReviewPage {
        items,
        total,
        rating_avg: product.rating_avg,
        rating_count: product.rating_count,
        page: Some(page),
        page_size: Some(page_size),
    }))
}

/// Submit a review for moderation.
///
/// Marked as a verified purchase when the author has a paid order that
/// contains the product.
#[instrument(skip(state, user, body), fields(product = %body.product, rating = body.rating))]
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ValidatedJson(body): ValidatedJson<CreateReviewRequest>,
) -> Result<Json<CreateReviewResponse>> {
    if !state.config().reviews_enabled {
        return Err(AppError::FeatureDisabled("Reviews disabled".to_string()));
    }
    let user = user.ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let product = product_by_slug(&state, &body.product).await?;
    let reviews = ReviewRepository::new(state.pool());

    let verified_purchase = reviews
        .has_paid_order_with_product(user.id, product.id)
        .await?;
    let account = UserRepository::new(state.pool()).get_by_id(user.id).await?;
    let author = author_name(account.as_ref().and_then(|u| u.name.as_deref()));

    let review = reviews
        .create(&NewReview {
            product_id: product.id,
            user_id: user.id,
            author_name: &author,
            rating: body.rating,
            title: body.title.as_deref().filter(|t| !t.trim().is_empty()),
            body: &body.body,
            verified_purchase,
        })
        .await?;

    tracing::info!(review_id = %review.id, verified_purchase, "Review submitted");

    Ok(Json(CreateReviewResponse {
        ok: true,
        status: review.status,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::get;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_support::{test_config, test_state};

    fn app(reviews_enabled: bool) -> Router {
        let mut config = test_config();
        config.reviews_enabled = reviews_enabled;
        Router::new()
            .route("/api/reviews", get(list).post(create))
            .with_state(test_state(config))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn review_post() -> Request<Body> {
        Request::post("/api/reviews")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"product":"pearl-drop","rating":5,"body":"Lovely finish"}"#,
            ))
            .unwrap()
    }

    #[test]
    fn test_paging_is_clamped() {
        let query = ReviewListQuery {
            product: Some("pearl-drop".into()),
            page: Some("0".into()),
            page_size: Some("500".into()),
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), MAX_PAGE_SIZE);

        let query = ReviewListQuery {
            page_size: Some("many".into()),
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_author_name() {
        assert_eq!(author_name(Some("Mali")), "Mali");
        assert_eq!(author_name(Some("  ")), FALLBACK_AUTHOR);
        assert_eq!(author_name(None), FALLBACK_AUTHOR);
        assert_eq!(author_name(Some(&"x".repeat(80))).chars().count(), MAX_AUTHOR_NAME);
    }

    #[test]
    fn test_rating_out_of_range_fails_validation() {
        let body: CreateReviewRequest = serde_json::from_value(json!({
            "product": "pearl-drop",
            "rating": 6,
            "body": "Lovely finish"
        }))
        .unwrap();
        assert!(body.validate().is_err());
    }

    #[tokio::test]
    async fn test_disabled_list_is_empty() {
        let response = app(false)
            .oneshot(
                Request::get("/api/reviews?product=pearl-drop")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "items": [], "total": 0, "ratingAvg": 0.0, "ratingCount": 0 })
        );
    }

    #[tokio::test]
    async fn test_missing_slug_is_400() {
        let response = app(true)
            .oneshot(Request::get("/api/reviews").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "product slug required");
    }

    #[tokio::test]
    async fn test_disabled_post_is_403() {
        let response = app(false).oneshot(review_post()).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "Reviews disabled");
    }

    #[tokio::test]
    async fn test_post_requires_session() {
        let response = app(true).oneshot(review_post()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
