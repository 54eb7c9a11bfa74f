//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; every error body is JSON with an `error` field.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::payments::PaymentError;

/// One failed field in a validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order creation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// The payment provider rejected or failed a request.
    #[error("Payment provider error: {0}")]
    Payment(#[from] PaymentError),

    /// Payment provider credentials are not configured.
    #[error("Payments are not configured")]
    PaymentsNotConfigured,

    /// Request body failed validation.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// User may not perform this action.
    #[error("Forbidden")]
    Forbidden,

    /// The feature is switched off by configuration.
    #[error("{0}")]
    FeatureDisabled(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Request conflicts with current state.
    #[error("{0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a validation error on a single field.
    #[must_use]
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Whether this error is the server's fault and should be reported.
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_)
            | Self::Internal(_)
            | Self::Payment(_)
            | Self::PaymentsNotConfigured => true,
            Self::Auth(err) => matches!(err, AuthError::Repository(_) | AuthError::PasswordHash),
            Self::Checkout(err) => matches!(
                err,
                CheckoutError::OrderNumberExhausted | CheckoutError::Repository(_)
            ),
            _ => false,
        }
    }

    /// Status code and JSON body. Internal details never reach the body.
    fn status_and_body(&self) -> (StatusCode, Value) {
        const INTERNAL: &str = "Internal server error";

        match self {
            Self::Database(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": INTERNAL }))
            }
            Self::PaymentsNotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Payments are not configured" }),
            ),
            Self::Payment(_) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Failed to create checkout session" }),
            ),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    json!({ "error": "Invalid credentials" }),
                ),
                AuthError::UserAlreadyExists => (
                    StatusCode::CONFLICT,
                    json!({ "error": "An account with this email already exists" }),
                ),
                AuthError::InvalidEmail(_) => validation_body(&[FieldError::new(
                    "email",
                    "Invalid email format",
                )]),
                AuthError::WeakPassword(msg) => {
                    validation_body(&[FieldError::new("password", msg.clone())])
                }
                AuthError::InvalidName(msg) => {
                    validation_body(&[FieldError::new("name", msg.clone())])
                }
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": INTERNAL }))
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::InvalidCart => validation_body(&[FieldError::new(
                    "items",
                    "Cart must contain at least one item with a positive quantity",
                )]),
                CheckoutError::ProductsUnavailable => (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": err.to_string() }),
                ),
                CheckoutError::OutOfStock(product_id) => (
                    StatusCode::CONFLICT,
                    json!({ "error": err.to_string(), "productId": product_id }),
                ),
                CheckoutError::OrderNumberExhausted | CheckoutError::Repository(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": INTERNAL }))
                }
            },
            Self::Validation(details) => validation_body(details),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            Self::Forbidden => (StatusCode::FORBIDDEN, json!({ "error": "Forbidden" })),
            Self::FeatureDisabled(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            Self::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            Self::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "Too many requests" }),
            ),
        }
    }
}

fn validation_body(details: &[FieldError]) -> (StatusCode, Value) {
    (
        StatusCode::BAD_REQUEST,
        json!({ "error": "Validation failed", "details": details }),
    )
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details = Vec::new();
        collect_field_errors(&errors, "", &mut details);
        details.sort_by(|a, b| a.field.cmp(&b.field));
        Self::Validation(details)
    }
}

/// Flatten nested validation errors into `parent.child` / `list[0].child` paths.
fn collect_field_errors(errors: &validator::ValidationErrors, prefix: &str, out: &mut Vec<FieldError>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| {
                    let message = e
                        .message
                        .as_ref()
                        .map_or_else(|| format!("Invalid {field}"), ToString::to_string);
                    FieldError::new(path.clone(), message)
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, body) = self.status_and_body();
        let mut response = (status, Json(body)).into_response();

        if let Self::RateLimited { retry_after_secs } = self
            && let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }

        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use validator::Validate;

    use anna_paris_core::ProductId;

    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_status_codes() {
        fn status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(status(AppError::NotFound("Order not found".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::Unauthorized("Unauthorized".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status(AppError::BadRequest("bad".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(AppError::Checkout(CheckoutError::ProductsUnavailable)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(AppError::Auth(AuthError::UserAlreadyExists)), StatusCode::CONFLICT);
        assert_eq!(status(AppError::Internal("boom".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(AppError::PaymentsNotConfigured), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status(AppError::Payment(PaymentError::MissingUrl)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_out_of_stock_names_product() {
        let response = AppError::Checkout(CheckoutError::OutOfStock(ProductId::new(12))).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "OUT_OF_STOCK:12", "productId": 12 })
        );
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = AppError::Internal("connection refused on 10.0.0.5".into()).into_response();
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Internal server error" })
        );
    }

    #[tokio::test]
    async fn test_validation_details() {
        let response = AppError::invalid_field("message", "Message is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({
                "error": "Validation failed",
                "details": [{ "field": "message", "message": "Message is required" }]
            })
        );
    }

    #[derive(Debug, validator::Validate)]
    struct Line {
        #[validate(range(min = 1, message = "Quantity must be at least 1"))]
        quantity: i32,
    }

    #[derive(Debug, validator::Validate)]
    struct Cart {
        #[validate(nested)]
        items: Vec<Line>,
    }

    #[test]
    fn test_nested_validation_paths() {
        let cart = Cart {
            items: vec![Line { quantity: 2 }, Line { quantity: 0 }],
        };
        let AppError::Validation(details) = AppError::from(cart.validate().unwrap_err()) else {
            panic!("expected validation error");
        };
        assert_eq!(
            details,
            vec![FieldError::new("items[1].quantity", "Quantity must be at least 1")]
        );
    }
}
