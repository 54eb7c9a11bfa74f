//! Account route handlers.
//!
//! Email and password registration and login. The signed-in identity lives
//! in the session; roles are always re-read from the database.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;
use validator::Validate;

use anna_paris_core::{Email, UserId, UserRole};

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::rate_limit::{self, AUTH_LOGIN, AUTH_REGISTER};
use crate::middleware::{RequireAuth, ValidatedJson, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /api/auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub name: Option<String>,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// Public part of an account.
#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: AccountSummary,
}

/// The signed-in user, as returned by login and `me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: UserRole,
}

impl From<User> for MeResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a customer account.
#[instrument(skip(state, headers, body))]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    rate_limit::enforce(&state, &AUTH_REGISTER, &headers)?;

    let name = body.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let user = AuthService::new(state.pool())
        .register_with_password(&body.email, &body.password, name)
        .await?;

    tracing::info!(user_id = %user.id, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Account created",
            user: AccountSummary {
                id: user.id,
                email: user.email,
                name: user.name,
            },
        }),
    ))
}

/// Sign in with email and password.
#[instrument(skip(state, session, headers, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Json<MeResponse>> {
    rate_limit::enforce(&state, &AUTH_LOGIN, &headers)?;

    let user = AuthService::new(state.pool())
        .login_with_password(&body.email, &body.password)
        .await?;

    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
    };
    set_current_user(&session, &current).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to store session user");
        AppError::Internal("session store failed".to_string())
    })?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    tracing::info!(user_id = %user.id, "User signed in");

    Ok(Json(user.into()))
}

/// Sign out.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> StatusCode {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session user");
    }
    clear_sentry_user();

    StatusCode::NO_CONTENT
}

/// The signed-in user.
#[instrument(skip(state, user))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<MeResponse>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    Ok(Json(user.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use chrono::Utc;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_support::{test_config, test_state};

    #[test]
    fn test_me_response_shape() {
        let user = User {
            id: UserId::new(4),
            email: Email::parse("mali@example.com").unwrap(),
            name: Some("Mali".to_string()),
            role: UserRole::Admin,
            created_at: Utc::now(),
        };

        assert_eq!(
            serde_json::to_value(MeResponse::from(user)).unwrap(),
            json!({ "id": 4, "email": "mali@example.com", "name": "Mali", "role": "admin" })
        );
    }

    #[test]
    fn test_login_requires_both_fields() {
        let body: LoginRequest =
            serde_json::from_value(json!({ "email": "mali@example.com", "password": "" })).unwrap();
        assert!(body.validate().is_err());
    }

    #[tokio::test]
    async fn test_me_without_session_is_401() {
        let app = Router::new()
            .route("/api/auth/me", get(me))
            .with_state(test_state(test_config()));

        let response = app
            .oneshot(Request::get("/api/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
