//! Card payment handlers: hosted checkout sessions and provider webhooks.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use anna_paris_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::services::access::{self, Caller};
use crate::services::email::{OrderNotification, notify_customer};
use crate::services::payments::{WebhookAction, WebhookEvent, verify_signature};
use crate::state::AppState;

use super::check_access;
use super::orders::order_not_found;

/// Header carrying the webhook signature.
const SIGNATURE_HEADER: &str = "stripe-signature";

/// Body of `POST /api/payments/stripe/create-session`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub order_id: Value,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub url: String,
}

/// Accept the order id as a JSON number or a numeric string.
fn order_id_from_json(value: &Value) -> Option<OrderId> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()).map(OrderId::new),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Open a hosted card checkout for an order and return its URL.
///
/// The caller must own the order; anonymous callers may pay for guest orders.
#[instrument(skip(state, caller, body))]
pub async fn create_session(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>> {
    let order_id = order_id_from_json(&body.order_id)
        .ok_or_else(|| AppError::BadRequest("orderId required".to_string()))?;

    let order = OrderRepository::new(state.pool())
        .get(order_id)
        .await?
        .ok_or_else(order_not_found)?;

    check_access(access::can_pay_for_order(caller, &order))?;

    let stripe = state.stripe().ok_or(AppError::PaymentsNotConfigured)?;
    let url = stripe
        .create_checkout_session(&order, &state.config().base_url)
        .await?;

    tracing::info!(order_id = %order.id, order_number = %order.order_number, "Checkout session created");

    Ok(Json(CreateSessionResponse { url }))
}

/// Receive a payment provider event.
///
/// The raw body is verified before it is parsed. Once an event is verified,
/// anything short of a database failure is acknowledged so the provider
/// stops retrying.
#[instrument(skip_all)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(stripe) = state.stripe() else {
        tracing::error!("Webhook received but Stripe is not configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Stripe not configured" })),
        )
            .into_response();
    };

    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing signature" })),
        )
            .into_response();
    };

    let now = chrono::Utc::now().timestamp();
    if let Err(e) = verify_signature(&body, signature, stripe.webhook_secret().expose_secret(), now) {
        tracing::warn!(error = %e, "Webhook signature rejected");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid signature" })),
        )
            .into_response();
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Signed webhook payload is not an event");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid payload" })),
            )
                .into_response();
        }
    };

    tracing::info!(event_id = %event.id, event_type = %event.kind, "Webhook received");

    match handle_event(&state, &event).await {
        Ok(()) => Json(json!({ "received": true })).into_response(),
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(
                error = %e,
                sentry_event_id = %event_id,
                webhook_event = %event.id,
                "Webhook handling failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "received": true })),
            )
                .into_response()
        }
    }
}

async fn handle_event(
    state: &AppState,
    event: &WebhookEvent,
) -> std::result::Result<(), crate::db::RepositoryError> {
    let orders = OrderRepository::new(state.pool());

    match event.action() {
        WebhookAction::MarkPaid {
            order_id,
            payment_intent,
        } => {
            let Some(confirmation) = orders.mark_paid(order_id, payment_intent.as_deref()).await?
            else {
                tracing::warn!(%order_id, event_id = %event.id, "Payment confirmed for unknown order");
                return Ok(());
            };

            tracing::info!(%order_id, should_notify = confirmation.should_notify, "Order marked paid");

            if confirmation.should_notify
                && let Some(order) = orders.get(order_id).await?
            {
                notify_customer(state.email(), &order, OrderNotification::Confirmed).await;
            }
        }
        WebhookAction::MarkFailed { order_id } => match orders.mark_failed(order_id).await? {
            Some(status) => tracing::info!(%order_id, payment_status = %status, "Payment failure recorded"),
            None => tracing::warn!(%order_id, event_id = %event.id, "Payment failed for unknown order"),
        },
        WebhookAction::Unresolved { raw_order_id } => {
            tracing::warn!(
                event_id = %event.id,
                event_type = %event.kind,
                raw_order_id = ?raw_order_id,
                "Webhook event has no usable order id"
            );
        }
        WebhookAction::Ignore => {
            tracing::debug!(event_type = %event.kind, "Ignoring webhook event");
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_support::{test_config, test_state};

    #[test]
    fn test_order_id_from_json() {
        assert_eq!(order_id_from_json(&json!(42)), Some(OrderId::new(42)));
        assert_eq!(order_id_from_json(&json!("42")), Some(OrderId::new(42)));
        assert_eq!(order_id_from_json(&json!("abc")), None);
        assert_eq!(order_id_from_json(&json!(1.5)), None);
        assert_eq!(order_id_from_json(&Value::Null), None);
        assert_eq!(order_id_from_json(&json!(9_999_999_999_i64)), None);
    }

    #[tokio::test]
    async fn test_webhook_unconfigured_is_500() {
        let app = Router::new()
            .route("/api/webhooks/stripe", post(stripe_webhook))
            .with_state(test_state(test_config()));

        let response = app
            .oneshot(
                Request::post("/api/webhooks/stripe")
                    .header("stripe-signature", "t=1,v1=00")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_create_session_requires_numeric_order_id() {
        let app = Router::new()
            .route("/api/payments/stripe/create-session", post(create_session))
            .with_state(test_state(test_config()));

        let response = app
            .oneshot(
                Request::post("/api/payments/stripe/create-session")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"orderId": "not-a-number"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    const WEBHOOK_SECRET: &str = "whsec_Zq81mXv3Lp0tR7yNc2Kd";

    fn configured_app() -> Router {
        let mut config = test_config();
        config.stripe = Some(crate::config::StripeConfig {
            secret_key: secrecy::SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
            webhook_secret: secrecy::SecretString::from(WEBHOOK_SECRET),
            api_base: "http://127.0.0.1:1".to_string(),
        });
        Router::new()
            .route("/api/webhooks/stripe", post(stripe_webhook))
            .with_state(test_state(config))
    }

    fn signed(payload: &str) -> String {
        use hmac::{Hmac, Mac};

        let now = chrono::Utc::now().timestamp();
        let mut mac = Hmac::<sha2::Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
        mac.update(format!("{now}.{payload}").as_bytes());
        format!("t={now},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    async fn deliver(signature: Option<String>, payload: &'static str) -> (StatusCode, Value) {
        let mut request = Request::post("/api/webhooks/stripe");
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        let response = configured_app()
            .oneshot(request.body(Body::from(payload)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_webhook_missing_signature() {
        let (status, body) = deliver(None, "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing signature" }));
    }

    #[tokio::test]
    async fn test_webhook_tampered_payload_is_rejected() {
        let signature = signed(r#"{"id":"evt_1","type":"charge.refunded","data":{"object":{}}}"#);
        let (status, body) = deliver(
            Some(signature),
            r#"{"id":"evt_1","type":"charge.refunded","data":{"object":{"x":1}}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid signature");
    }

    #[tokio::test]
    async fn test_webhook_unknown_event_is_acknowledged() {
        const PAYLOAD: &str = r#"{"id":"evt_2","type":"customer.created","data":{"object":{}}}"#;
        let (status, body) = deliver(Some(signed(PAYLOAD)), PAYLOAD).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "received": true }));
    }

    #[tokio::test]
    async fn test_webhook_without_order_id_is_acknowledged() {
        const PAYLOAD: &str = r#"{"id":"evt_3","type":"checkout.session.completed","data":{"object":{"metadata":{"orderId":"ck_legacy"}}}}"#;
        let (status, body) = deliver(Some(signed(PAYLOAD)), PAYLOAD).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "received": true }));
    }
}
