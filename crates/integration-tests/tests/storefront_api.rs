//! HTTP tests against a running storefront.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The storefront running (cargo run -p anna-paris-storefront)
//!
//! Run with: task test:integration

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use anna_paris_integration_tests::storefront_base_url;

/// Client that keeps the session cookie between requests.
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

fn unique_email() -> String {
    format!("it-{}@example.com", Uuid::new_v4().simple())
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client.get(format!("{base_url}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.get(format!("{base_url}/api/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "ok": true }));
}

// ============================================================================
// Access control
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_anonymous_access_rules() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client.get(format!("{base_url}/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client.get(format!("{base_url}/api/wishlist")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client.get(format!("{base_url}/api/admin/orders")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client
        .patch(format!("{base_url}/api/orders/1"))
        .json(&json!({ "status": "shipped" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_empty_cart_is_rejected() {
    let resp = client()
        .post(format!("{}/api/orders", storefront_base_url()))
        .json(&json!({ "items": [] }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_webhook_without_signature_is_rejected() {
    let resp = client()
        .post(format!("{}/api/webhooks/stripe", storefront_base_url()))
        .body(r#"{"id":"evt_1","type":"checkout.session.completed"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_register_login_me_logout() {
    let client = client();
    let base_url = storefront_base_url();
    let email = unique_email();

    let resp = client
        .post(format!("{base_url}/api/auth/register"))
        .json(&json!({ "email": email, "password": "CorrectHorse42", "name": "Mali" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(format!("{base_url}/api/auth/register"))
        .json(&json!({ "email": email, "password": "AnotherPass42", "name": "Mali" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = client
        .post(format!("{base_url}/api/auth/login"))
        .json(&json!({ "email": email, "password": "WrongPass42" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(format!("{base_url}/api/auth/login"))
        .json(&json!({ "email": email, "password": "CorrectHorse42" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let me: Value = client
        .get(format!("{base_url}/api/auth/me"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], email.as_str());
    assert_eq!(me["role"], "customer");

    // Customers still cannot reach the back office
    let resp = client.get(format!("{base_url}/api/admin/metrics")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = client.post(format!("{base_url}/api/auth/logout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client.get(format!("{base_url}/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
