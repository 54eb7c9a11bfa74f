//! Stripe webhook verification and event mapping.
//!
//! The `Stripe-Signature` header looks like `t=<unix>,v1=<hex>[,v1=<hex>]`.
//! The signed payload is `"<t>.<raw body>"`, authenticated with HMAC-SHA256
//! under the endpoint's webhook secret.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use anna_paris_core::OrderId;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age (and clock skew) of a signed delivery, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: u64 = 300;

/// Errors from signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("malformed signature header")]
    MalformedHeader,

    #[error("timestamp outside tolerance")]
    Expired,

    #[error("no matching signature")]
    Mismatch,
}

/// Verify a webhook delivery against the `Stripe-Signature` header.
///
/// # Errors
///
/// Returns `SignatureError::MalformedHeader` if `t` or every `v1` is missing.
/// Returns `SignatureError::Expired` if the timestamp is outside the tolerance.
/// Returns `SignatureError::Mismatch` if no `v1` entry matches.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let issued_at: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::MalformedHeader)?;
    if now_unix.abs_diff(issued_at) > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// The parts of a webhook event this store reads.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: Value,
}

/// What to do with a verified event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    /// Mark the order paid and store the payment reference.
    MarkPaid {
        order_id: OrderId,
        payment_intent: Option<String>,
    },
    /// Mark the order's payment as failed.
    MarkFailed { order_id: OrderId },
    /// A handled event type without a usable order id.
    Unresolved { raw_order_id: Option<String> },
    /// An event type this store does not handle.
    Ignore,
}

impl WebhookEvent {
    /// Decide how to handle this event.
    #[must_use]
    pub fn action(&self) -> WebhookAction {
        let object = &self.data.object;
        match self.kind.as_str() {
            "checkout.session.completed" => {
                let raw = metadata_order_id(object).or_else(|| string_field(object, "client_reference_id"));
                match parse_order_id(raw.as_deref()) {
                    Some(order_id) => WebhookAction::MarkPaid {
                        order_id,
                        payment_intent: string_field(object, "payment_intent"),
                    },
                    None => WebhookAction::Unresolved { raw_order_id: raw },
                }
            }
            "payment_intent.payment_failed" => {
                let raw = metadata_order_id(object);
                match parse_order_id(raw.as_deref()) {
                    Some(order_id) => WebhookAction::MarkFailed { order_id },
                    None => WebhookAction::Unresolved { raw_order_id: raw },
                }
            }
            _ => WebhookAction::Ignore,
        }
    }
}

fn string_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn metadata_order_id(object: &Value) -> Option<String> {
    object.get("metadata").and_then(|m| string_field(m, "orderId"))
}

fn parse_order_id(raw: Option<&str>) -> Option<OrderId> {
    raw?.parse().ok()
}
