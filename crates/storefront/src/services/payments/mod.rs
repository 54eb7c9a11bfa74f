//! Card payments through Stripe's hosted checkout.
//!
//! - [`client`] opens a checkout session for an order's persisted items.
//! - [`webhook`] verifies signed webhook deliveries and maps events to order
//!   updates.

pub mod client;
pub mod webhook;

pub use client::{PaymentError, StripeClient};
pub use webhook::{SignatureError, WebhookAction, WebhookEvent, verify_signature};
