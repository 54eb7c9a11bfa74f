//! Stripe Checkout Sessions client.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::form_urlencoded;

use anna_paris_core::CURRENCY;

use crate::config::StripeConfig;
use crate::models::Order;

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("checkout session has no redirect URL")]
    MissingUrl,
}

#[derive(Deserialize)]
struct CheckoutSessionResponse {
    url: Option<String>,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: SecretString,
    webhook_secret: SecretString,
    api_base: String,
}

impl StripeClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Secret used to verify webhook signatures.
    #[must_use]
    pub const fn webhook_secret(&self) -> &SecretString {
        &self.webhook_secret
    }

    /// Open a hosted checkout session for an order and return its URL.
    ///
    /// Line items come from the order's persisted items, so the charged amount
    /// matches the prices captured when the order was placed.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Http` if the request fails.
    /// Returns `PaymentError::Api` if Stripe rejects the request.
    /// Returns `PaymentError::MissingUrl` if the session has no URL.
    pub async fn create_checkout_session(
        &self,
        order: &Order,
        base_url: &str,
    ) -> Result<String, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let params = checkout_session_params(order, base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .form(&params)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSessionResponse = response.json().await?;
        session.url.ok_or(PaymentError::MissingUrl)
    }
}

/// Form parameters for `POST /v1/checkout/sessions`.
#[must_use]
pub fn checkout_session_params(order: &Order, base_url: &str) -> Vec<(String, String)> {
    let order_id = order.id.to_string();
    let order_number = order.order_number.as_str();
    let encoded_number: String = form_urlencoded::byte_serialize(order_number.as_bytes()).collect();

    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
    ];

    for (i, item) in order.items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        params.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        params.push((
            format!("{prefix}[price_data][currency]"),
            CURRENCY.to_string(),
        ));
        params.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.price.to_minor_units().to_string(),
        ));
        params.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.product_name.clone(),
        ));
        if let Some(image) = item.product_image.as_deref().filter(|i| !i.is_empty()) {
            params.push((
                format!("{prefix}[price_data][product_data][images][0]"),
                image.to_string(),
            ));
        }
    }

    params.push((
        "success_url".to_string(),
        format!(
            "{base_url}/checkout/success?orderId={order_id}&orderNumber={encoded_number}&session_id={{CHECKOUT_SESSION_ID}}"
        ),
    ));
    params.push(("cancel_url".to_string(), format!("{base_url}/cart?canceled=1")));
    params.push(("client_reference_id".to_string(), order_id.clone()));
    params.push(("metadata[orderId]".to_string(), order_id));
    params.push(("metadata[orderNumber]".to_string(), order_number.to_string()));

    params
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use anna_paris_core::{
        OrderId, OrderItemId, OrderNotes, OrderNumber, OrderStatus, PaymentStatus, Price, UserId,
    };

    use super::*;
    use crate::models::OrderItem;

    fn order() -> Order {
        let item = |id, name: &str, image: Option<&str>, quantity, price| OrderItem {
            id: OrderItemId::new(id),
            product_id: None,
            product_slug: None,
            quantity,
            price: Price::new(price),
            product_name: name.to_string(),
            product_image: image.map(String::from),
            variant: None,
        };

        Order {
            id: OrderId::new(42),
            order_number: OrderNumber::from("ORD-2025-00042".to_string()),
            user_id: UserId::new(1),
            customer_email: "mali@example.com".to_string(),
            status: OrderStatus::PendingPayment,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            payment_intent: None,
            subtotal: Price::new(3250),
            shipping: Price::ZERO,
            tax: Price::ZERO,
            total: Price::new(3250),
            shipping_address_id: None,
            shipping_address: None,
            items: vec![
                item(1, "Pearl Drop Earrings", Some("https://cdn.example/pearl.jpg"), 2, 1500),
                item(2, "Gift Box", None, 1, 250),
            ],
            notes: OrderNotes::default(),
            tracking_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_line_items_use_persisted_prices_in_satang() {
        let params = checkout_session_params(&order(), "https://annaparis.com");

        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(param(&params, "payment_method_types[0]"), Some("card"));
        assert_eq!(param(&params, "line_items[0][quantity]"), Some("2"));
        assert_eq!(param(&params, "line_items[0][price_data][currency]"), Some("thb"));
        assert_eq!(
            param(&params, "line_items[0][price_data][unit_amount]"),
            Some("150000")
        );
        assert_eq!(
            param(&params, "line_items[0][price_data][product_data][images][0]"),
            Some("https://cdn.example/pearl.jpg")
        );
        assert_eq!(
            param(&params, "line_items[1][price_data][unit_amount]"),
            Some("25000")
        );
        assert_eq!(
            param(&params, "line_items[1][price_data][product_data][images][0]"),
            None
        );
    }

    #[test]
    fn test_redirects_and_correlation() {
        let params = checkout_session_params(&order(), "https://annaparis.com");

        assert_eq!(
            param(&params, "success_url"),
            Some(
                "https://annaparis.com/checkout/success?orderId=42&orderNumber=ORD-2025-00042&session_id={CHECKOUT_SESSION_ID}"
            )
        );
        assert_eq!(
            param(&params, "cancel_url"),
            Some("https://annaparis.com/cart?canceled=1")
        );
        assert_eq!(param(&params, "client_reference_id"), Some("42"));
        assert_eq!(param(&params, "metadata[orderId]"), Some("42"));
        assert_eq!(param(&params, "metadata[orderNumber]"), Some("ORD-2025-00042"));
    }
}
