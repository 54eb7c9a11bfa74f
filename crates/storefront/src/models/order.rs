//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use anna_paris_core::{
    AddressId, OrderId, OrderItemId, OrderNotes, OrderNumber, OrderStatus, PaymentMethod,
    PaymentStatus, Price, ProductId, UserId,
};

/// An order with its items and shipping address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub customer_email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_intent: Option<String>,
    pub subtotal: Price,
    pub shipping: Price,
    pub tax: Price,
    pub total: Price,
    pub shipping_address_id: Option<AddressId>,
    pub shipping_address: Option<ShippingAddress>,
    pub items: Vec<OrderItem>,
    pub notes: OrderNotes,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchased line: a snapshot of the product at order time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    /// `None` once the product has been deleted.
    pub product_id: Option<ProductId>,
    /// Current slug of the product, if it still exists.
    pub product_slug: Option<String>,
    pub quantity: i32,
    pub price: Price,
    pub product_name: String,
    pub product_image: Option<String>,
    pub variant: Option<String>,
}

impl OrderItem {
    /// Line total at the captured price.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A shipping address as submitted at checkout and returned with orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    pub company: Option<String>,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address1: String,
    pub address2: Option<String>,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 1, message = "Postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
    pub phone: Option<String>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub order_number: OrderNumber,
    pub order_id: OrderId,
    pub total: Price,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_address_requires_fields() {
        let address: ShippingAddress = serde_json::from_value(serde_json::json!({
            "firstName": "Mali",
            "lastName": "",
            "address1": "99 Sukhumvit Rd",
            "city": "Bangkok",
            "postalCode": "10110",
            "country": "Thailand"
        }))
        .unwrap();

        let errors = address.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("last_name"));
        assert_eq!(errors.field_errors().len(), 1);
    }

    #[test]
    fn test_created_order_wire_shape() {
        let created = CreatedOrder {
            order_number: OrderNumber::from("ORD-2025-00042".to_string()),
            order_id: OrderId::new(7),
            total: Price::new(3000),
        };

        let json = serde_json::to_value(&created).unwrap();
        assert_eq!(json["orderNumber"], "ORD-2025-00042");
        assert_eq!(json["orderId"], 7);
        assert_eq!(json["total"], 3000);
    }
}
