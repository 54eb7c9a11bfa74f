//! CSV export of orders.
//!
//! Each cell is written as its JSON literal: strings are double-quoted with
//! JSON escapes, numbers are bare. This is not RFC 4180 quoting, but
//! spreadsheet tools read it.

use chrono::SecondsFormat;
use serde_json::Value;

use crate::models::Order;

/// Column headers, in output order.
pub const ORDER_COLUMNS: [&str; 8] = [
    "orderNumber",
    "status",
    "total",
    "items",
    "createdAt",
    "customer",
    "city",
    "country",
];

/// `Content-Type` of the export response.
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// `Content-Disposition` of the export response.
pub const CSV_DISPOSITION: &str = "attachment; filename=\"orders.csv\"";

fn order_cells(order: &Order) -> [Value; 8] {
    let address = order.shipping_address.as_ref();
    [
        Value::from(order.order_number.as_str()),
        Value::from(order.status.as_str()),
        Value::from(order.total.amount()),
        Value::from(order.items.len()),
        Value::from(
            order
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        Value::from(order.user_id.as_i32()),
        Value::from(address.map_or("", |a| a.city.as_str())),
        Value::from(address.map_or("", |a| a.country.as_str())),
    ]
}

/// Render orders as CSV. No orders renders as an empty string (no header).
#[must_use]
pub fn orders_to_csv(orders: &[Order]) -> String {
    if orders.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(orders.len() + 1);
    lines.push(ORDER_COLUMNS.join(","));
    for order in orders {
        let cells: Vec<String> = order_cells(order).iter().map(Value::to_string).collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use anna_paris_core::{
        OrderId, OrderItemId, OrderNotes, OrderNumber, OrderStatus, PaymentStatus, Price, UserId,
    };

    use super::*;
    use crate::models::{OrderItem, ShippingAddress};

    fn order(city: Option<&str>) -> Order {
        let created_at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        let item = OrderItem {
            id: OrderItemId::new(1),
            product_id: None,
            product_slug: None,
            quantity: 2,
            price: Price::new(1500),
            product_name: "Pearl Drop Earrings".to_string(),
            product_image: None,
            variant: None,
        };

        Order {
            id: OrderId::new(3),
            order_number: OrderNumber::from("ORD-2025-00042".to_string()),
            user_id: UserId::new(7),
            customer_email: "mali@example.com".to_string(),
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Paid,
            payment_method: None,
            payment_intent: None,
            subtotal: Price::new(3000),
            shipping: Price::ZERO,
            tax: Price::ZERO,
            total: Price::new(3000),
            shipping_address_id: None,
            shipping_address: city.map(|city| ShippingAddress {
                first_name: "Mali".to_string(),
                last_name: "S".to_string(),
                company: None,
                address1: "1 Rama IV Rd".to_string(),
                address2: None,
                city: city.to_string(),
                state: None,
                postal_code: "10500".to_string(),
                country: "Thailand".to_string(),
                phone: None,
            }),
            items: vec![item.clone(), item],
            notes: OrderNotes::default(),
            tracking_number: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_empty_export_is_empty_string() {
        assert_eq!(orders_to_csv(&[]), "");
    }

    #[test]
    fn test_rows_use_json_literals() {
        let csv = orders_to_csv(&[order(Some("Bangkok")), order(None)]);
        let lines: Vec<&str> = csv.split('\n').collect();

        assert_eq!(
            lines,
            vec![
                "orderNumber,status,total,items,createdAt,customer,city,country",
                r#""ORD-2025-00042","processing",3000,2,"2025-03-14T09:30:00.000Z",7,"Bangkok","Thailand""#,
                r#""ORD-2025-00042","processing",3000,2,"2025-03-14T09:30:00.000Z",7,"","""#,
            ]
        );
    }

    #[test]
    fn test_quotes_are_json_escaped() {
        let csv = orders_to_csv(&[order(Some("Chiang \"Old\" Mai, North"))]);
        assert!(csv.contains(r#""Chiang \"Old\" Mai, North""#));
    }
}
