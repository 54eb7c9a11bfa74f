//! Order route handlers.
//!
//! Placing an order is open to guests; reading orders needs a session and
//! changing status needs an admin.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use anna_paris_core::{OrderId, OrderStatus, PaymentMethod, ProductId, UserId};

use crate::db::{OrderRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::rate_limit::{self, ORDERS_CREATE};
use crate::middleware::{OptionalAuth, RequireAdmin, RequireAuth, ValidatedJson};
use crate::models::{CreatedOrder, Order, ShippingAddress};
use crate::services::access::{self, Caller};
use crate::services::checkout::{self, CartLine, Checkout};
use crate::services::email::{OrderNotification, notify_customer};
use crate::state::AppState;

use super::{check_access, parse_order_id};

// =============================================================================
// Request Types
// =============================================================================

/// One cart line in an order request.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartItemInput {
    pub product_id: ProductId,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub variant: Option<String>,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Cart is empty"), nested)]
    pub items: Vec<CartItemInput>,
    #[validate(nested)]
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: Option<PaymentMethod>,
}

impl CreateOrderRequest {
    fn into_checkout(self, customer: Option<UserId>) -> Checkout {
        Checkout {
            lines: self
                .items
                .into_iter()
                .map(|item| CartLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    variant: item.variant.filter(|v| !v.is_empty()),
                })
                .collect(),
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            customer,
        }
    }
}

/// Query parameters for `GET /api/orders`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    /// Another user's id; admins only.
    pub user_id: Option<UserId>,
}

/// Body of `PATCH /api/orders/{id}`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub status: OrderStatus,
    #[validate(length(min = 1, max = 120, message = "Tracking number must be 1-120 characters"))]
    pub tracking_number: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Place an order for the cart.
///
/// Signed-in customers own their order; everyone else checks out as the
/// shared guest. The rate limit counts every attempt, including bodies that
/// fail to parse or validate.
#[instrument(skip(state, user, headers, body))]
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    body: std::result::Result<ValidatedJson<CreateOrderRequest>, AppError>,
) -> Result<Json<CreatedOrder>> {
    rate_limit::enforce(&state, &ORDERS_CREATE, &headers)?;
    let ValidatedJson(body) = body?;

    let checkout = body.into_checkout(user.map(|u| u.id));
    let created = checkout::place_order(state.pool(), checkout).await?;

    Ok(Json(created))
}

/// List the caller's orders, newest first.
#[instrument(skip(state, user))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>> {
    let role = UserRepository::new(state.pool())
        .get_role(user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let owner = access::orders_list_owner(user.id, role, query.user_id).map_err(|_| {
        tracing::warn!(user_id = %user.id, requested = ?query.user_id, "Order list override denied");
        AppError::Forbidden
    })?;

    let orders = OrderRepository::new(state.pool()).list_for_user(owner).await?;
    Ok(Json(orders))
}

/// Order detail for its owner or an admin.
#[instrument(skip(state, caller))]
pub async fn get(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    if caller == Caller::Anonymous {
        return Err(AppError::Unauthorized("Authentication required".to_string()));
    }

    let order = find_order(&state, &id).await?;
    check_access(access::can_view_order(caller, &order))?;

    Ok(Json(order))
}

/// Set an order's status (and tracking number).
///
/// Entering `shipped` from another status emails the customer.
#[instrument(skip(state, admin, body), fields(status = %body.status))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateOrderRequest>,
) -> Result<Json<Order>> {
    let order_id = parse_order_id(&id)?;

    let change = OrderRepository::new(state.pool())
        .update_status(order_id, body.status, body.tracking_number.as_deref())
        .await?
        .ok_or_else(order_not_found)?;

    tracing::info!(
        order_id = %order_id,
        from = %change.previous,
        to = %change.order.status,
        admin = %admin.email,
        "Order status updated"
    );

    if change.entered(OrderStatus::Shipped) {
        let state = state.clone();
        let order = change.order.clone();
        tokio::spawn(async move {
            notify_customer(state.email(), &order, OrderNotification::Shipped).await;
        });
    }

    Ok(Json(change.order))
}

pub(super) async fn find_order(state: &AppState, id: &str) -> Result<Order> {
    let order_id: OrderId = parse_order_id(id)?;
    OrderRepository::new(state.pool())
        .get(order_id)
        .await?
        .ok_or_else(order_not_found)
}

pub(super) fn order_not_found() -> AppError {
    AppError::NotFound("Order not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_maps_to_checkout() {
        let body: CreateOrderRequest = serde_json::from_value(json!({
            "items": [
                { "productId": 3, "quantity": 2, "variant": "" },
                { "productId": 1, "quantity": 1, "variant": "Gold" }
            ],
            "paymentMethod": "credit_card"
        }))
        .unwrap();

        let checkout = body.into_checkout(Some(UserId::new(9)));
        assert_eq!(checkout.customer, Some(UserId::new(9)));
        assert_eq!(checkout.payment_method, Some(PaymentMethod::CreditCard));
        assert_eq!(checkout.lines.len(), 2);
        assert_eq!(checkout.lines[0].variant, None);
        assert_eq!(checkout.lines[1].variant.as_deref(), Some("Gold"));
    }

    #[test]
    fn test_unknown_payment_method_is_rejected() {
        let result = serde_json::from_value::<CreateOrderRequest>(json!({
            "items": [{ "productId": 1, "quantity": 1 }],
            "paymentMethod": "paypal"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_quantity_fails_validation() {
        let body: CreateOrderRequest = serde_json::from_value(json!({
            "items": [{ "productId": 1, "quantity": 0 }]
        }))
        .unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_empty_cart_fails_validation() {
        let body: CreateOrderRequest = serde_json::from_value(json!({ "items": [] })).unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_update_request_rejects_unknown_status() {
        assert!(serde_json::from_value::<UpdateOrderRequest>(json!({ "status": "lost" })).is_err());

        let body: UpdateOrderRequest =
            serde_json::from_value(json!({ "status": "shipped", "trackingNumber": "TH123" }))
                .unwrap();
        assert_eq!(body.status, OrderStatus::Shipped);
        assert!(body.validate().is_ok());
    }
}
