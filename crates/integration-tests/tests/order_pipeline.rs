//! Checkout and payment reconciliation against a real database.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - `TEST_DATABASE_URL` pointing at it
//!
//! Run with: task test:integration

use anna_paris_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductId};
use anna_paris_integration_tests::{
    address_and_order_count, create_product, order_item_count, product_stock, test_pool,
    unique_slug, unpublish_product,
};
use anna_paris_storefront::db::OrderRepository;
use anna_paris_storefront::models::ShippingAddress;
use anna_paris_storefront::services::checkout::{CartLine, Checkout, CheckoutError, place_order};

fn address() -> ShippingAddress {
    ShippingAddress {
        first_name: "Mali".to_string(),
        last_name: "Srisuk".to_string(),
        company: None,
        address1: "99 Sukhumvit Rd".to_string(),
        address2: None,
        city: "Bangkok".to_string(),
        state: None,
        postal_code: "10110".to_string(),
        country: "Thailand".to_string(),
        phone: None,
    }
}

/// Checkout whose address carries a unique `company` marker, so its rows
/// can be counted after a rollback.
fn marked_checkout(lines: Vec<CartLine>) -> (Checkout, String) {
    let marker = unique_slug("it-rollback");
    let mut checkout = guest_checkout(lines, PaymentMethod::BankTransfer);
    if let Some(address) = checkout.shipping_address.as_mut() {
        address.company = Some(marker.clone());
    }
    (checkout, marker)
}

fn guest_checkout(lines: Vec<CartLine>, method: PaymentMethod) -> Checkout {
    Checkout {
        lines,
        shipping_address: Some(address()),
        payment_method: Some(method),
        customer: None,
    }
}

fn line(product_id: ProductId, quantity: i32) -> CartLine {
    CartLine {
        product_id,
        quantity,
        variant: None,
    }
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_checkout_snapshots_prices_and_totals() {
    let pool = test_pool().await;
    let ring = create_product(&pool, 1200, 5).await;
    let studs = create_product(&pool, 450, 5).await;

    let created = place_order(
        &pool,
        guest_checkout(vec![line(ring, 2), line(studs, 1)], PaymentMethod::BankTransfer),
    )
    .await
    .unwrap();

    let order = OrderRepository::new(&pool)
        .get(created.order_id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(order.subtotal, Price::new(2850));
    assert_eq!(order.shipping, Price::new(50));
    assert_eq!(order.tax, Price::ZERO);
    assert_eq!(order.total, Price::new(2900));
    assert_eq!(created.total, order.total);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.shipping_address, Some(address()));

    assert_eq!(product_stock(&pool, ring).await, 3);
    assert_eq!(product_stock(&pool, studs).await, 4);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_free_shipping_at_threshold() {
    let pool = test_pool().await;
    let necklace = create_product(&pool, 3000, 1).await;

    let created = place_order(
        &pool,
        guest_checkout(vec![line(necklace, 1)], PaymentMethod::CreditCard),
    )
    .await
    .unwrap();

    let order = OrderRepository::new(&pool)
        .get(created.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.shipping, Price::ZERO);
    assert_eq!(order.total, Price::new(3000));
    assert_eq!(order.status, OrderStatus::PendingPayment);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_out_of_stock_rolls_back_earlier_lines() {
    let pool = test_pool().await;
    let in_stock = create_product(&pool, 800, 5).await;
    let sold_out = create_product(&pool, 800, 0).await;

    let (checkout, marker) = marked_checkout(vec![line(in_stock, 2), line(sold_out, 1)]);
    let result = place_order(&pool, checkout).await;

    assert!(matches!(result, Err(CheckoutError::OutOfStock(id)) if id == sold_out));
    assert_eq!(product_stock(&pool, in_stock).await, 5);
    assert_eq!(product_stock(&pool, sold_out).await, 0);
    assert_eq!(order_item_count(&pool, in_stock).await, 0);
    assert_eq!(address_and_order_count(&pool, &marker).await, (0, 0));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_unpublished_product_makes_cart_unavailable() {
    let pool = test_pool().await;
    let available = create_product(&pool, 700, 4).await;
    let hidden = create_product(&pool, 700, 4).await;
    unpublish_product(&pool, hidden).await;

    let (checkout, marker) = marked_checkout(vec![line(available, 1), line(hidden, 1)]);
    let result = place_order(&pool, checkout).await;

    assert!(matches!(result, Err(CheckoutError::ProductsUnavailable)));
    assert_eq!(product_stock(&pool, available).await, 4);
    assert_eq!(product_stock(&pool, hidden).await, 4);
    assert_eq!(order_item_count(&pool, available).await, 0);
    assert_eq!(address_and_order_count(&pool, &marker).await, (0, 0));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_missing_product_makes_cart_unavailable() {
    let pool = test_pool().await;
    let available = create_product(&pool, 700, 4).await;

    let (checkout, marker) = marked_checkout(vec![
        line(available, 1),
        line(ProductId::new(i32::MAX), 1),
    ]);
    let result = place_order(&pool, checkout).await;

    assert!(matches!(result, Err(CheckoutError::ProductsUnavailable)));
    assert_eq!(product_stock(&pool, available).await, 4);
    assert_eq!(order_item_count(&pool, available).await, 0);
    assert_eq!(address_and_order_count(&pool, &marker).await, (0, 0));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_concurrent_checkouts_never_oversell() {
    let pool = test_pool().await;
    let last_piece = create_product(&pool, 1500, 1).await;

    let first = place_order(
        &pool,
        guest_checkout(vec![line(last_piece, 1)], PaymentMethod::BankTransfer),
    );
    let second = place_order(
        &pool,
        guest_checkout(vec![line(last_piece, 1)], PaymentMethod::BankTransfer),
    );
    let (first, second) = tokio::join!(first, second);

    let results = [first, second];
    let placed = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(CheckoutError::OutOfStock(_))))
        .count();

    assert_eq!(placed, 1);
    assert_eq!(rejected, 1);
    assert_eq!(product_stock(&pool, last_piece).await, 0);
}

// ============================================================================
// Payment reconciliation
// ============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_replayed_payment_confirmation_notifies_once() {
    let pool = test_pool().await;
    let bracelet = create_product(&pool, 990, 2).await;
    let created = place_order(
        &pool,
        guest_checkout(vec![line(bracelet, 1)], PaymentMethod::CreditCard),
    )
    .await
    .unwrap();

    let orders = OrderRepository::new(&pool);
    let first = orders
        .mark_paid(created.order_id, Some("pi_test_replay"))
        .await
        .unwrap()
        .unwrap();
    let replay = orders
        .mark_paid(created.order_id, Some("pi_test_replay"))
        .await
        .unwrap()
        .unwrap();

    assert!(first.should_notify);
    assert!(!replay.should_notify);

    let order = orders.get(created.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.payment_intent.as_deref(), Some("pi_test_replay"));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_failed_payment_changes_only_payment_status() {
    let pool = test_pool().await;
    let earrings = create_product(&pool, 650, 2).await;
    let created = place_order(
        &pool,
        guest_checkout(vec![line(earrings, 1)], PaymentMethod::CreditCard),
    )
    .await
    .unwrap();

    let orders = OrderRepository::new(&pool);
    let status = orders.mark_failed(created.order_id).await.unwrap();
    assert_eq!(status, Some(PaymentStatus::Failed));

    let order = orders.get(created.order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert_eq!(order.total, created.total);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_failed_payment_for_unknown_order() {
    let pool = test_pool().await;
    let status = OrderRepository::new(&pool)
        .mark_failed(OrderId::new(i32::MAX))
        .await
        .unwrap();
    assert_eq!(status, None);
}
