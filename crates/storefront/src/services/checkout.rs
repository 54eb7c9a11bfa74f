//! Order creation.
//!
//! A checkout runs in one transaction:
//!
//! 1. every distinct product in the cart must exist and be published;
//! 2. each line's stock is decremented with a guarded `UPDATE`, which also
//!    captures the price and name snapshot;
//! 3. the shipping address, order row and item rows are inserted.
//!
//! Any failure drops the transaction, which rolls back every write made so far
//! (including stock already decremented for earlier lines).

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use anna_paris_core::{OrderNumber, OrderStatus, OrderTotals, PaymentMethod, ProductId, UserId};

use crate::db::RepositoryError;
use crate::db::orders::{self, NewOrderRow, ReservedLine};
use crate::db::users::upsert_guest;
use crate::models::{CreatedOrder, ShippingAddress};

/// Fresh order numbers tried before giving up.
const MAX_ORDER_NUMBER_ATTEMPTS: usize = 8;

/// One line of the client's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub variant: Option<String>,
}

/// Everything needed to place an order.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub lines: Vec<CartLine>,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: Option<PaymentMethod>,
    /// Signed-in customer; `None` places the order as the shared guest.
    pub customer: Option<UserId>,
}

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines or a non-positive quantity.
    #[error("cart must contain at least one line with a positive quantity")]
    InvalidCart,

    /// A product is missing or unpublished.
    #[error("PRODUCTS_UNAVAILABLE")]
    ProductsUnavailable,

    /// Not enough stock for a line.
    #[error("OUT_OF_STOCK:{0}")]
    OutOfStock(ProductId),

    /// Every generated order number collided.
    #[error("could not allocate a unique order number")]
    OrderNumberExhausted,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Place an order for a cart.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidCart` for an empty cart or bad quantity.
/// Returns `CheckoutError::ProductsUnavailable` if a product is missing or unpublished.
/// Returns `CheckoutError::OutOfStock` naming the first line that cannot be filled.
/// Returns `CheckoutError::OrderNumberExhausted` if no free order number was found.
/// Returns `CheckoutError::Repository` if a query fails.
#[instrument(skip(pool, checkout), fields(lines = checkout.lines.len()))]
pub async fn place_order(pool: &PgPool, checkout: Checkout) -> Result<CreatedOrder, CheckoutError> {
    if checkout.lines.is_empty() || checkout.lines.iter().any(|l| l.quantity <= 0) {
        return Err(CheckoutError::InvalidCart);
    }

    let product_ids = distinct_product_ids(&checkout.lines);

    let mut tx = pool.begin().await?;

    let found = orders::count_published(&mut tx, &product_ids).await?;
    if usize::try_from(found).ok() != Some(product_ids.len()) {
        return Err(CheckoutError::ProductsUnavailable);
    }

    let mut reserved: Vec<(usize, ReservedLine)> = Vec::with_capacity(checkout.lines.len());
    for (index, line) in reservation_order(&checkout.lines) {
        let Some((product_name, price, product_image)) =
            orders::reserve_stock(&mut tx, line.product_id, line.quantity).await?
        else {
            tracing::info!(product_id = %line.product_id, quantity = line.quantity, "Out of stock");
            return Err(CheckoutError::OutOfStock(line.product_id));
        };

        reserved.push((
            index,
            ReservedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                variant: line.variant.clone(),
                product_name,
                price,
                product_image,
            },
        ));
    }
    reserved.sort_by_key(|(index, _)| *index);
    let reserved: Vec<ReservedLine> = reserved.into_iter().map(|(_, line)| line).collect();

    let totals = OrderTotals::from_lines(reserved.iter().map(|l| (l.price, l.quantity)));

    let user_id = match checkout.customer {
        Some(user_id) => user_id,
        None => upsert_guest(&mut tx).await?,
    };

    let shipping_address_id = match &checkout.shipping_address {
        Some(address) => Some(orders::insert_address(&mut tx, user_id, address).await?),
        None => None,
    };

    let status = OrderStatus::initial_for(checkout.payment_method);
    let mut placed = None;
    for _ in 0..MAX_ORDER_NUMBER_ATTEMPTS {
        let order_number = OrderNumber::generate(Utc::now());
        let row = NewOrderRow {
            order_number: &order_number,
            user_id,
            status,
            payment_method: checkout.payment_method,
            totals,
            shipping_address_id,
        };

        if let Some(order_id) = orders::insert_order(&mut tx, &row).await? {
            placed = Some((order_id, order_number));
            break;
        }
        tracing::warn!(%order_number, "Order number collision, retrying");
    }
    let (order_id, order_number) = placed.ok_or(CheckoutError::OrderNumberExhausted)?;

    orders::insert_items(&mut tx, order_id, &reserved).await?;

    tx.commit().await?;

    tracing::info!(%order_id, %order_number, total = %totals.total, "Order placed");

    Ok(CreatedOrder {
        order_number,
        order_id,
        total: totals.total,
    })
}

/// Product ids referenced by the cart, without duplicates.
fn distinct_product_ids(lines: &[CartLine]) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Cart lines with their positions, in ascending product id order, so
/// concurrent checkouts lock product rows in the same order.
fn reservation_order(lines: &[CartLine]) -> Vec<(usize, &CartLine)> {
    let mut order: Vec<(usize, &CartLine)> = lines.iter().enumerate().collect();
    order.sort_by_key(|(_, line)| line.product_id);
    order
}
