//! Order repository.
//!
//! Reads assemble an [`Order`] from three queries: the order row (with the
//! customer email and shipping address joined in), then its items. Checkout
//! writes are free functions over a `PgConnection` so they can share the
//! caller's transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use anna_paris_core::{
    AddressId, JsonList, OrderId, OrderItemId, OrderNote, OrderNotes, OrderNumber, OrderStatus,
    OrderTotals, PaymentMethod, PaymentStatus, Price, ProductId, UserId,
};

use super::{RepositoryError, contains_pattern};
use crate::models::{Order, OrderItem, ShippingAddress};

const ORDER_SELECT: &str = r"
    SELECT o.id, o.order_number, o.user_id, u.email AS customer_email,
           o.status, o.payment_status, o.payment_method, o.payment_intent,
           o.subtotal, o.shipping, o.tax, o.total,
           o.shipping_address_id, o.notes, o.tracking_number,
           o.created_at, o.updated_at,
           a.first_name, a.last_name, a.company, a.address1, a.address2,
           a.city, a.state, a.postal_code, a.country, a.phone
    FROM shop.order o
    JOIN shop.user u ON u.id = o.user_id
    LEFT JOIN shop.address a ON a.id = o.shipping_address_id
";

#[derive(sqlx::FromRow)]
struct AddressColumns {
    first_name: Option<String>,
    last_name: Option<String>,
    company: Option<String>,
    address1: Option<String>,
    address2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    phone: Option<String>,
}

impl AddressColumns {
    /// The joined address, if the order has one.
    fn into_address(self) -> Option<ShippingAddress> {
        Some(ShippingAddress {
            first_name: self.first_name?,
            last_name: self.last_name?,
            company: self.company,
            address1: self.address1?,
            address2: self.address2,
            city: self.city?,
            state: self.state,
            postal_code: self.postal_code?,
            country: self.country?,
            phone: self.phone,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: OrderNumber,
    user_id: UserId,
    customer_email: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: Option<PaymentMethod>,
    payment_intent: Option<String>,
    subtotal: Price,
    shipping: Price,
    tax: Price,
    total: Price,
    shipping_address_id: Option<AddressId>,
    notes: OrderNotes,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[sqlx(flatten)]
    address: AddressColumns,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            customer_email: self.customer_email,
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            payment_intent: self.payment_intent,
            subtotal: self.subtotal,
            shipping: self.shipping,
            tax: self.tax,
            total: self.total,
            shipping_address_id: self.shipping_address_id,
            shipping_address: self.address.into_address(),
            items,
            notes: self.notes,
            tracking_number: self.tracking_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: Option<ProductId>,
    product_slug: Option<String>,
    quantity: i32,
    price: Price,
    product_name: String,
    product_image: Option<String>,
    variant: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            product_slug: row.product_slug,
            quantity: row.quantity,
            price: row.price,
            product_name: row.product_name,
            product_image: row.product_image,
            variant: row.variant,
        }
    }
}

/// Filters for the back-office order list and CSV export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Substring of the order number or customer email.
    pub query: Option<String>,
    pub status: Option<OrderStatus>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
}

impl OrderFilter {
    /// Append `WHERE` conditions for this filter. Assumes orders are aliased `o`
    /// and users `u`.
    pub(crate) fn push_conditions(&self, query: &mut QueryBuilder<'_, Postgres>) {
        query.push(" WHERE TRUE");
        if let Some(q) = self.query.as_deref().filter(|q| !q.is_empty()) {
            let pattern = contains_pattern(q);
            query
                .push(" AND (o.order_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(status) = self.status {
            query.push(" AND o.status = ").push_bind(status);
        }
        if let Some(from) = self.from {
            query.push(" AND o.created_at >= ").push_bind(from);
        }
        if let Some(to) = self.to {
            query.push(" AND o.created_at <= ").push_bind(to);
        }
    }
}

/// Outcome of a payment-confirmed update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Whether this delivery claimed the confirmation email.
    pub should_notify: bool,
}

/// Outcome of a status change.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub previous: OrderStatus,
    pub order: Order,
}

impl StatusChange {
    /// Whether the order just entered `status` from a different one.
    #[must_use]
    pub fn entered(&self, status: OrderStatus) -> bool {
        self.previous != status && self.order.status == status
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order with its items and shipping address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut orders = self.attach_items(vec![row]).await?;
        Ok(orders.pop())
    }

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// List orders matching a back-office filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(ORDER_SELECT);
        filter.push_conditions(&mut query);
        query.push(" ORDER BY o.created_at DESC, o.id DESC");

        let rows = query.build_query_as::<OrderRow>().fetch_all(self.pool).await?;

        self.attach_items(rows).await
    }

    /// Set an order's status, and its tracking number when one is given.
    ///
    /// Returns `None` if the order does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<&str>,
    ) -> Result<Option<StatusChange>, RepositoryError> {
        let previous = sqlx::query_scalar::<_, OrderStatus>(
            r"
            WITH prev AS (
                SELECT id, status FROM shop.order WHERE id = $1 FOR UPDATE
            )
            UPDATE shop.order o
            SET status = $2,
                tracking_number = COALESCE($3, o.tracking_number),
                updated_at = NOW()
            FROM prev
            WHERE o.id = prev.id
            RETURNING prev.status
            ",
        )
        .bind(id)
        .bind(status)
        .bind(tracking_number)
        .fetch_optional(self.pool)
        .await?;

        let Some(previous) = previous else {
            return Ok(None);
        };

        let order = self.get(id).await?.ok_or(RepositoryError::NotFound)?;
        Ok(Some(StatusChange { previous, order }))
    }

    /// Prepend a note to an order's note log.
    ///
    /// Returns `false` if the order does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn prepend_note(&self, id: OrderId, note: &OrderNote) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.order
            SET notes = jsonb_build_array($2::jsonb) || notes,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(Json(note))
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a confirmed payment.
    ///
    /// Sets the payment status to `paid`, moves an unpaid order to
    /// `processing` and stores the payment reference. The same statement
    /// claims the confirmation email, so exactly one delivery of a repeated
    /// event reports `should_notify`.
    ///
    /// Returns `None` if the order does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_paid(
        &self,
        id: OrderId,
        payment_intent: Option<&str>,
    ) -> Result<Option<PaymentConfirmation>, RepositoryError> {
        let should_notify = sqlx::query_scalar::<_, bool>(
            r"
            WITH prev AS (
                SELECT id, confirmation_sent_at FROM shop.order WHERE id = $1 FOR UPDATE
            )
            UPDATE shop.order o
            SET payment_status = 'paid',
                status = CASE
                    WHEN o.status IN ('pending', 'pending_payment')
                        THEN 'processing'::shop.order_status
                    ELSE o.status
                END,
                payment_intent = COALESCE($2, o.payment_intent),
                confirmation_sent_at = COALESCE(o.confirmation_sent_at, NOW()),
                updated_at = NOW()
            FROM prev
            WHERE o.id = prev.id
            RETURNING (prev.confirmation_sent_at IS NULL)
            ",
        )
        .bind(id)
        .bind(payment_intent)
        .fetch_optional(self.pool)
        .await?;

        Ok(should_notify.map(|should_notify| PaymentConfirmation { should_notify }))
    }

    /// Record a failed payment attempt.
    ///
    /// Only the payment status changes; fulfilment status is untouched.
    /// Returns the resulting payment status, or `None` if the order does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_failed(&self, id: OrderId) -> Result<Option<PaymentStatus>, RepositoryError> {
        let status = sqlx::query_scalar::<_, PaymentStatus>(
            r"
            UPDATE shop.order
            SET payment_status = 'failed',
                updated_at = NOW()
            WHERE id = $1
            RETURNING payment_status
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(status)
    }

    /// Load items for a batch of order rows and assemble the orders.
    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT i.id, i.order_id, i.product_id, p.slug AS product_slug,
                   i.quantity, i.price, i.product_name, i.product_image, i.variant
            FROM shop.order_item i
            LEFT JOIN shop.product p ON p.id = i.product_id
            WHERE i.order_id = ANY($1)
            ORDER BY i.id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in item_rows {
            by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderItem::from(item));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }
}

// =============================================================================
// Checkout writes (run inside the caller's transaction)
// =============================================================================

/// A cart line whose stock has been reserved, with the captured snapshot.
#[derive(Debug, Clone)]
pub struct ReservedLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub variant: Option<String>,
    pub product_name: String,
    pub price: Price,
    pub product_image: Option<String>,
}

/// Count how many of the given distinct products exist and are published.
pub(crate) async fn count_published(
    conn: &mut PgConnection,
    product_ids: &[ProductId],
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM shop.product WHERE id = ANY($1) AND published",
    )
    .bind(product_ids)
    .fetch_one(conn)
    .await
}

#[derive(sqlx::FromRow)]
struct ReservedRow {
    name: String,
    price: Price,
    images: JsonList<String>,
}

/// Decrement stock for one line if enough is available.
///
/// The check and the decrement are one statement, so concurrent checkouts
/// for the last unit serialize on the row and exactly one succeeds. Returns
/// the product snapshot, or `None` when the product is out of stock (or no
/// longer published).
pub(crate) async fn reserve_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: i32,
) -> Result<Option<(String, Price, Option<String>)>, sqlx::Error> {
    let row = sqlx::query_as::<_, ReservedRow>(
        r"
        UPDATE shop.product
        SET stock = stock - $2, updated_at = NOW()
        WHERE id = $1 AND published AND stock >= $2
        RETURNING name, price, images
        ",
    )
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|r| {
        let image = r.images.first().cloned();
        (r.name, r.price, image)
    }))
}

/// Insert the shipping address for a new order.
pub(crate) async fn insert_address(
    conn: &mut PgConnection,
    user_id: UserId,
    address: &ShippingAddress,
) -> Result<AddressId, sqlx::Error> {
    sqlx::query_scalar::<_, AddressId>(
        r"
        INSERT INTO shop.address
            (user_id, address_type, first_name, last_name, company, address1, address2,
             city, state, postal_code, country, phone, is_default)
        VALUES ($1, 'shipping', $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, FALSE)
        RETURNING id
        ",
    )
    .bind(user_id)
    .bind(&address.first_name)
    .bind(&address.last_name)
    .bind(&address.company)
    .bind(&address.address1)
    .bind(&address.address2)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.postal_code)
    .bind(&address.country)
    .bind(&address.phone)
    .fetch_one(conn)
    .await
}

/// Fields of a new order row.
#[derive(Debug, Clone)]
pub struct NewOrderRow<'a> {
    pub order_number: &'a OrderNumber,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: Option<PaymentMethod>,
    pub totals: OrderTotals,
    pub shipping_address_id: Option<AddressId>,
}

/// Insert an order row.
///
/// Returns `None` when the order number is already taken, so the caller can
/// retry with a fresh one without aborting the transaction.
pub(crate) async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrderRow<'_>,
) -> Result<Option<OrderId>, sqlx::Error> {
    sqlx::query_scalar::<_, OrderId>(
        r"
        INSERT INTO shop.order
            (order_number, user_id, status, payment_status, payment_method,
             subtotal, shipping, tax, total, shipping_address_id)
        VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $9)
        ON CONFLICT (order_number) DO NOTHING
        RETURNING id
        ",
    )
    .bind(order.order_number)
    .bind(order.user_id)
    .bind(order.status)
    .bind(order.payment_method)
    .bind(order.totals.subtotal)
    .bind(order.totals.shipping)
    .bind(order.totals.tax)
    .bind(order.totals.total)
    .bind(order.shipping_address_id)
    .fetch_optional(conn)
    .await
}

/// Insert the item snapshots of a new order.
pub(crate) async fn insert_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    lines: &[ReservedLine],
) -> Result<(), sqlx::Error> {
    if lines.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO shop.order_item \
         (order_id, product_id, quantity, price, product_name, product_image, variant) ",
    );
    query.push_values(lines, |mut row, line| {
        row.push_bind(order_id)
            .push_bind(line.product_id)
            .push_bind(line.quantity)
            .push_bind(line.price)
            .push_bind(line.product_name.clone())
            .push_bind(line.product_image.clone())
            .push_bind(line.variant.clone());
    });
    query.build().execute(conn).await?;

    Ok(())
}
