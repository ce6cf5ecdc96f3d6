//! # Order Repository
//!
//! Orders are written once and never updated.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    INSERT INTO orders      (order_number PRIMARY KEY → never overwrite) │
//! │    INSERT INTO purchases   (customer_uid, order_number)                 │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Either both rows exist or neither does.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use aisle_core::{
    Order, OrderItem, PaymentMethod, PaymentStatus, PurchaseRecord, WeightValidation,
};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    order_number: String,
    customer_id: String,
    customer_name: String,
    customer_email: String,
    items_json: String,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    payment_method: PaymentMethod,
    payment_id: String,
    payment_status: PaymentStatus,
    cart_weight: f64,
    actual_weight: f64,
    weight_diff: f64,
    weight_is_valid: bool,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> DbResult<Order> {
        let items: Vec<OrderItem> = serde_json::from_str(&self.items_json)?;
        Ok(Order {
            order_number: self.order_number,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            items,
            subtotal_cents: self.subtotal_cents,
            tax_cents: self.tax_cents,
            total_cents: self.total_cents,
            payment_method: self.payment_method,
            payment_id: self.payment_id,
            payment_status: self.payment_status,
            weight_validation: WeightValidation {
                cart_weight: self.cart_weight,
                actual_weight: self.actual_weight,
                difference: self.weight_diff,
                is_valid: self.weight_is_valid,
            },
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    order_number: String,
    total_cents: i64,
    payment_method: PaymentMethod,
    created_at: DateTime<Utc>,
}

impl From<PurchaseRow> for PurchaseRecord {
    fn from(row: PurchaseRow) -> Self {
        PurchaseRecord {
            order_number: row.order_number,
            total_cents: row.total_cents,
            payment_method: row.payment_method,
            created_at: row.created_at,
        }
    }
}

/// Repository for orders and purchase history.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Writes the order and the customer's purchase entry in one transaction.
    ///
    /// ## Errors
    /// `UniqueViolation` if `order.order_number` already exists. The existing
    /// order is left untouched.
    pub async fn insert(&self, order: &Order, customer_uid: &str) -> DbResult<()> {
        let items_json = serde_json::to_string(&order.items)?;
        let purchase = PurchaseRecord::from(order);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                order_number, customer_id, customer_name, customer_email, items_json,
                subtotal_cents, tax_cents, total_cents,
                payment_method, payment_id, payment_status,
                cart_weight, actual_weight, weight_diff, weight_is_valid,
                created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&order.order_number)
        .bind(&order.customer_id)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(items_json)
        .bind(order.subtotal_cents)
        .bind(order.tax_cents)
        .bind(order.total_cents)
        .bind(order.payment_method)
        .bind(&order.payment_id)
        .bind(order.payment_status)
        .bind(order.weight_validation.cart_weight)
        .bind(order.weight_validation.actual_weight)
        .bind(order.weight_validation.difference)
        .bind(order.weight_validation.is_valid)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO purchases (customer_uid, order_number, total_cents, payment_method, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(customer_uid)
        .bind(&purchase.order_number)
        .bind(purchase.total_cents)
        .bind(purchase.payment_method)
        .bind(purchase.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            customer_id = %order.customer_id,
            total_cents = order.total_cents,
            "Order stored"
        );
        Ok(())
    }

    pub async fn get(&self, order_number: &str) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT order_number, customer_id, customer_name, customer_email, items_json,
                   subtotal_cents, tax_cents, total_cents,
                   payment_method, payment_id, payment_status,
                   cart_weight, actual_weight, weight_diff, weight_is_valid,
                   created_at
            FROM orders
            WHERE order_number = ?1
            "#,
        )
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrderRow::into_order).transpose()
    }

    /// Purchase history for one customer, newest first.
    pub async fn purchases_for(&self, customer_uid: &str) -> DbResult<Vec<PurchaseRecord>> {
        let rows: Vec<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT order_number, total_cents, payment_method, created_at
            FROM purchases
            WHERE customer_uid = ?1
            ORDER BY created_at DESC, order_number DESC
            "#,
        )
        .bind(customer_uid)
        .fetch_all(&self.pool)
        .await?;

        debug!(customer_uid = %customer_uid, count = rows.len(), "Loaded purchase history");
        Ok(rows.into_iter().map(PurchaseRecord::from).collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
