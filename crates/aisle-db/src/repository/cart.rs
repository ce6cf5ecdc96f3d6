//! # Cart Repository
//!
//! One snapshot per customer uid, overwritten on every basket change.
//! Last writer wins; the coordinator is the only writer for a session.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use aisle_core::Cart;

/// Repository for persisted baskets.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Stores the whole basket for `customer_uid`.
    pub async fn save(&self, customer_uid: &str, cart: &Cart) -> DbResult<()> {
        let items_json = serde_json::to_string(&cart.items)?;

        sqlx::query(
            r#"
            INSERT INTO carts (customer_uid, items_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (customer_uid) DO UPDATE SET
                items_json = excluded.items_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(customer_uid)
        .bind(items_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(customer_uid = %customer_uid, lines = cart.item_count(), "Cart saved");
        Ok(())
    }

    /// Loads the last saved basket, if any.
    pub async fn load(&self, customer_uid: &str) -> DbResult<Option<Cart>> {
        let items_json: Option<String> =
            sqlx::query_scalar("SELECT items_json FROM carts WHERE customer_uid = ?1")
                .bind(customer_uid)
                .fetch_optional(&self.pool)
                .await?;

        match items_json {
            Some(json) => Ok(Some(Cart {
                items: serde_json::from_str(&json)?,
            })),
            None => Ok(None),
        }
    }
}
