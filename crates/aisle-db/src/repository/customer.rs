//! # Customer Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use aisle_core::CustomerProfile;

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    uid: String,
    customer_id: Option<String>,
    full_name: String,
    email: String,
}

impl From<CustomerRow> for CustomerProfile {
    fn from(row: CustomerRow) -> Self {
        CustomerProfile {
            uid: row.uid,
            customer_id: row.customer_id,
            full_name: row.full_name,
            email: row.email,
        }
    }
}

/// Repository for customer profiles.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a new profile.
    ///
    /// ## Errors
    /// `UniqueViolation` if the uid or the customer id is already taken.
    pub async fn insert(&self, profile: &CustomerProfile) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (uid, customer_id, full_name, email, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&profile.uid)
        .bind(&profile.customer_id)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(uid = %profile.uid, customer_id = ?profile.customer_id, "Customer inserted");
        Ok(())
    }

    pub async fn get(&self, uid: &str) -> DbResult<Option<CustomerProfile>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT uid, customer_id, full_name, email FROM customers WHERE uid = ?1",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CustomerProfile::from))
    }

    pub async fn get_by_customer_id(&self, customer_id: &str) -> DbResult<Option<CustomerProfile>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT uid, customer_id, full_name, email FROM customers WHERE customer_id = ?1",
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CustomerProfile::from))
    }

    /// Gives a guest profile its customer id.
    ///
    /// Only fills an empty slot: a profile that already has an id keeps it.
    ///
    /// ## Returns
    /// `true` if the id was written, `false` if the profile already had one.
    pub async fn assign_customer_id(&self, uid: &str, customer_id: &str) -> DbResult<bool> {
        if self.get(uid).await?.is_none() {
            return Err(DbError::not_found("Customer", uid));
        }

        let result = sqlx::query(
            "UPDATE customers SET customer_id = ?2 WHERE uid = ?1 AND customer_id IS NULL",
        )
        .bind(uid)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
