//! # Store Errors
//!
//! What can go wrong below the basket engine, in terms the engine can act on.
//!
//! ```text
//! sqlx::Error ──► DbError ──► SyncError (aisle-sync)
//!                   │
//!                   ├─ NotFound          → NotFound, 'E'
//!                   ├─ UniqueViolation   → DuplicateOrder on order insert
//!                   └─ everything else   → Persistence, 'E'
//! ```
//!
//! Constraint failures are classified with sqlx's [`sqlx::error::ErrorKind`]
//! rather than by matching message text; the message is only read to name
//! the offending column.

use sqlx::error::ErrorKind as SqlxErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A row with the same key is already stored.
    ///
    /// ## When This Occurs
    /// - Inserting an order number that already exists
    /// - Registering a customer uid or customer id twice
    #[error("{column} already holds '{value}'")]
    UniqueViolation { column: String, value: String },

    /// ## When This Occurs
    /// - Recording a purchase for an order that was never inserted
    #[error("Missing referenced row: {0}")]
    ForeignKeyViolation(String),

    /// NOT NULL or CHECK constraint, or a record rejected before writing.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Could not open database: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored JSON snapshot couldn't be written or read back.
    #[error("Snapshot encoding failed: {0}")]
    Snapshot(String),

    #[error("No database connection available")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(column: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

/// `"UNIQUE constraint failed: orders.order_number"` → `"orders.order_number"`.
fn constrained_column(message: &str) -> String {
    message
        .split_once(": ")
        .map(|(_, column)| column.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                SqlxErrorKind::UniqueViolation => DbError::UniqueViolation {
                    column: constrained_column(db_err.message()),
                    value: "unknown".to_string(),
                },
                SqlxErrorKind::ForeignKeyViolation => {
                    DbError::ForeignKeyViolation(db_err.message().to_string())
                }
                SqlxErrorKind::NotNullViolation | SqlxErrorKind::CheckViolation => {
                    DbError::InvalidRecord(db_err.message().to_string())
                }
                _ => DbError::QueryFailed(db_err.message().to_string()),
            },
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Snapshot(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
