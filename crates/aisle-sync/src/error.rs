//! # Sync Error Types
//!
//! Error types for the basket engine.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Basket Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Rejections     │  │  Persistence    │  │     Allocation          │ │
//! │  │  (publish 'E')  │  │                 │  │                         │ │
//! │  │  NotFound       │  │  Persistence    │  │  ConcurrencyConflict    │ │
//! │  │  Validation     │  │  DuplicateOrder │  │  PaymentFailed          │ │
//! │  │  LimitExceeded  │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │  Configuration  │  │  Internal                                   │  │
//! │  │                 │  │                                             │  │
//! │  │  InvalidConfig  │  │  ChannelError  ShuttingDown  Internal       │  │
//! │  │  ConfigLoad/Save│  │                                             │  │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No variant is process-fatal. A rejected transition leaves the basket as
//! it was; the coordinator keeps draining its queue.

use aisle_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for basket engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Coarse classification used for logging and by callers that only care
/// about the category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Persistence,
    ConcurrencyConflict,
    Payment,
    Configuration,
    Internal,
}

/// Basket engine error covering every failure a transition can hit.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Rejections
    // =========================================================================
    /// Product or cart line could not be located.
    ///
    /// ## When This Occurs
    /// - `Product_Name` is blank or names an unknown product
    /// - A scanned id is unknown and the payload can't rebuild the product
    /// - `RemoveItem` for a product that isn't in the basket
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input or checkout rule failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Basket line or quantity cap reached.
    #[error("Cart limit exceeded: {0}")]
    LimitExceeded(String),

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// A store or channel write failed.
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// An order with this number already exists. Orders are never overwritten.
    #[error("Order {0} already exists")]
    DuplicateOrder(String),

    // =========================================================================
    // Allocation Errors
    // =========================================================================
    /// Counter compare-and-swap lost every attempt.
    #[error("Counter {counter} still contended after {attempts} attempts")]
    ConcurrencyConflict { counter: String, attempts: u32 },

    /// Payment collaborator refused or failed the capture.
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal engine error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Agent is shutting down.
    #[error("Basket agent is shutting down")]
    ShuttingDown,

    /// Command queue send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(what) => SyncError::NotFound(format!("product {what}")),
            CoreError::NotInCart(what) => SyncError::NotFound(format!("{what} is not in the cart")),
            limit @ (CoreError::CartTooLarge { .. } | CoreError::QuantityTooLarge { .. }) => {
                SyncError::LimitExceeded(limit.to_string())
            }
            CoreError::Validation(err) => SyncError::Validation(err),
        }
    }
}

impl From<aisle_db::DbError> for SyncError {
    fn from(err: aisle_db::DbError) -> Self {
        match err {
            aisle_db::DbError::NotFound { entity, id } => {
                SyncError::NotFound(format!("{entity} {id}"))
            }
            other => SyncError::Persistence(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::Validation(_) | SyncError::LimitExceeded(_) => ErrorKind::Validation,
            SyncError::Persistence(_) | SyncError::DuplicateOrder(_) => ErrorKind::Persistence,
            SyncError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            SyncError::PaymentFailed(_) => ErrorKind::Payment,
            SyncError::InvalidConfig(_)
            | SyncError::ConfigLoadFailed(_)
            | SyncError::ConfigSaveFailed(_) => ErrorKind::Configuration,
            SyncError::Internal(_) | SyncError::ShuttingDown | SyncError::ChannelError(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Returns true for rejections of the event itself (bad product, bad
    /// weight, full cart). These are expected during normal shopping.
    pub fn is_rejection(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::Validation)
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_taxonomy() {
        let err: SyncError = CoreError::ProductNotFound("Apple".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: SyncError = CoreError::NotInCart("Apple".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("Apple"));

        let err: SyncError = CoreError::QuantityTooLarge {
            requested: 1000,
            max: 999,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: SyncError = CoreError::Validation(ValidationError::EmptyCart).into();
        assert!(matches!(err, SyncError::Validation(ValidationError::EmptyCart)));
    }

    #[test]
    fn test_rejections() {
        assert!(SyncError::NotFound("x".into()).is_rejection());
        assert!(SyncError::Validation(ValidationError::EmptyCart).is_rejection());
        assert!(!SyncError::Persistence("disk full".into()).is_rejection());
        assert!(!SyncError::ConcurrencyConflict {
            counter: "orderNumberCounter".into(),
            attempts: 8
        }
        .is_rejection());
    }

    #[test]
    fn test_db_errors_are_persistence() {
        let err: SyncError = aisle_db::DbError::duplicate("order_number", "ORD-000001").into();
        assert_eq!(err.kind(), ErrorKind::Persistence);

        let err: SyncError = aisle_db::DbError::not_found("Customer", "u1").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_config_errors() {
        assert!(SyncError::InvalidConfig("bad".into()).is_config_error());
        assert!(!SyncError::ShuttingDown.is_config_error());
    }
}
