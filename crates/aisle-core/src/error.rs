//! # Error Types
//!
//! Domain-specific error types for aisle-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  aisle-core errors (this file)                                          │
//! │  ├── CoreError        - Lookup and basket rule failures                 │
//! │  └── ValidationError  - Rejected input (scan, weight, empty basket)     │
//! │                                                                         │
//! │  aisle-db errors                                                        │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  aisle-sync errors                                                      │
//! │  └── SyncError        - Engine failures, classified into ErrorKind      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → 'E' on Direction       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Basket rule failures.
///
/// None of these are fatal: the transition that produced one is abandoned and
/// the basket stays exactly as it was.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No catalog product matches the reference.
    ///
    /// ## When This Occurs
    /// - `Product_Name` holds a title the catalog doesn't know
    /// - A scanned id is unknown and the payload is too short to rebuild it
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The product exists but isn't in the basket.
    ///
    /// ## When This Occurs
    /// - `RemoveItem` for something that was never added (or already removed)
    #[error("Product not in cart: {0}")]
    NotInCart(String),

    /// Basket has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., email without '@').
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Scanned text could not be decoded into a product reference.
    ///
    /// ## When This Occurs
    /// - Payload is empty or its first field (the id) is blank
    /// - The label's price is negative or above the scanned-price limit
    #[error("Malformed scan payload '{payload}': {reason}")]
    MalformedScan { payload: String, reason: String },

    /// A money amount left the representable range.
    ///
    /// ## When This Occurs
    /// - A line total or basket subtotal would overflow
    /// - Tax pushes the order total past the limit
    #[error("Amount overflow while computing {what}")]
    AmountOverflow { what: String },

    /// Checkout refused because the basket is empty.
    #[error("Cart is empty")]
    EmptyCart,

    /// Checkout refused because the scale disagrees with the basket.
    ///
    /// ## User Workflow
    /// ```text
    /// Basket says 500.00 g
    ///      │
    ///      ▼
    /// Scale reports 497.00 g   (difference 3.00 g > tolerance 2.00 g)
    ///      │
    ///      ▼
    /// WeightMismatch → 'E' on Direction, basket untouched
    /// ```
    #[error(
        "Weight mismatch: expected {expected:.2} g, measured {actual:.2} g (tolerance {tolerance:.2} g)"
    )]
    WeightMismatch {
        expected: f64,
        actual: f64,
        tolerance: f64,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_mismatch_message() {
        let err = ValidationError::WeightMismatch {
            expected: 500.0,
            actual: 497.0,
            tolerance: 2.0,
        };
        assert_eq!(
            err.to_string(),
            "Weight mismatch: expected 500.00 g, measured 497.00 g (tolerance 2.00 g)"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::EmptyCart.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
