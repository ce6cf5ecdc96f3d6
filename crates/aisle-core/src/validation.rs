//! # Validation Module
//!
//! Checks applied before anything reaches the catalog or the customer table.
//!
//! ## Usage
//! ```rust
//! use aisle_core::validation::validate_title;
//!
//! assert!(validate_title("Greek Yogurt Natural").is_ok());
//! assert!(validate_title("   ").is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{CustomerProfile, Product};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_TITLE_LEN: usize = 200;
const MAX_ID_LEN: usize = 64;

fn required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Product ids are opaque but must be present and short enough to be a key.
pub fn validate_product_id(id: &str) -> ValidationResult<()> {
    required("id", id)?;
    if id.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "id".to_string(),
            max: MAX_ID_LEN,
        });
    }
    Ok(())
}

pub fn validate_title(title: &str) -> ValidationResult<()> {
    required("title", title)?;
    if title.trim().len() > MAX_TITLE_LEN {
        return Err(ValidationError::TooLong {
            field: "title".to_string(),
            max: MAX_TITLE_LEN,
        });
    }
    Ok(())
}

/// Validates a catalog product before it is stored.
///
/// ## Rules
/// - id and title present
/// - prices not negative
/// - a discount price never above the regular price
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_product_id(&product.id)?;
    validate_title(&product.title)?;

    if product.price_cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    if let Some(discount) = product.discount_price_cents {
        if discount < 0 || discount > product.price_cents {
            return Err(ValidationError::OutOfRange {
                field: "discountPrice".to_string(),
                min: 0,
                max: product.price_cents,
            });
        }
    }
    Ok(())
}

/// Validates a customer registration.
///
/// An empty email is allowed (walk-in guests); a non-empty one needs an `@`
/// with something on both sides.
pub fn validate_customer(profile: &CustomerProfile) -> ValidationResult<()> {
    required("uid", &profile.uid)?;
    required("fullName", &profile.full_name)?;

    let email = profile.email.trim();
    if !email.is_empty() {
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !valid {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "expected name@domain".to_string(),
            });
        }
    }
    Ok(())
}
