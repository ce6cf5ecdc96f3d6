//! # Weight Reconciliation
//!
//! Turns catalog weight specs into grams and decides whether the scale agrees
//! with the basket.
//!
//! ## Two Independent Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Cart contents ──► Σ parse_weight_spec(spec) × qty ──► expected grams  │
//! │                                                        (Product_Weight) │
//! │                                                                         │
//! │  Load cell ──────────────────────────────────────────► actual grams    │
//! │                                                        (Weight)         │
//! │                                                                         │
//! │            |expected − actual| ≤ tolerance  ⇒  checkout allowed         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Expected grams never come from the scale and actual grams never come from
//! the cart. Mixing them would make the check pass trivially.
//!
//! ## Spec Grammar
//! Case-insensitive, first matching unit wins:
//!
//! | contains | grams            |
//! |----------|------------------|
//! | `kg`     | number × 1000    |
//! | `egg`    | number × 50      |
//! | `g`      | number           |
//! | `ml`     | number           |
//! | `l`      | number × 1000    |
//! | —        | number           |
//!
//! The number is the first decimal in the text; no number means 0 g.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::WeightValidation;

/// Grams assumed per egg.
pub const GRAMS_PER_EGG: f64 = 50.0;

/// Slack added to the tolerance so `difference == tolerance` survives
/// binary rounding (500.0 - 497.99 is not exactly 2.01).
const EPSILON: f64 = 1e-9;

/// Converts a catalog weight spec into grams.
///
/// ## Example
/// ```rust
/// use aisle_core::weight::parse_weight_spec;
///
/// assert_eq!(parse_weight_spec("1kg"), 1000.0);
/// assert_eq!(parse_weight_spec("500g"), 500.0);
/// assert_eq!(parse_weight_spec("750ml"), 750.0);
/// assert_eq!(parse_weight_spec("1l"), 1000.0);
/// assert_eq!(parse_weight_spec("12 eggs"), 600.0);
/// assert_eq!(parse_weight_spec(""), 0.0);
/// assert_eq!(parse_weight_spec("abc"), 0.0);
/// ```
pub fn parse_weight_spec(spec: &str) -> f64 {
    let lower = spec.to_lowercase();
    let value = first_number(&lower).unwrap_or(0.0);

    if lower.contains("kg") {
        value * 1000.0
    } else if lower.contains("egg") {
        value * GRAMS_PER_EGG
    } else if lower.contains('g') || lower.contains("ml") {
        value
    } else if lower.contains('l') {
        value * 1000.0
    } else {
        value
    }
}

/// Reads a scale value. Unreadable input counts as an empty scale.
///
/// Accepts a leading number with trailing noise ("497.5g" → 497.5).
pub fn parse_weight_reading(text: &str) -> f64 {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        return if value.is_finite() { value } else { 0.0 };
    }
    leading_number(trimmed).unwrap_or(0.0)
}

/// Renders grams the way `Product_Weight` carries them: two decimals.
///
/// Negative zero renders as `"0.00"`.
pub fn format_grams(grams: f64) -> String {
    let grams = if grams == 0.0 { 0.0 } else { grams };
    format!("{:.2}", grams)
}

/// First unsigned decimal number anywhere in `text`.
fn first_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let start = bytes.iter().enumerate().position(|(i, b)| {
        b.is_ascii_digit()
            || (*b == b'.' && bytes.get(i + 1).is_some_and(|next| next.is_ascii_digit()))
    })?;
    take_decimal(&text[start..])
}

/// Number at the very start of `text`, optionally signed.
fn leading_number(text: &str) -> Option<f64> {
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    take_decimal(rest).map(|value| sign * value)
}

/// Longest `digits[.digits]` prefix of `text`.
fn take_decimal(text: &str) -> Option<f64> {
    let mut seen_dot = false;
    let end = text
        .char_indices()
        .find(|(_, c)| match c {
            '.' if !seen_dot => {
                seen_dot = true;
                false
            }
            c => !c.is_ascii_digit(),
        })
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    text[..end].trim_end_matches('.').parse::<f64>().ok()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Weight Sample
// =============================================================================

/// One comparison of basket against scale, taken at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSample {
    pub expected_grams: f64,
    pub actual_grams: f64,
    pub tolerance_grams: f64,
}

impl WeightSample {
    pub fn new(expected_grams: f64, actual_grams: f64, tolerance_grams: f64) -> Self {
        WeightSample {
            expected_grams,
            actual_grams,
            tolerance_grams,
        }
    }

    pub fn difference(&self) -> f64 {
        (self.expected_grams - self.actual_grams).abs()
    }

    /// `|expected − actual| ≤ tolerance`, boundary inclusive.
    pub fn is_valid(&self) -> bool {
        self.difference() <= self.tolerance_grams + EPSILON
    }

    /// The record embedded in an order, rounded to two decimals.
    pub fn validation(&self) -> WeightValidation {
        WeightValidation {
            cart_weight: round2(self.expected_grams),
            actual_weight: round2(self.actual_grams),
            difference: round2(self.difference()),
            is_valid: self.is_valid(),
        }
    }

    /// Gate for checkout: the validation record or a `WeightMismatch`.
    pub fn evaluate(&self) -> Result<WeightValidation, ValidationError> {
        if self.is_valid() {
            Ok(self.validation())
        } else {
            Err(ValidationError::WeightMismatch {
                expected: self.expected_grams,
                actual: self.actual_grams,
                tolerance: self.tolerance_grams,
            })
        }
    }
}
