//! # Scan Payloads
//!
//! QR codes on shelf labels carry `id|title|weight|price`. The camera keeps
//! decoding the same label many times a second, so decoded text goes through
//! a [`ScanDebouncer`] before [`ScanPayload::parse`].
//!
//! ## Decode Flow
//! ```text
//! camera text ──► ScanDebouncer ──► ScanPayload::parse ──► catalog lookup
//!                  │                  │                     │
//!                  │ same text        │ blank id            │ miss + 4 fields
//!                  │ within window    │   → MalformedScan   │   → rebuilt Product
//!                  ▼                  ▼                     │ miss + fewer
//!                dropped            'E'                     ▼   → NotFound ('E')
//! ```
//!
//! The debouncer holds no clock. Callers pass the instant of each scan, which
//! keeps it deterministic under test.

use std::time::{Duration, Instant};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Product;

// =============================================================================
// Payload
// =============================================================================

/// A decoded QR label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPayload {
    pub id: String,
    pub title: Option<String>,
    pub weight: Option<String>,
    pub price: Option<String>,
}

impl ScanPayload {
    /// Splits on `|` and trims every field. Empty fields become `None`.
    ///
    /// ## Errors
    /// `MalformedScan` when the id field is missing or blank.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let mut fields = text.split('|').map(str::trim);
        let id = fields.next().unwrap_or_default();
        if id.is_empty() {
            return Err(ValidationError::MalformedScan {
                payload: text.to_string(),
                reason: "missing product id".to_string(),
            });
        }

        let mut next_field = || {
            fields
                .next()
                .filter(|f| !f.is_empty())
                .map(str::to_string)
        };
        let title = next_field();
        let weight = next_field();
        let price = next_field();

        Ok(ScanPayload {
            id: id.to_string(),
            title,
            weight,
            price,
        })
    }

    /// True when the label carries everything needed to rebuild the product.
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.weight.is_some() && self.price.is_some()
    }

    /// Product built from the label alone, for ids the catalog doesn't know.
    ///
    /// Returns `Ok(None)` unless all four fields are present. An unreadable
    /// price becomes zero.
    ///
    /// ## Errors
    /// `MalformedScan` when the price is negative or above
    /// [`MAX_SCANNED_PRICE_CENTS`](crate::MAX_SCANNED_PRICE_CENTS).
    pub fn to_product(&self) -> Result<Option<Product>, ValidationError> {
        let (Some(title), Some(weight), Some(price)) = (&self.title, &self.weight, &self.price)
        else {
            return Ok(None);
        };

        let price_cents = Money::parse_decimal(price).cents();
        if !(0..=crate::MAX_SCANNED_PRICE_CENTS).contains(&price_cents) {
            return Err(ValidationError::MalformedScan {
                payload: self.id.clone(),
                reason: format!("price '{price}' out of range"),
            });
        }

        Ok(Some(Product {
            id: self.id.clone(),
            title: title.clone(),
            price_cents,
            discount_price_cents: None,
            weight_spec: weight.clone(),
            category: None,
        }))
    }
}

// =============================================================================
// Debouncer
// =============================================================================

/// Drops a scan identical to the last accepted one inside `window`.
///
/// Only accepted scans move `last_seen`: holding a label in front of the
/// camera for ten seconds produces one add, then another once the window
/// has passed since that add.
#[derive(Debug, Clone)]
pub struct ScanDebouncer {
    window: Duration,
    last_value: Option<String>,
    last_seen: Option<Instant>,
}

impl ScanDebouncer {
    pub fn new(window: Duration) -> Self {
        ScanDebouncer {
            window,
            last_value: None,
            last_seen: None,
        }
    }

    /// Returns `true` if `text` should be processed.
    pub fn accept(&mut self, text: &str, now: Instant) -> bool {
        if let (Some(last_value), Some(last_seen)) = (&self.last_value, self.last_seen) {
            if last_value == text && now.saturating_duration_since(last_seen) < self.window {
                return false;
            }
        }
        self.last_value = Some(text.to_string());
        self.last_seen = Some(now);
        true
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for ScanDebouncer {
    fn default() -> Self {
        ScanDebouncer::new(Duration::from_millis(crate::DEFAULT_SCAN_DEBOUNCE_MS))
    }
}
