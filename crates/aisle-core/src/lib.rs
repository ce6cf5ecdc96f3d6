//! # aisle-core: Pure Basket Logic
//!
//! Everything the smart basket decides without touching the outside world:
//! cart transitions, expected-weight reconciliation, scan payload decoding,
//! edge-triggered mode signals and order totals.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Aisle Architecture                               │
//! │                                                                         │
//! │   Scanner ──► QR text      Mode switch ──► Modes      Scale ──► Weight  │
//! │        │                          │                         │           │
//! │  ┌─────▼──────────────────────────▼─────────────────────────▼───────┐   │
//! │  │                aisle-sync (intake, coordinator)                  │   │
//! │  └─────────────────────────────┬────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼────────────────────────────────────┐   │
//! │  │               ★ aisle-core (THIS CRATE) ★                        │   │
//! │  │                                                                  │   │
//! │  │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ ┌──────┐ │   │
//! │  │  │  cart  │ │ weight │ │  scan  │ │ signal │ │ order  │ │money │ │   │
//! │  │  └────────┘ └────────┘ └────────┘ └────────┘ └────────┘ └──────┘ │   │
//! │  │                                                                  │   │
//! │  │   NO I/O • NO CLOCK • NO DATABASE • PURE FUNCTIONS               │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, signals)
//! - [`cart`] - The basket and its Add/Remove/Reset transitions
//! - [`weight`] - Weight-spec parsing and tolerance checks
//! - [`scan`] - QR payload decoding and the debounce window
//! - [`signal`] - Edge trigger for the mode channel
//! - [`order`] - Totals and identifier formats
//! - [`money`] - Integer money
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use aisle_core::weight::parse_weight_spec;
//!
//! assert_eq!(parse_weight_spec("1kg"), 1000.0);
//! assert_eq!(parse_weight_spec("12 eggs"), 600.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod scan;
pub mod signal;
pub mod types;
pub mod validation;
pub mod weight;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartItem, ProductRef};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate};
pub use types::*;
pub use weight::WeightSample;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single basket.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// A stuck mode switch re-firing `AddItem` should hit a wall long before
/// the basket becomes absurd.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum allowed gap between expected and measured weight, in grams.
pub const DEFAULT_WEIGHT_TOLERANCE_GRAMS: f64 = 2.0;

/// Sales tax applied at checkout, in basis points (500 = 5%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 500;

/// Identical scans inside this window are treated as one.
pub const DEFAULT_SCAN_DEBOUNCE_MS: u64 = 2000;

/// Highest price a label may carry for a product the catalog doesn't know
/// (100,000.00).
pub const MAX_SCANNED_PRICE_CENTS: i64 = 10_000_000;

/// Counter that numbers customers (`CUST0001`, ...).
pub const CUSTOMER_ID_COUNTER: &str = "customerIdCounter";

/// Counter that numbers orders (`ORD-000001`, ...).
pub const ORDER_NUMBER_COUNTER: &str = "orderNumberCounter";
