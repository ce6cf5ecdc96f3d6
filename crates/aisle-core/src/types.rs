//! # Domain Types
//!
//! Core domain types used throughout the basket engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │ CustomerProfile │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  order_number   │   │  uid            │       │
//! │  │  title          │   │  items          │   │  customer_id    │       │
//! │  │  price_cents    │   │  totals         │   │  full_name      │       │
//! │  │  weight_spec    │   │  weight_valid.  │   │  email          │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ModeSignal    │   │ OperationStatus │   │  MotionCommand  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  1 AddItem      │   │  'S' Success    │   │  F B L R S      │       │
//! │  │  2 RemoveItem   │   │  'E' Error      │   │                 │       │
//! │  │  3 ResetCart    │   └────────┬────────┘   └────────┬────────┘       │
//! │  │  4 Checkout     │            └──────┬──────────────┘                 │
//! │  └─────────────────┘                   ▼                                │
//! │                              DirectionSignal → one char on Direction    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A catalog product as the basket sees it.
///
/// ## Weight Spec
/// `weight_spec` is free text from the catalog ("500g", "1kg", "12 eggs");
/// [`crate::weight::parse_weight_spec`] turns it into grams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub price_cents: i64,
    /// Sale price; wins over `price_cents` when present.
    pub discount_price_cents: Option<i64>,
    pub weight_spec: String,
    pub category: Option<String>,
}

impl Product {
    /// The price actually charged for one unit.
    pub fn effective_price(&self) -> Money {
        Money::from_cents(self.discount_price_cents.unwrap_or(self.price_cents))
    }

    /// Case-insensitive title comparison used by the mode path.
    pub fn title_matches(&self, title: &str) -> bool {
        self.title.trim().to_lowercase() == title.trim().to_lowercase()
    }
}

// =============================================================================
// Customer
// =============================================================================

/// The shopper a basket session belongs to.
///
/// `customer_id` is the human-facing `CUST0001` identifier. Guests start
/// without one and are numbered at their first valid checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerProfile {
    pub uid: String,
    pub customer_id: Option<String>,
    pub full_name: String,
    pub email: String,
}

impl CustomerProfile {
    /// A fresh guest profile with a random uid.
    pub fn guest() -> Self {
        CustomerProfile {
            uid: uuid::Uuid::new_v4().to_string(),
            customer_id: None,
            full_name: "Guest".to_string(),
            email: String::new(),
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentMethod {
    /// Paid through the online gateway.
    #[serde(rename = "Online")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Online"))]
    Online,
    /// Paid at the counter.
    #[serde(rename = "Offline (Cash)")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Offline (Cash)"))]
    OfflineCash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Online => "Online",
            PaymentMethod::OfflineCash => "Offline (Cash)",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentStatus {
    Completed,
    Failed,
}

/// What the payment collaborator hands back after a capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentReceipt {
    pub method: PaymentMethod,
    pub payment_id: String,
    pub status: PaymentStatus,
}

/// Payment id recorded for counter payments.
pub const CASH_PAYMENT_ID: &str = "CASH_PAYMENT";

impl PaymentReceipt {
    /// Receipt for a cash payment taken at the counter.
    pub fn cash() -> Self {
        PaymentReceipt {
            method: PaymentMethod::OfflineCash,
            payment_id: CASH_PAYMENT_ID.to_string(),
            status: PaymentStatus::Completed,
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// One line of an order, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub title: String,
    /// Unit price charged (discount price when one applied).
    pub price_cents: i64,
    pub quantity: i64,
    /// The weight spec as the catalog wrote it.
    pub weight: String,
}

/// The scale check that let an order through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WeightValidation {
    pub cart_weight: f64,
    pub actual_weight: f64,
    pub difference: f64,
    pub is_valid: bool,
}

/// A finalized checkout. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub order_number: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<OrderItem>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_id: String,
    pub payment_status: PaymentStatus,
    pub weight_validation: WeightValidation,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Purchase-history entry kept per customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseRecord {
    pub order_number: String,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for PurchaseRecord {
    fn from(order: &Order) -> Self {
        PurchaseRecord {
            order_number: order.order_number.clone(),
            total_cents: order.total_cents,
            payment_method: order.payment_method,
            created_at: order.created_at,
        }
    }
}

// =============================================================================
// Mode Signal
// =============================================================================

/// Command written by the basket hardware to the `Modes` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ModeSignal {
    AddItem,
    RemoveItem,
    ResetCart,
    Checkout,
}

impl ModeSignal {
    /// Maps the raw channel value; anything outside 1..=4 is `None`.
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(ModeSignal::AddItem),
            2 => Some(ModeSignal::RemoveItem),
            3 => Some(ModeSignal::ResetCart),
            4 => Some(ModeSignal::Checkout),
            _ => None,
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            ModeSignal::AddItem => 1,
            ModeSignal::RemoveItem => 2,
            ModeSignal::ResetCart => 3,
            ModeSignal::Checkout => 4,
        }
    }

    /// Add and Remove need `Product_Name`; Reset and Checkout don't.
    pub fn needs_product(&self) -> bool {
        matches!(self, ModeSignal::AddItem | ModeSignal::RemoveItem)
    }
}

// =============================================================================
// Direction Channel Signals
// =============================================================================

/// Outcome of a basket transition, reported to the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum OperationStatus {
    Success,
    Error,
}

impl OperationStatus {
    pub fn as_char(&self) -> char {
        match self {
            OperationStatus::Success => 'S',
            OperationStatus::Error => 'E',
        }
    }
}

/// Locomotion command for the basket's motor controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum MotionCommand {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl MotionCommand {
    pub fn as_char(&self) -> char {
        match self {
            MotionCommand::Forward => 'F',
            MotionCommand::Backward => 'B',
            MotionCommand::Left => 'L',
            MotionCommand::Right => 'R',
            MotionCommand::Stop => 'S',
        }
    }

    /// Case-insensitive; only the five motion letters are accepted.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'F' => Some(MotionCommand::Forward),
            'B' => Some(MotionCommand::Backward),
            'L' => Some(MotionCommand::Left),
            'R' => Some(MotionCommand::Right),
            'S' => Some(MotionCommand::Stop),
            _ => None,
        }
    }
}

/// Everything that may be written to the single `Direction` field.
///
/// The two signal families stay separate types inside the engine and only
/// collapse into one character here. `'S'` is shared by `Success` and
/// `Stop`, so a token read back from the channel cannot be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionSignal {
    Status(OperationStatus),
    Motion(MotionCommand),
}

impl DirectionSignal {
    pub fn as_char(&self) -> char {
        match self {
            DirectionSignal::Status(status) => status.as_char(),
            DirectionSignal::Motion(motion) => motion.as_char(),
        }
    }
}

impl From<OperationStatus> for DirectionSignal {
    fn from(status: OperationStatus) -> Self {
        DirectionSignal::Status(status)
    }
}

impl From<MotionCommand> for DirectionSignal {
    fn from(motion: MotionCommand) -> Self {
        DirectionSignal::Motion(motion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn almonds() -> Product {
        Product {
            id: "p1".to_string(),
            title: "Premium Organic Almonds".to_string(),
            price_cents: 2499,
            discount_price_cents: Some(1999),
            weight_spec: "500g".to_string(),
            category: Some("Nuts & Seeds".to_string()),
        }
    }

    #[test]
    fn test_effective_price_prefers_discount() {
        let mut product = almonds();
        assert_eq!(product.effective_price().cents(), 1999);
        product.discount_price_cents = None;
        assert_eq!(product.effective_price().cents(), 2499);
    }

    #[test]
    fn test_title_match_is_case_insensitive() {
        assert!(almonds().title_matches("premium organic ALMONDS"));
        assert!(almonds().title_matches("  Premium Organic Almonds "));
        assert!(!almonds().title_matches("Almonds"));
    }

    #[test]
    fn test_mode_signal_mapping() {
        assert_eq!(ModeSignal::from_value(1), Some(ModeSignal::AddItem));
        assert_eq!(ModeSignal::from_value(4), Some(ModeSignal::Checkout));
        assert_eq!(ModeSignal::from_value(0), None);
        assert_eq!(ModeSignal::from_value(5), None);
        assert_eq!(ModeSignal::RemoveItem.value(), 2);
        assert!(ModeSignal::AddItem.needs_product());
        assert!(!ModeSignal::ResetCart.needs_product());
    }

    #[test]
    fn test_direction_multiplexing() {
        assert_eq!(DirectionSignal::from(OperationStatus::Success).as_char(), 'S');
        assert_eq!(DirectionSignal::from(OperationStatus::Error).as_char(), 'E');
        assert_eq!(DirectionSignal::from(MotionCommand::Left).as_char(), 'L');
        assert_eq!(MotionCommand::from_char('f'), Some(MotionCommand::Forward));
        assert_eq!(MotionCommand::from_char('E'), None);
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::OfflineCash).unwrap(),
            "\"Offline (Cash)\""
        );
        assert_eq!(PaymentReceipt::cash().payment_id, "CASH_PAYMENT");
        assert_eq!(PaymentReceipt::cash().status, PaymentStatus::Completed);
    }
}
