//! # Orders
//!
//! Checkout arithmetic and the identifier formats minted by the allocator.
//!
//! ## Checkout Pipeline (pure part)
//! ```text
//! Cart ──► OrderTotals::compute(rate) ──► OrderDraft ──► into_order(number, now)
//!            subtotal = Σ price × qty         items frozen    immutable Order
//!            tax      = 5% (rounded)          payment info
//!            total    = subtotal + tax        weight check
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::ValidationError;
use crate::money::{Money, TaxRate};
use crate::types::{CustomerProfile, Order, OrderItem, PaymentReceipt, WeightValidation};

/// `CUST` + sequence, zero-padded to four digits.
///
/// ## Example
/// ```rust
/// use aisle_core::order::format_customer_id;
///
/// assert_eq!(format_customer_id(7), "CUST0007");
/// assert_eq!(format_customer_id(12345), "CUST12345");
/// ```
pub fn format_customer_id(sequence: u64) -> String {
    format!("CUST{:04}", sequence)
}

/// `ORD-` + sequence, zero-padded to six digits.
pub fn format_order_number(sequence: u64) -> String {
    format!("ORD-{:06}", sequence)
}

/// Money side of a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl OrderTotals {
    /// ## Errors
    /// `AmountOverflow` when the subtotal or the taxed total can't be
    /// represented.
    pub fn compute(cart: &Cart, rate: TaxRate) -> Result<Self, ValidationError> {
        let subtotal = cart.subtotal()?;
        let tax = subtotal.calculate_tax(rate);
        let total = subtotal
            .checked_add(tax)
            .ok_or_else(|| ValidationError::AmountOverflow {
                what: "order total".to_string(),
            })?;
        Ok(OrderTotals {
            subtotal,
            tax,
            total,
        })
    }
}

/// Everything an order needs except its number and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub customer_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub payment: PaymentReceipt,
    pub weight_validation: WeightValidation,
}

impl OrderDraft {
    /// Freezes the basket for checkout.
    ///
    /// `customer_id` is passed separately: guests get theirs minted right
    /// before this is called.
    pub fn new(
        customer: &CustomerProfile,
        customer_id: String,
        cart: &Cart,
        totals: OrderTotals,
        payment: PaymentReceipt,
        weight_validation: WeightValidation,
    ) -> Self {
        OrderDraft {
            customer_id,
            customer_name: customer.full_name.clone(),
            customer_email: customer.email.clone(),
            items: cart.items.iter().map(|i| i.to_order_item()).collect(),
            totals,
            payment,
            weight_validation,
        }
    }

    pub fn into_order(self, order_number: String, created_at: DateTime<Utc>) -> Order {
        Order {
            order_number,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            items: self.items,
            subtotal_cents: self.totals.subtotal.cents(),
            tax_cents: self.totals.tax.cents(),
            total_cents: self.totals.total.cents(),
            payment_method: self.payment.method,
            payment_id: self.payment.payment_id,
            payment_status: self.payment.status,
            weight_validation: self.weight_validation,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, Product};
    use crate::weight::WeightSample;

    fn product(id: &str, price_cents: i64, discount: Option<i64>) -> Product {
        Product {
            id: id.to_string(),
            title: format!("Product {}", id),
            price_cents,
            discount_price_cents: discount,
            weight_spec: "500g".to_string(),
            category: None,
        }
    }

    #[test]
    fn test_id_formats() {
        assert_eq!(format_customer_id(1), "CUST0001");
        assert_eq!(format_customer_id(7), "CUST0007");
        assert_eq!(format_customer_id(12345), "CUST12345");
        assert_eq!(format_order_number(42), "ORD-000042");
    }

    #[test]
    fn test_totals_with_five_percent_tax() {
        let mut cart = Cart::new();
        cart.add_product(&product("a", 2499, Some(1999))).unwrap();
        cart.add_product(&product("b", 499, None)).unwrap();

        let totals = OrderTotals::compute(&cart, TaxRate::from_bps(500)).unwrap();
        assert_eq!(totals.subtotal.cents(), 2498);
        // 24.98 × 5% = 1.249 → 1.25
        assert_eq!(totals.tax.cents(), 125);
        assert_eq!(totals.total.cents(), 2623);
    }

    #[test]
    fn test_draft_into_order() {
        let mut cart = Cart::new();
        cart.add_product(&product("a", 1000, None)).unwrap();
        let customer = CustomerProfile {
            uid: "u1".into(),
            customer_id: None,
            full_name: "Ada".into(),
            email: "ada@example.com".into(),
        };
        let validation = WeightSample::new(500.0, 499.0, 2.0).validation();
        let totals = OrderTotals::compute(&cart, TaxRate::default()).unwrap();

        let draft = OrderDraft::new(
            &customer,
            "CUST0001".into(),
            &cart,
            totals,
            PaymentReceipt::cash(),
            validation,
        );
        let order = draft.into_order(format_order_number(1), Utc::now());

        assert_eq!(order.order_number, "ORD-000001");
        assert_eq!(order.customer_id, "CUST0001");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.total_cents, 1050);
        assert_eq!(order.payment_method, PaymentMethod::OfflineCash);
        assert!(order.weight_validation.is_valid);
    }

    #[test]
    fn test_tax_overflow_is_a_validation_error() {
        let mut cart = Cart::new();
        cart.add_product(&product("a", i64::MAX - 10, None)).unwrap();

        let err = OrderTotals::compute(&cart, TaxRate::default()).unwrap_err();
        assert!(matches!(err, ValidationError::AmountOverflow { .. }));
    }
}
