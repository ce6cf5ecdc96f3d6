//! # Basket
//!
//! The in-memory cart and its transitions.
//!
//! ## Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Basket Transitions (single Idle state)               │
//! │                                                                         │
//! │  AddItem(product) ────► line exists? qty += 1 : push(qty = 1)          │
//! │                                                                         │
//! │  RemoveItem(ref) ─────► qty > 1 ? qty -= 1 : remove line               │
//! │                         not in basket → NotInCart (no change)          │
//! │                                                                         │
//! │  Reset ───────────────► items.clear()                                  │
//! │                                                                         │
//! │  Checkout ────────────► handled by the engine; ends in Reset           │
//! │                                                                         │
//! │  After every change: expected_grams() = Σ grams(spec) × qty            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by product `id`
//! - Quantity is always ≥ 1; a line that would reach 0 is removed
//! - Insertion order is display order
//! - A failed transition leaves the basket untouched

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{OrderItem, Product};
use crate::weight::parse_weight_spec;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Product Reference
// =============================================================================

/// How an intake pipeline names the product a transition is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProductRef {
    /// Title read from `Product_Name` (mode path), matched case-insensitively.
    Title(String),
    /// Catalog id.
    Id(String),
    /// Already resolved (scan path).
    Resolved(Product),
}

impl ProductRef {
    /// Human-readable form for logs and errors.
    pub fn describe(&self) -> &str {
        match self {
            ProductRef::Title(title) => title,
            ProductRef::Id(id) => id,
            ProductRef::Resolved(product) => &product.title,
        }
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// One line of the basket.
///
/// Price and weight spec are frozen from the product when the line is
/// created; later catalog edits don't reach a line already in the basket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartItem {
    pub id: String,
    pub title: String,
    pub unit_price_cents: i64,
    pub discount_price_cents: Option<i64>,
    pub weight_spec: String,
    pub quantity: i64,
}

impl CartItem {
    pub fn from_product(product: &Product) -> Self {
        CartItem {
            id: product.id.clone(),
            title: product.title.clone(),
            unit_price_cents: product.price_cents,
            discount_price_cents: product.discount_price_cents,
            weight_spec: product.weight_spec.clone(),
            quantity: 1,
        }
    }

    pub fn effective_price(&self) -> Money {
        Money::from_cents(self.discount_price_cents.unwrap_or(self.unit_price_cents))
    }

    pub fn line_total(&self) -> Result<Money, ValidationError> {
        self.effective_price()
            .checked_mul(self.quantity)
            .ok_or_else(|| ValidationError::AmountOverflow {
                what: format!("line total of {}", self.id),
            })
    }

    /// Grams this line contributes to the expected weight.
    pub fn grams(&self) -> f64 {
        parse_weight_spec(&self.weight_spec) * self.quantity as f64
    }

    pub fn title_matches(&self, title: &str) -> bool {
        self.title.trim().to_lowercase() == title.trim().to_lowercase()
    }

    /// Frozen copy for an order record.
    pub fn to_order_item(&self) -> OrderItem {
        OrderItem {
            id: self.id.clone(),
            title: self.title.clone(),
            price_cents: self.effective_price().cents(),
            quantity: self.quantity,
            weight: self.weight_spec.clone(),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The basket of one customer session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Cart { items: Vec::new() }
    }

    /// Adds one unit of `product`.
    ///
    /// ## Returns
    /// The line's quantity after the add.
    pub fn add_product(&mut self, product: &Product) -> CoreResult<i64> {
        let quantity = self.push_unit(product)?;
        if let Err(e) = self.subtotal() {
            self.pop_unit(&product.id);
            return Err(e.into());
        }
        Ok(quantity)
    }

    fn push_unit(&mut self, product: &Product) -> CoreResult<i64> {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == product.id) {
            let new_qty = item.quantity + 1;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = new_qty;
            return Ok(new_qty);
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(CartItem::from_product(product));
        Ok(1)
    }

    /// Undoes a `push_unit` that left the basket unpriceable.
    fn pop_unit(&mut self, id: &str) {
        if let Some(position) = self.items.iter().position(|i| i.id == id) {
            if self.items[position].quantity > 1 {
                self.items[position].quantity -= 1;
            } else {
                self.items.remove(position);
            }
        }
    }

    /// Removes one unit of the referenced product.
    ///
    /// `Title` matches case-insensitively, `Id` exactly, `Resolved` by the
    /// product's id.
    ///
    /// ## Returns
    /// The line's remaining quantity (0 when the line was dropped).
    pub fn remove_one(&mut self, product: &ProductRef) -> CoreResult<i64> {
        let position = self
            .position(product)
            .ok_or_else(|| CoreError::NotInCart(product.describe().to_string()))?;

        let item = &mut self.items[position];
        if item.quantity > 1 {
            item.quantity -= 1;
            Ok(item.quantity)
        } else {
            self.items.remove(position);
            Ok(0)
        }
    }

    /// The line `product` refers to, if it's in the basket.
    pub fn find(&self, product: &ProductRef) -> Option<&CartItem> {
        self.position(product).map(|i| &self.items[i])
    }

    fn position(&self, product: &ProductRef) -> Option<usize> {
        match product {
            ProductRef::Title(title) => self.items.iter().position(|i| i.title_matches(title)),
            ProductRef::Id(id) => self.items.iter().position(|i| &i.id == id),
            ProductRef::Resolved(p) => self.items.iter().position(|i| i.id == p.id),
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn quantity_of(&self, id: &str) -> i64 {
        self.items
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.quantity)
            .unwrap_or(0)
    }

    /// Expected basket weight in grams. Depends on nothing but the lines.
    pub fn expected_grams(&self) -> f64 {
        self.items
            .iter()
            .map(CartItem::grams)
            .fold(0.0, |acc, grams| acc + grams)
    }

    /// Σ effective price × quantity.
    pub fn subtotal(&self) -> Result<Money, ValidationError> {
        let mut subtotal = Money::zero();
        for item in &self.items {
            subtotal = subtotal
                .checked_add(item.line_total()?)
                .ok_or_else(|| ValidationError::AmountOverflow {
                    what: "basket subtotal".to_string(),
                })?;
        }
        Ok(subtotal)
    }
}
