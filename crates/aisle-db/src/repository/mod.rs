//! # Repository Module
//!
//! Database repository implementations for Aisle.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  aisle-sync store adapter                                               │
//! │       │                                                                 │
//! │       │  db.orders().insert(&order, uid)                                │
//! │       ▼                                                                 │
//! │  OrderRepository ──► SQL ──► SQLite                                     │
//! │                                                                         │
//! │  ProductRepository   catalog lookups (id, case-insensitive title)       │
//! │  CustomerRepository  profiles, customer-id assignment                   │
//! │  CartRepository      one JSON snapshot per customer uid                 │
//! │  OrderRepository     insert-once orders + purchase history              │
//! │  CounterRepository   compare-and-swap sequence counters                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cart;
pub mod counter;
pub mod customer;
pub mod order;
pub mod product;

/// Key used for case-insensitive title lookups.
pub(crate) fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}
