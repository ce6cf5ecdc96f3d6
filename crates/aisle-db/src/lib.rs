//! # aisle-db: Database Layer for Aisle
//!
//! SQLite storage for the catalog, customers, basket snapshots, orders and
//! sequence counters. Uses sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Aisle Data Flow                                  │
//! │                                                                         │
//! │  aisle-sync store adapters (CatalogSource, OrderStore, SequenceStore…) │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     aisle-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │   │
//! │  │   │   (pool.rs)   │◄───│ products      │    │  (embedded)  │    │   │
//! │  │   │  SqlitePool   │    │ customers     │    │ 001_init.sql │    │   │
//! │  │   │               │    │ carts, orders │    │              │    │   │
//! │  │   │               │    │ counters      │    │              │    │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aisle_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("aisle.db")).await?;
//! let apple = db.products().find_by_title("apple").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::cart::CartRepository;
pub use repository::counter::CounterRepository;
pub use repository::customer::CustomerRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
