//! # Store Collaborators
//!
//! Everything the basket engine persists or looks up goes through one of
//! these traits, so the engine runs the same against SQLite, against the
//! in-memory fakes in tests, or against a remote backend.
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────┬────────────────────┐
//! │ Trait            │ Used by                      │ Implementations    │
//! ├──────────────────┼──────────────────────────────┼────────────────────┤
//! │ CatalogSource    │ AddItem, scan pipeline       │ Database, InMemory │
//! │ CartStore        │ every cart commit, restore   │ Database, InMemory │
//! │ OrderStore       │ place_order                  │ Database, InMemory │
//! │ CustomerStore    │ register / first checkout    │ Database, InMemory │
//! │ SequenceStore    │ OrderAllocator               │ Database, InMemory │
//! │ PaymentGateway   │ checkout                     │ CashPayments       │
//! └──────────────────┴──────────────────────────────┴────────────────────┘
//! ```

mod memory;
mod sqlite;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use std::sync::Arc;

use aisle_core::{Cart, CustomerProfile, Money, Order, PaymentReceipt, Product, PurchaseRecord};
use aisle_db::Database;

use crate::error::SyncResult;

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Product lookup.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn product_by_id(&self, id: &str) -> SyncResult<Option<Product>>;

    /// Exact title match, ignoring case and surrounding whitespace.
    async fn product_by_title(&self, title: &str) -> SyncResult<Option<Product>>;
}

/// Durable basket snapshot, one per customer.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn save_cart(&self, customer_uid: &str, cart: &Cart) -> SyncResult<()>;
    async fn load_cart(&self, customer_uid: &str) -> SyncResult<Option<Cart>>;
}

/// Finalized orders and the per-customer purchase history.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts the order and its purchase entry together.
    ///
    /// ## Errors
    /// `DuplicateOrder` if the order number is taken. Never overwrites.
    async fn insert_order(&self, order: &Order, customer_uid: &str) -> SyncResult<()>;

    async fn order(&self, order_number: &str) -> SyncResult<Option<Order>>;

    /// Newest first.
    async fn purchases(&self, customer_uid: &str) -> SyncResult<Vec<PurchaseRecord>>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn insert_customer(&self, profile: &CustomerProfile) -> SyncResult<()>;
    async fn customer(&self, uid: &str) -> SyncResult<Option<CustomerProfile>>;

    /// Sets the customer id if the customer has none yet.
    ///
    /// ## Returns
    /// `false` when an id was already assigned (the existing one stands).
    async fn assign_customer_id(&self, uid: &str, customer_id: &str) -> SyncResult<bool>;
}

/// Named monotonically increasing counters.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    async fn current(&self, name: &str) -> SyncResult<Option<u64>>;

    /// Writes `next` only if the counter still holds `expected`
    /// (`None` = never written). Returns whether this call won.
    async fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<u64>,
        next: u64,
    ) -> SyncResult<bool>;
}

/// Takes the money.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn capture(&self, customer: &CustomerProfile, amount: Money)
        -> SyncResult<PaymentReceipt>;
}

/// Payment at the counter: always completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CashPayments;

#[async_trait]
impl PaymentGateway for CashPayments {
    async fn capture(
        &self,
        _customer: &CustomerProfile,
        _amount: Money,
    ) -> SyncResult<PaymentReceipt> {
        Ok(PaymentReceipt::cash())
    }
}

// =============================================================================
// Store Bundle
// =============================================================================

/// One handle per collaborator, shared by the engine components.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogSource>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub sequences: Arc<dyn SequenceStore>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl Stores {
    /// Everything backed by one SQLite database, cash payments.
    pub fn sqlite(db: Database) -> Self {
        let db = Arc::new(db);
        Stores {
            catalog: db.clone(),
            carts: db.clone(),
            orders: db.clone(),
            customers: db.clone(),
            sequences: db,
            payments: Arc::new(CashPayments),
        }
    }

    /// Everything backed by one [`InMemoryStore`], cash payments.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Stores {
            catalog: store.clone(),
            carts: store.clone(),
            orders: store.clone(),
            customers: store.clone(),
            sequences: store,
            payments: Arc::new(CashPayments),
        }
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = payments;
        self
    }
}
