//! In-memory implementation of every store trait, for tests and demos.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use aisle_core::{Cart, CustomerProfile, Order, Product, PurchaseRecord};

use super::{CartStore, CatalogSource, CustomerStore, OrderStore, SequenceStore};
use crate::error::{SyncError, SyncResult};

#[derive(Default)]
struct State {
    products: Vec<Product>,
    carts: HashMap<String, Cart>,
    orders: HashMap<String, Order>,
    purchases: HashMap<String, Vec<PurchaseRecord>>,
    customers: HashMap<String, CustomerProfile>,
    counters: HashMap<String, u64>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    cart_writes_failing: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        InMemoryStore {
            state: Mutex::new(State {
                products: products.into_iter().collect(),
                ..State::default()
            }),
            cart_writes_failing: AtomicBool::new(false),
        }
    }

    /// Makes `save_cart` fail until switched back.
    pub fn set_cart_writes_failing(&self, failing: bool) {
        self.cart_writes_failing.store(failing, Ordering::SeqCst);
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }
}

#[async_trait]
impl CatalogSource for InMemoryStore {
    async fn product_by_id(&self, id: &str) -> SyncResult<Option<Product>> {
        let state = self.state.lock().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn product_by_title(&self, title: &str) -> SyncResult<Option<Product>> {
        let state = self.state.lock().await;
        Ok(state.products.iter().find(|p| p.title_matches(title)).cloned())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn save_cart(&self, customer_uid: &str, cart: &Cart) -> SyncResult<()> {
        if self.cart_writes_failing.load(Ordering::SeqCst) {
            return Err(SyncError::Persistence("cart store unavailable".into()));
        }
        let mut state = self.state.lock().await;
        state.carts.insert(customer_uid.to_string(), cart.clone());
        Ok(())
    }

    async fn load_cart(&self, customer_uid: &str) -> SyncResult<Option<Cart>> {
        let state = self.state.lock().await;
        Ok(state.carts.get(customer_uid).cloned())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order, customer_uid: &str) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        if state.orders.contains_key(&order.order_number) {
            return Err(SyncError::DuplicateOrder(order.order_number.clone()));
        }
        state
            .orders
            .insert(order.order_number.clone(), order.clone());
        state
            .purchases
            .entry(customer_uid.to_string())
            .or_default()
            .insert(0, PurchaseRecord::from(order));
        Ok(())
    }

    async fn order(&self, order_number: &str) -> SyncResult<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.orders.get(order_number).cloned())
    }

    async fn purchases(&self, customer_uid: &str) -> SyncResult<Vec<PurchaseRecord>> {
        let state = self.state.lock().await;
        Ok(state.purchases.get(customer_uid).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn insert_customer(&self, profile: &CustomerProfile) -> SyncResult<()> {
        let mut state = self.state.lock().await;
        if state.customers.contains_key(&profile.uid) {
            return Err(SyncError::Persistence(format!(
                "customer {} already exists",
                profile.uid
            )));
        }
        state.customers.insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    async fn customer(&self, uid: &str) -> SyncResult<Option<CustomerProfile>> {
        let state = self.state.lock().await;
        Ok(state.customers.get(uid).cloned())
    }

    async fn assign_customer_id(&self, uid: &str, customer_id: &str) -> SyncResult<bool> {
        let mut state = self.state.lock().await;
        let profile = state
            .customers
            .get_mut(uid)
            .ok_or_else(|| SyncError::NotFound(format!("customer {uid}")))?;
        if profile.customer_id.is_some() {
            return Ok(false);
        }
        profile.customer_id = Some(customer_id.to_string());
        Ok(true)
    }
}

#[async_trait]
impl SequenceStore for InMemoryStore {
    async fn current(&self, name: &str) -> SyncResult<Option<u64>> {
        let state = self.state.lock().await;
        Ok(state.counters.get(name).copied())
    }

    async fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<u64>,
        next: u64,
    ) -> SyncResult<bool> {
        let mut state = self.state.lock().await;
        if state.counters.get(name).copied() != expected {
            return Ok(false);
        }
        state.counters.insert(name.to_string(), next);
        Ok(true)
    }
}
