//! # Order Allocator
//!
//! Mints customer ids and order numbers from shared counters and writes
//! finalized orders exactly once.
//!
//! ## Counter Increment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Optimistic increment (per attempt)                     │
//! │                                                                         │
//! │   current = read(counter)            (missing → 0)                      │
//! │   next    = current + 1                                                 │
//! │   compare_and_swap(counter, current, next)                              │
//! │        │                                                                │
//! │        ├── won  ──► return next                                         │
//! │        └── lost ──► sleep(backoff) ──► next attempt                     │
//! │                                                                         │
//! │   attempts exhausted ──► ConcurrencyConflict (never a duplicate)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A value is only ever returned by the caller whose swap wrote it, so two
//! baskets checking out at once can't share an order number. Numbers burned
//! by a later failure (order insert, payment) leave gaps; gaps are fine.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use aisle_core::order::{format_customer_id, format_order_number, OrderDraft};
use aisle_core::validation::validate_customer;
use aisle_core::{CustomerProfile, Order, CUSTOMER_ID_COUNTER, ORDER_NUMBER_COUNTER};

use crate::config::AllocatorSettings;
use crate::error::{SyncError, SyncResult};
use crate::store::{CustomerStore, OrderStore, SequenceStore, Stores};

/// Retry policy for counter increments.
#[derive(Debug, Clone)]
pub struct AllocatorPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for AllocatorPolicy {
    fn default() -> Self {
        AllocatorPolicy::from(&AllocatorSettings::default())
    }
}

impl From<&AllocatorSettings> for AllocatorPolicy {
    fn from(settings: &AllocatorSettings) -> Self {
        AllocatorPolicy {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }
}

#[derive(Clone)]
pub struct OrderAllocator {
    sequences: Arc<dyn SequenceStore>,
    orders: Arc<dyn OrderStore>,
    customers: Arc<dyn CustomerStore>,
    policy: AllocatorPolicy,
}

impl OrderAllocator {
    pub fn new(stores: &Stores, policy: AllocatorPolicy) -> Self {
        OrderAllocator {
            sequences: stores.sequences.clone(),
            orders: stores.orders.clone(),
            customers: stores.customers.clone(),
            policy,
        }
    }

    /// Increments `counter` and returns the value this call wrote.
    ///
    /// ## Errors
    /// - `ConcurrencyConflict` after `max_attempts` lost swaps
    /// - Store errors are returned immediately, without retrying
    pub async fn next(&self, counter: &str) -> SyncResult<u64> {
        let mut backoff = self.create_backoff();

        for attempt in 1..=self.policy.max_attempts {
            let current = self.sequences.current(counter).await?;
            let next = current.unwrap_or(0) + 1;

            if self
                .sequences
                .compare_and_swap(counter, current, next)
                .await?
            {
                debug!(counter, value = next, attempt, "Counter incremented");
                return Ok(next);
            }

            debug!(counter, attempt, ?current, "Counter swap lost, retrying");
            if attempt < self.policy.max_attempts {
                if let Some(delay) = backoff.next_backoff() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        warn!(
            counter,
            attempts = self.policy.max_attempts,
            "Counter contention, giving up"
        );
        Err(SyncError::ConcurrencyConflict {
            counter: counter.to_string(),
            attempts: self.policy.max_attempts,
        })
    }

    pub async fn mint_customer_id(&self) -> SyncResult<String> {
        Ok(format_customer_id(self.next(CUSTOMER_ID_COUNTER).await?))
    }

    pub async fn mint_order_number(&self) -> SyncResult<String> {
        Ok(format_order_number(self.next(ORDER_NUMBER_COUNTER).await?))
    }

    /// Registers a new customer with a freshly minted customer id.
    ///
    /// Any `customer_id` already on `profile` is replaced.
    pub async fn register_customer(&self, mut profile: CustomerProfile) -> SyncResult<CustomerProfile> {
        validate_customer(&profile)?;

        let customer_id = self.mint_customer_id().await?;
        profile.customer_id = Some(customer_id);
        self.customers.insert_customer(&profile).await?;

        info!(
            uid = %profile.uid,
            customer_id = ?profile.customer_id,
            "Customer registered"
        );
        Ok(profile)
    }

    /// Returns the customer's id, minting and storing one if they have none.
    ///
    /// Guests get their id here, at their first valid checkout. If another
    /// session assigned an id in the meantime, that id wins and is adopted.
    pub async fn ensure_customer_id(&self, customer: &mut CustomerProfile) -> SyncResult<String> {
        if let Some(id) = &customer.customer_id {
            return Ok(id.clone());
        }

        let stored = self.customers.customer(&customer.uid).await?;
        if let Some(id) = stored.as_ref().and_then(|p| p.customer_id.clone()) {
            customer.customer_id = Some(id.clone());
            return Ok(id);
        }

        let minted = self.mint_customer_id().await?;
        let id = match stored {
            None => {
                let mut profile = customer.clone();
                profile.customer_id = Some(minted.clone());
                self.customers.insert_customer(&profile).await?;
                minted
            }
            Some(_) => {
                if self
                    .customers
                    .assign_customer_id(&customer.uid, &minted)
                    .await?
                {
                    minted
                } else {
                    self.customers
                        .customer(&customer.uid)
                        .await?
                        .and_then(|p| p.customer_id)
                        .ok_or_else(|| {
                            SyncError::Internal(format!(
                                "customer {} lost its id during assignment",
                                customer.uid
                            ))
                        })?
                }
            }
        };

        info!(uid = %customer.uid, customer_id = %id, "Customer id assigned");
        customer.customer_id = Some(id.clone());
        Ok(id)
    }

    /// Mints an order number and stores the order and its purchase entry.
    ///
    /// ## Errors
    /// `DuplicateOrder` if the number is somehow taken; the stored order is
    /// never overwritten.
    pub async fn place_order(&self, draft: OrderDraft, customer_uid: &str) -> SyncResult<Order> {
        let order_number = self.mint_order_number().await?;
        let order = draft.into_order(order_number, Utc::now());

        self.orders.insert_order(&order, customer_uid).await?;

        info!(
            order_number = %order.order_number,
            customer_id = %order.customer_id,
            total = %order.total(),
            "Order placed"
        );
        Ok(order)
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.policy.initial_backoff,
            max_interval: self.policy.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use aisle_core::order::OrderTotals;
    use aisle_core::{Cart, Money, PaymentReceipt, PurchaseRecord, WeightValidation};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn allocator(store: Arc<InMemoryStore>) -> OrderAllocator {
        OrderAllocator::new(&Stores::in_memory(store), AllocatorPolicy::default())
    }

    fn draft(customer: &CustomerProfile) -> OrderDraft {
        let totals = OrderTotals {
            subtotal: Money::from_cents(1000),
            tax: Money::from_cents(50),
            total: Money::from_cents(1050),
        };
        OrderDraft::new(
            customer,
            "CUST0001".into(),
            &Cart::new(),
            totals,
            PaymentReceipt::cash(),
            WeightValidation {
                cart_weight: 500.0,
                actual_weight: 499.0,
                difference: 1.0,
                is_valid: true,
            },
        )
    }

    #[tokio::test]
    async fn test_sequential_ids() {
        let allocator = allocator(Arc::new(InMemoryStore::new()));

        assert_eq!(allocator.mint_order_number().await.unwrap(), "ORD-000001");
        assert_eq!(allocator.mint_order_number().await.unwrap(), "ORD-000002");
        // Counters are independent.
        assert_eq!(allocator.mint_customer_id().await.unwrap(), "CUST0001");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_unique() {
        const N: u64 = 32;
        let store = Arc::new(InMemoryStore::new());
        let policy = AllocatorPolicy {
            max_attempts: 10_000,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        };
        let allocator = OrderAllocator::new(&Stores::in_memory(store.clone()), policy);

        let tasks: Vec<_> = (0..N)
            .map(|_| {
                let allocator = allocator.clone();
                tokio::spawn(async move { allocator.next(ORDER_NUMBER_COUNTER).await })
            })
            .collect();

        let mut values = HashSet::new();
        for task in tasks {
            let value = task.await.unwrap().unwrap();
            assert!(values.insert(value), "duplicate value {value}");
        }

        assert_eq!(values, (1..=N).collect::<HashSet<_>>());
        assert_eq!(store.current(ORDER_NUMBER_COUNTER).await.unwrap(), Some(N));
    }

    /// A counter that someone else always wins.
    #[derive(Default)]
    struct Contended {
        swaps: AtomicU32,
    }

    #[async_trait]
    impl SequenceStore for Contended {
        async fn current(&self, _name: &str) -> SyncResult<Option<u64>> {
            Ok(Some(7))
        }

        async fn compare_and_swap(
            &self,
            _name: &str,
            _expected: Option<u64>,
            _next: u64,
        ) -> SyncResult<bool> {
            self.swaps.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_conflict() {
        let contended = Arc::new(Contended::default());
        let mut stores = Stores::in_memory(Arc::new(InMemoryStore::new()));
        stores.sequences = contended.clone();
        let policy = AllocatorPolicy {
            max_attempts: 3,
            ..AllocatorPolicy::default()
        };

        let err = OrderAllocator::new(&stores, policy)
            .mint_order_number()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::ConcurrencyConflict { attempts: 3, .. }
        ));
        assert_eq!(contended.swaps.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_place_order_never_overwrites() {
        let store = Arc::new(InMemoryStore::new());
        let allocator = allocator(store.clone());
        let customer = CustomerProfile::guest();

        // Someone already holds ORD-000001 but the counter was never written.
        let squatter = draft(&customer).into_order("ORD-000001".into(), Utc::now());
        store.insert_order(&squatter, "someone-else").await.unwrap();

        let err = allocator
            .place_order(draft(&customer), &customer.uid)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::DuplicateOrder(n) if n == "ORD-000001"));

        // The next attempt gets a fresh number.
        let order = allocator
            .place_order(draft(&customer), &customer.uid)
            .await
            .unwrap();
        assert_eq!(order.order_number, "ORD-000002");

        let history: Vec<PurchaseRecord> = store.purchases(&customer.uid).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].order_number, "ORD-000002");
    }

    #[tokio::test]
    async fn test_guest_gets_id_once() {
        let store = Arc::new(InMemoryStore::new());
        let allocator = allocator(store.clone());
        let mut guest = CustomerProfile::guest();

        let id = allocator.ensure_customer_id(&mut guest).await.unwrap();
        assert_eq!(id, "CUST0001");
        assert_eq!(guest.customer_id.as_deref(), Some("CUST0001"));

        // Stored record is reused even by a fresh in-memory profile.
        let mut same_guest = CustomerProfile {
            customer_id: None,
            ..guest.clone()
        };
        assert_eq!(
            allocator.ensure_customer_id(&mut same_guest).await.unwrap(),
            "CUST0001"
        );
        assert_eq!(store.current(CUSTOMER_ID_COUNTER).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_register_customer_validates() {
        let allocator = allocator(Arc::new(InMemoryStore::new()));

        let mut nameless = CustomerProfile::guest();
        nameless.full_name = "  ".into();
        let err = allocator.register_customer(nameless).await.unwrap_err();
        assert!(err.is_rejection());

        let mut ada = CustomerProfile::guest();
        ada.full_name = "Ada Lovelace".into();
        ada.email = "ada@example.com".into();
        let registered = allocator.register_customer(ada).await.unwrap();
        assert_eq!(registered.customer_id.as_deref(), Some("CUST0001"));
    }
}
