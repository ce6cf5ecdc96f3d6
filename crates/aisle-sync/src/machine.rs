//! # Cart State Machine
//!
//! Owns the session's basket and applies one [`Transition`] at a time.
//! Only the [`BasketCoordinator`](crate::coordinator::BasketCoordinator)
//! calls it, so no two transitions ever interleave.
//!
//! ## Commit Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Add / Remove / Reset                                   │
//! │                                                                         │
//! │  1. staged = cart.clone(); apply rule to staged   (reject → no change)  │
//! │  2. CartStore.save_cart(staged)                   (fail → no change)    │
//! │  3. cart = staged                                                       │
//! │  4. Product_Weight = expected_grams(cart)         ("500.00")            │
//! │  5. Direction = 'S'   (or 'E' if any step failed)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Checkout                                               │
//! │                                                                         │
//! │  1. cart empty?                       → EmptyCart                       │
//! │  2. actual = Weight (missing → 0)                                       │
//! │  3. |expected − actual| ≤ tolerance?  → WeightMismatch, nothing minted  │
//! │  4. totals (5% tax)                   → AmountOverflow, nothing minted  │
//! │  5. customer id (minted for guests)                                     │
//! │  6. payment capture                                                     │
//! │  7. order number minted, order + purchase stored once                   │
//! │  8. cart = empty; persisted; Product_Weight = "0.00"                    │
//! │  9. Direction = 'S'                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Once an order is stored it is the point of no return: the checkout
//! succeeds and the in-memory basket is emptied even if persisting the empty
//! basket or publishing its weight then fails. Those failures are logged and
//! [`CartStateMachine::resync`] repairs them.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use aisle_core::order::{OrderDraft, OrderTotals};
use aisle_core::{
    Cart, CoreError, CustomerProfile, OperationStatus, Order, PaymentStatus, Product, ProductRef, TaxRate,
    WeightSample, DEFAULT_WEIGHT_TOLERANCE_GRAMS,
};

use crate::allocator::OrderAllocator;
use crate::config::CheckoutSettings;
use crate::error::{SyncError, SyncResult};
use crate::feedback::FeedbackPublisher;
use crate::store::Stores;
use crate::topics::{ExpectedWeightTopic, ProductNameTopic, TopicBus, WeightTopic};

// =============================================================================
// Transitions
// =============================================================================

/// A request to change the basket.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Add(ProductRef),
    Remove(ProductRef),
    Reset,
    Checkout,
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Add(_) => "add",
            Transition::Remove(_) => "remove",
            Transition::Reset => "reset",
            Transition::Checkout => "checkout",
        }
    }
}

/// What a successful transition did.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    CartUpdated {
        product_id: String,
        quantity: i64,
        expected_grams: f64,
    },
    CartReset,
    OrderPlaced(Order),
}

/// Read-only view of the session for callers outside the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketSnapshot {
    pub customer: CustomerProfile,
    pub cart: Cart,
    pub expected_grams: f64,
}

/// Checkout rules.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutPolicy {
    pub tolerance_grams: f64,
    pub tax_rate: TaxRate,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        CheckoutPolicy {
            tolerance_grams: DEFAULT_WEIGHT_TOLERANCE_GRAMS,
            tax_rate: TaxRate::default(),
        }
    }
}

impl From<&CheckoutSettings> for CheckoutPolicy {
    fn from(settings: &CheckoutSettings) -> Self {
        CheckoutPolicy {
            tolerance_grams: settings.weight_tolerance_grams,
            tax_rate: settings.tax_rate(),
        }
    }
}

// =============================================================================
// State Machine
// =============================================================================

pub struct CartStateMachine {
    cart: Cart,
    customer: CustomerProfile,
    bus: TopicBus,
    feedback: FeedbackPublisher,
    stores: Stores,
    allocator: OrderAllocator,
    policy: CheckoutPolicy,
}

impl CartStateMachine {
    pub fn new(
        customer: CustomerProfile,
        bus: TopicBus,
        stores: Stores,
        allocator: OrderAllocator,
        policy: CheckoutPolicy,
    ) -> Self {
        CartStateMachine {
            cart: Cart::new(),
            customer,
            feedback: FeedbackPublisher::new(bus.clone()),
            bus,
            stores,
            allocator,
            policy,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn customer(&self) -> &CustomerProfile {
        &self.customer
    }

    pub fn snapshot(&self) -> BasketSnapshot {
        BasketSnapshot {
            customer: self.customer.clone(),
            cart: self.cart.clone(),
            expected_grams: self.cart.expected_grams(),
        }
    }

    /// Loads the customer's last saved basket and republishes its weight.
    pub async fn restore(&mut self) -> SyncResult<()> {
        if let Some(cart) = self.stores.carts.load_cart(&self.customer.uid).await? {
            info!(
                uid = %self.customer.uid,
                lines = cart.item_count(),
                "Restored saved basket"
            );
            self.cart = cart;
        }
        self.publish_weight().await
    }

    /// Re-persists the in-memory basket and republishes its weight.
    ///
    /// Repairs the store and the display after a failed write.
    pub async fn resync(&mut self) -> SyncResult<()> {
        self.stores
            .carts
            .save_cart(&self.customer.uid, &self.cart)
            .await?;
        self.publish_weight().await?;
        info!(uid = %self.customer.uid, lines = self.cart.item_count(), "Basket resynced");
        Ok(())
    }

    /// Applies one transition and reports the outcome on `Direction`.
    pub async fn apply(&mut self, transition: Transition) -> SyncResult<TransitionOutcome> {
        let name = transition.name();
        let result = match transition {
            Transition::Add(product) => self.add(product).await,
            Transition::Remove(product) => self.remove(product).await,
            Transition::Reset => self.reset().await,
            Transition::Checkout => self.checkout().await,
        };

        let status = match &result {
            Ok(_) => OperationStatus::Success,
            Err(e) if e.is_rejection() => {
                warn!(transition = name, error = %e, kind = ?e.kind(), "Transition rejected");
                OperationStatus::Error
            }
            Err(e) => {
                error!(transition = name, error = %e, kind = ?e.kind(), "Transition failed");
                OperationStatus::Error
            }
        };

        if let Err(e) = self.feedback.publish_status(status).await {
            error!(transition = name, error = %e, "Failed to publish status");
            if result.is_ok() {
                return Err(e);
            }
        }
        result
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    async fn add(&mut self, product: ProductRef) -> SyncResult<TransitionOutcome> {
        let show_title = matches!(product, ProductRef::Resolved(_));
        let product = self.resolve(product).await?;

        let mut staged = self.cart.clone();
        let quantity = staged.add_product(&product)?;
        let expected_grams = self.commit(staged).await?;

        if show_title {
            self.bus.write::<ProductNameTopic>(&product.title).await?;
        }

        debug!(
            product_id = %product.id,
            title = %product.title,
            quantity,
            expected_grams,
            "Item added"
        );
        Ok(TransitionOutcome::CartUpdated {
            product_id: product.id,
            quantity,
            expected_grams,
        })
    }

    async fn remove(&mut self, product: ProductRef) -> SyncResult<TransitionOutcome> {
        let mut staged = self.cart.clone();
        let product_id = staged
            .find(&product)
            .map(|item| item.id.clone())
            .unwrap_or_default();

        let quantity = staged.remove_one(&product)?;
        let expected_grams = self.commit(staged).await?;

        debug!(product_id = %product_id, quantity, expected_grams, "Item removed");
        Ok(TransitionOutcome::CartUpdated {
            product_id,
            quantity,
            expected_grams,
        })
    }

    async fn reset(&mut self) -> SyncResult<TransitionOutcome> {
        self.commit(Cart::new()).await?;
        self.bus.write::<ProductNameTopic>(&String::new()).await?;
        info!(uid = %self.customer.uid, "Basket reset");
        Ok(TransitionOutcome::CartReset)
    }

    async fn checkout(&mut self) -> SyncResult<TransitionOutcome> {
        if self.cart.is_empty() {
            return Err(aisle_core::ValidationError::EmptyCart.into());
        }

        let actual = self.bus.read::<WeightTopic>().await?.unwrap_or(0.0);
        let sample = WeightSample::new(
            self.cart.expected_grams(),
            actual,
            self.policy.tolerance_grams,
        );
        let weight_validation = sample.evaluate()?;
        debug!(
            expected = sample.expected_grams,
            actual = sample.actual_grams,
            difference = weight_validation.difference,
            "Weight check passed"
        );

        let totals = OrderTotals::compute(&self.cart, self.policy.tax_rate)?;
        let customer_id = self.allocator.ensure_customer_id(&mut self.customer).await?;

        let receipt = self
            .stores
            .payments
            .capture(&self.customer, totals.total)
            .await?;
        if receipt.status != PaymentStatus::Completed {
            return Err(SyncError::PaymentFailed(format!(
                "payment {} was not completed",
                receipt.payment_id
            )));
        }

        let draft = OrderDraft::new(
            &self.customer,
            customer_id,
            &self.cart,
            totals,
            receipt,
            weight_validation,
        );
        let order = self.allocator.place_order(draft, &self.customer.uid).await?;

        // The order is stored; the basket is done regardless of what follows.
        self.cart = Cart::new();
        if let Err(e) = self
            .stores
            .carts
            .save_cart(&self.customer.uid, &self.cart)
            .await
        {
            error!(
                order_number = %order.order_number,
                error = %e,
                "Order placed but emptied basket not saved, resync required"
            );
        }
        if let Err(e) = self.publish_weight().await {
            error!(
                order_number = %order.order_number,
                error = %e,
                "Order placed but basket weight not published, resync required"
            );
        }

        Ok(TransitionOutcome::OrderPlaced(order))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn resolve(&self, product: ProductRef) -> SyncResult<Product> {
        let found = match &product {
            ProductRef::Resolved(p) => return Ok(p.clone()),
            ProductRef::Title(title) if title.trim().is_empty() => {
                return Err(SyncError::NotFound("Product_Name is empty".into()))
            }
            ProductRef::Title(title) => self.stores.catalog.product_by_title(title).await?,
            ProductRef::Id(id) => self.stores.catalog.product_by_id(id).await?,
        };
        found.ok_or_else(|| CoreError::ProductNotFound(product.describe().to_string()).into())
    }

    /// Persists `staged`, adopts it, and publishes its weight.
    async fn commit(&mut self, staged: Cart) -> SyncResult<f64> {
        self.stores
            .carts
            .save_cart(&self.customer.uid, &staged)
            .await?;
        self.cart = staged;
        self.publish_weight().await?;
        Ok(self.cart.expected_grams())
    }

    async fn publish_weight(&self) -> SyncResult<()> {
        self.bus
            .write::<ExpectedWeightTopic>(&self.cart.expected_grams())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::AllocatorPolicy;
    use crate::channel::InMemoryChannel;
    use crate::store::{CartStore, InMemoryStore, OrderStore, PaymentGateway, SequenceStore};
    use crate::topics::StatusTopic;
    use aisle_core::{Money, PaymentReceipt, ValidationError, ORDER_NUMBER_COUNTER};
    use async_trait::async_trait;
    use std::sync::Arc;

    fn product(id: &str, title: &str, price_cents: i64, weight: &str) -> Product {
        Product {
            id: id.into(),
            title: title.into(),
            price_cents,
            discount_price_cents: None,
            weight_spec: weight.into(),
            category: None,
        }
    }

    struct Harness {
        machine: CartStateMachine,
        bus: TopicBus,
        channel: Arc<InMemoryChannel>,
        store: Arc<InMemoryStore>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::with_products([
            product("p01", "Apple", 120, "500g"),
            product("p02", "Milk", 250, "1l"),
        ]));
        let channel = Arc::new(InMemoryChannel::new());
        let bus = TopicBus::new(channel.clone(), "Shopping_Basket");
        let stores = Stores::in_memory(store.clone());
        let allocator = OrderAllocator::new(&stores, AllocatorPolicy::default());
        let machine = CartStateMachine::new(
            CustomerProfile::guest(),
            bus.clone(),
            stores,
            allocator,
            CheckoutPolicy::default(),
        );
        Harness {
            machine,
            bus,
            channel,
            store,
        }
    }

    fn apple() -> Transition {
        Transition::Add(ProductRef::Title("apple".into()))
    }

    async fn published_weight(bus: &TopicBus) -> serde_json::Value {
        bus.channel()
            .read(&bus.key::<ExpectedWeightTopic>())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_remove_reset_publish_weight() {
        let Harness {
            mut machine, bus, ..
        } = harness();

        machine.apply(apple()).await.unwrap();
        assert_eq!(published_weight(&bus).await, "500.00");

        let outcome = machine.apply(apple()).await.unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::CartUpdated {
                product_id: "p01".into(),
                quantity: 2,
                expected_grams: 1000.0
            }
        );
        assert_eq!(published_weight(&bus).await, "1000.00");

        machine
            .apply(Transition::Remove(ProductRef::Title("APPLE".into())))
            .await
            .unwrap();
        assert_eq!(published_weight(&bus).await, "500.00");

        machine.apply(Transition::Reset).await.unwrap();
        assert_eq!(published_weight(&bus).await, "0.00");
        assert!(machine.cart().is_empty());
        assert_eq!(bus.read::<StatusTopic>().await.unwrap(), Some('S'));
        assert_eq!(bus.read::<ProductNameTopic>().await.unwrap(), Some(String::new()));
    }

    #[tokio::test]
    async fn test_unknown_product_publishes_error() {
        let Harness {
            mut machine, bus, ..
        } = harness();
        machine.apply(apple()).await.unwrap();

        let err = machine
            .apply(Transition::Add(ProductRef::Title("Durian".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
        assert_eq!(bus.read::<StatusTopic>().await.unwrap(), Some('E'));
        assert_eq!(machine.cart().total_quantity(), 1);

        let err = machine
            .apply(Transition::Remove(ProductRef::Title("Milk".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
        assert_eq!(machine.cart().total_quantity(), 1);

        let err = machine
            .apply(Transition::Add(ProductRef::Title("  ".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolved_add_shows_title() {
        let Harness {
            mut machine, bus, ..
        } = harness();
        let scanned = product("x9", "Scanned Snack", 300, "150g");

        machine
            .apply(Transition::Add(ProductRef::Resolved(scanned)))
            .await
            .unwrap();

        assert_eq!(
            bus.read::<ProductNameTopic>().await.unwrap().as_deref(),
            Some("Scanned Snack")
        );
        assert_eq!(published_weight(&bus).await, "150.00");
    }

    #[tokio::test]
    async fn test_weight_mismatch_leaves_cart_and_counter() {
        let Harness {
            mut machine,
            bus,
            store,
            ..
        } = harness();
        machine.apply(apple()).await.unwrap();
        bus.write::<WeightTopic>(&497.0).await.unwrap();

        let err = machine.apply(Transition::Checkout).await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::WeightMismatch { .. })
        ));
        assert_eq!(machine.cart().total_quantity(), 1);
        assert_eq!(store.current(ORDER_NUMBER_COUNTER).await.unwrap(), None);
        assert_eq!(store.order_count().await, 0);
        assert!(machine.customer().customer_id.is_none());
        assert_eq!(bus.read::<StatusTopic>().await.unwrap(), Some('E'));
    }

    #[tokio::test]
    async fn test_checkout_places_order_and_empties_cart() {
        let Harness {
            mut machine,
            bus,
            store,
            ..
        } = harness();
        machine.apply(apple()).await.unwrap();
        machine.apply(apple()).await.unwrap();
        machine
            .apply(Transition::Add(ProductRef::Title("Milk".into())))
            .await
            .unwrap();
        // 2 × 500 g + 1000 g, scale within tolerance.
        bus.write::<WeightTopic>(&1998.0).await.unwrap();

        let order = match machine.apply(Transition::Checkout).await.unwrap() {
            TransitionOutcome::OrderPlaced(order) => order,
            other => panic!("unexpected outcome {other:?}"),
        };

        assert_eq!(order.order_number, "ORD-000001");
        assert_eq!(order.customer_id, "CUST0001");
        assert_eq!(order.subtotal_cents, 490);
        assert_eq!(order.tax_cents, 25);
        assert_eq!(order.total_cents, 515);
        assert_eq!(order.payment_id, "CASH_PAYMENT");
        assert!(order.weight_validation.is_valid);
        assert_eq!(order.weight_validation.difference, 2.0);

        assert!(machine.cart().is_empty());
        assert_eq!(published_weight(&bus).await, "0.00");
        assert_eq!(bus.read::<StatusTopic>().await.unwrap(), Some('S'));
        let uid = machine.customer().uid.clone();
        assert!(store.load_cart(&uid).await.unwrap().unwrap().is_empty());
        assert_eq!(store.purchases(&uid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_checkout_rejected() {
        let Harness { mut machine, .. } = harness();
        let err = machine.apply(Transition::Checkout).await.unwrap_err();
        assert!(matches!(err, SyncError::Validation(ValidationError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_missing_scale_reading_counts_as_zero() {
        let Harness { mut machine, .. } = harness();
        machine.apply(apple()).await.unwrap();

        let err = machine.apply(Transition::Checkout).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::WeightMismatch { actual, .. }) if actual == 0.0
        ));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_cart() {
        let Harness {
            mut machine,
            bus,
            store,
            ..
        } = harness();
        machine.apply(apple()).await.unwrap();

        store.set_cart_writes_failing(true);
        let err = machine.apply(apple()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Persistence);
        assert_eq!(machine.cart().total_quantity(), 1);
        assert_eq!(published_weight(&bus).await, "500.00");
        assert_eq!(bus.read::<StatusTopic>().await.unwrap(), Some('E'));

        store.set_cart_writes_failing(false);
        machine.apply(apple()).await.unwrap();
        assert_eq!(machine.cart().total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_resync_repairs_display() {
        let Harness {
            mut machine,
            bus,
            channel,
            store,
        } = harness();
        machine.apply(apple()).await.unwrap();

        // Cart saved but the weight write is lost.
        channel.set_offline(true);
        let err = machine.apply(apple()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Persistence);
        assert_eq!(machine.cart().total_quantity(), 2);
        channel.set_offline(false);
        assert_eq!(published_weight(&bus).await, "500.00");

        machine.resync().await.unwrap();
        assert_eq!(published_weight(&bus).await, "1000.00");
        let uid = machine.customer().uid.clone();
        assert_eq!(store.load_cart(&uid).await.unwrap().unwrap().total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_placed_order_survives_failed_basket_save() {
        let Harness {
            mut machine,
            bus,
            store,
            ..
        } = harness();
        machine.apply(apple()).await.unwrap();
        bus.write::<WeightTopic>(&500.0).await.unwrap();
        store.set_cart_writes_failing(true);

        let outcome = machine.apply(Transition::Checkout).await.unwrap();

        assert!(matches!(outcome, TransitionOutcome::OrderPlaced(_)));
        assert_eq!(bus.read::<StatusTopic>().await.unwrap(), Some('S'));
        assert!(machine.cart().is_empty());
        assert_eq!(published_weight(&bus).await, "0.00");
        assert_eq!(store.order_count().await, 1);
        let uid = machine.customer().uid.clone();
        assert_eq!(store.load_cart(&uid).await.unwrap().unwrap().total_quantity(), 1);

        store.set_cart_writes_failing(false);
        machine.resync().await.unwrap();
        assert!(store.load_cart(&uid).await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_amount_overflow_is_rejected_not_fatal() {
        let Harness {
            mut machine,
            bus,
            store,
            ..
        } = harness();
        let gold = |cents| {
            Transition::Add(ProductRef::Resolved(product("x1", "Gold Bar", cents, "1g")))
        };

        machine.apply(gold(i64::MAX / 2 + 1)).await.unwrap();
        let err = machine.apply(gold(i64::MAX / 2 + 1)).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::AmountOverflow { .. })
        ));
        assert_eq!(bus.read::<StatusTopic>().await.unwrap(), Some('E'));
        assert_eq!(machine.cart().quantity_of("x1"), 1);

        machine.apply(Transition::Reset).await.unwrap();
        machine.apply(gold(i64::MAX - 10)).await.unwrap();
        bus.write::<WeightTopic>(&1.0).await.unwrap();
        let err = machine.apply(Transition::Checkout).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::AmountOverflow { .. })
        ));
        assert_eq!(bus.read::<StatusTopic>().await.unwrap(), Some('E'));
        assert_eq!(store.order_count().await, 0);
        assert!(machine.customer().customer_id.is_none());

        machine.apply(Transition::Reset).await.unwrap();
        machine.apply(apple()).await.unwrap();
        assert_eq!(published_weight(&bus).await, "500.00");
    }

    #[tokio::test]
    async fn test_restore_loads_saved_cart() {
        let Harness {
            mut machine,
            bus,
            store,
            ..
        } = harness();
        let uid = machine.customer().uid.clone();
        let mut saved = Cart::new();
        saved
            .add_product(&product("p02", "Milk", 250, "1l"))
            .unwrap();
        store.save_cart(&uid, &saved).await.unwrap();

        machine.restore().await.unwrap();

        assert_eq!(machine.cart(), &saved);
        assert_eq!(published_weight(&bus).await, "1000.00");
    }

    struct Declined;

    #[async_trait]
    impl PaymentGateway for Declined {
        async fn capture(
            &self,
            _customer: &CustomerProfile,
            _amount: Money,
        ) -> SyncResult<PaymentReceipt> {
            Ok(PaymentReceipt {
                status: PaymentStatus::Failed,
                ..PaymentReceipt::cash()
            })
        }
    }

    #[tokio::test]
    async fn test_declined_payment_mints_no_order_number() {
        let store = Arc::new(InMemoryStore::with_products([product(
            "p01", "Apple", 120, "500g",
        )]));
        let bus = TopicBus::new(Arc::new(InMemoryChannel::new()), "");
        let stores = Stores::in_memory(store.clone()).with_payments(Arc::new(Declined));
        let allocator = OrderAllocator::new(&stores, AllocatorPolicy::default());
        let mut machine = CartStateMachine::new(
            CustomerProfile::guest(),
            bus.clone(),
            stores,
            allocator,
            CheckoutPolicy::default(),
        );
        machine.apply(apple()).await.unwrap();
        bus.write::<WeightTopic>(&500.0).await.unwrap();

        let err = machine.apply(Transition::Checkout).await.unwrap_err();

        assert!(matches!(err, SyncError::PaymentFailed(_)));
        assert_eq!(store.current(ORDER_NUMBER_COUNTER).await.unwrap(), None);
        assert_eq!(machine.cart().total_quantity(), 1);
    }
}
