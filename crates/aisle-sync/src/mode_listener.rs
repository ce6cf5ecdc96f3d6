//! # Mode Channel Listener
//!
//! Watches `Modes`, turns level changes into transitions and enqueues them
//! on the coordinator.
//!
//! ## Flow
//! ```text
//! Modes update ──► EdgeTrigger ──► Dispatch(AddItem)   ──► read Product_Name ──► submit(Add(Title))
//!                      │           Dispatch(RemoveItem)──► read Product_Name ──► submit(Remove(Title))
//!                      │           Dispatch(ResetCart) ──────────────────────► submit(Reset)
//!                      │           Dispatch(Checkout)  ──────────────────────► submit(Checkout)
//!                      ├─ Repeat / Idle ──► nothing
//!                      └─ Unknown(v)    ──► warn, nothing published
//! ```
//!
//! The trigger marker moves as soon as a value is classified; the listener
//! never waits for the transition itself. A blank `Product_Name` is still
//! submitted so the machine rejects it and publishes `E`.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use aisle_core::signal::{EdgeDecision, EdgeTrigger};
use aisle_core::{ModeSignal, ProductRef};

use crate::coordinator::CoordinatorHandle;
use crate::error::SyncResult;
use crate::machine::Transition;
use crate::topics::{ModeTopic, ProductNameTopic, TopicBus, TopicEvent, TopicSubscription};

pub struct ModeChannelListener {
    bus: TopicBus,
    coordinator: CoordinatorHandle,
    trigger: EdgeTrigger,
}

/// Running listener. Dropping the handle also stops it.
pub struct ListenerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

impl ModeChannelListener {
    pub fn new(bus: TopicBus, coordinator: CoordinatorHandle) -> Self {
        ModeChannelListener {
            bus,
            coordinator,
            trigger: EdgeTrigger::new(),
        }
    }

    /// Subscribes, adopts the current `Modes` value as already handled, and
    /// spawns the listener loop.
    pub async fn start(mut self) -> SyncResult<ListenerHandle> {
        let subscription = self.bus.subscribe::<ModeTopic>()?;
        let current = self.bus.read::<ModeTopic>().await?;
        self.trigger.prime(current);
        info!(key = %self.bus.key::<ModeTopic>(), baseline = ?current, "Mode listener started");

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(async move {
            self.run(subscription, shutdown_rx).await;
        });

        Ok(ListenerHandle { shutdown_tx, task })
    }

    async fn run(
        mut self,
        mut subscription: TopicSubscription<ModeTopic>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Mode listener stopping");
                    break;
                }
                event = subscription.recv() => match event {
                    TopicEvent::Value(value) => self.handle(value).await,
                    TopicEvent::Lagged(skipped) => {
                        warn!(skipped, "Mode updates dropped, re-reading current value");
                        match self.bus.read::<ModeTopic>().await {
                            Ok(value) => self.handle(value).await,
                            Err(e) => error!(error = %e, "Failed to re-read Modes"),
                        }
                    }
                    TopicEvent::Closed => {
                        info!("Modes channel closed");
                        break;
                    }
                },
            }
        }
    }

    /// Runs one raw `Modes` value through the edge trigger.
    pub async fn handle(&mut self, value: Option<i64>) {
        match self.trigger.observe(value) {
            EdgeDecision::Dispatch(signal) => self.dispatch(signal).await,
            EdgeDecision::Repeat => trace!(?value, "Mode unchanged"),
            EdgeDecision::Idle => trace!("Mode idle"),
            EdgeDecision::Unknown(raw) => warn!(value = raw, "Unknown mode value ignored"),
        }
    }

    async fn dispatch(&self, signal: ModeSignal) {
        let name = if signal.needs_product() {
            self.product_name().await
        } else {
            String::new()
        };
        let transition = match signal {
            ModeSignal::AddItem => Transition::Add(ProductRef::Title(name)),
            ModeSignal::RemoveItem => Transition::Remove(ProductRef::Title(name)),
            ModeSignal::ResetCart => Transition::Reset,
            ModeSignal::Checkout => Transition::Checkout,
        };

        debug!(mode = signal.value(), transition = ?transition, "Mode dispatched");
        if let Err(e) = self.coordinator.submit(transition).await {
            error!(error = %e, "Failed to enqueue mode transition");
        }
    }

    /// Current `Product_Name`, empty when missing or unreadable.
    async fn product_name(&self) -> String {
        match self.bus.read::<ProductNameTopic>().await {
            Ok(name) => name.unwrap_or_default(),
            Err(e) => {
                error!(error = %e, "Failed to read Product_Name");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{AllocatorPolicy, OrderAllocator};
    use crate::channel::{InMemoryChannel, SharedChannel};
    use crate::coordinator::BasketCoordinator;
    use crate::machine::{CartStateMachine, CheckoutPolicy};
    use crate::store::{InMemoryStore, Stores};
    use crate::topics::{ExpectedWeightTopic, StatusTopic};
    use aisle_core::{CustomerProfile, Product};
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Rig {
        channel: Arc<InMemoryChannel>,
        bus: TopicBus,
        coordinator: CoordinatorHandle,
    }

    fn rig() -> Rig {
        let store = Arc::new(InMemoryStore::with_products([Product {
            id: "p01".into(),
            title: "Apple".into(),
            price_cents: 120,
            discount_price_cents: None,
            weight_spec: "500g".into(),
            category: None,
        }]));
        let channel = Arc::new(InMemoryChannel::new());
        let bus = TopicBus::new(channel.clone(), "Shopping_Basket");
        let stores = Stores::in_memory(store);
        let machine = CartStateMachine::new(
            CustomerProfile::guest(),
            bus.clone(),
            stores.clone(),
            OrderAllocator::new(&stores, AllocatorPolicy::default()),
            CheckoutPolicy::default(),
        );
        let coordinator = BasketCoordinator::new(machine).start(16);
        Rig {
            channel,
            bus,
            coordinator,
        }
    }

    async fn weight(rig: &Rig) -> Value {
        rig.channel
            .read(&rig.bus.key::<ExpectedWeightTopic>())
            .await
            .unwrap()
            .unwrap_or(Value::Null)
    }

    #[tokio::test]
    async fn test_repeated_mode_adds_once() {
        let rig = rig();
        let mut listener = ModeChannelListener::new(rig.bus.clone(), rig.coordinator.clone());
        rig.bus
            .write::<ProductNameTopic>(&"Apple".to_string())
            .await
            .unwrap();

        listener.handle(Some(1)).await;
        listener.handle(Some(1)).await;
        listener.handle(Some(1)).await;

        let snapshot = rig.coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.cart.quantity_of("p01"), 1);
        assert_eq!(weight(&rig).await, "500.00");
    }

    #[tokio::test]
    async fn test_missing_product_name_publishes_error() {
        let rig = rig();
        let mut listener = ModeChannelListener::new(rig.bus.clone(), rig.coordinator.clone());

        listener.handle(Some(1)).await;

        let snapshot = rig.coordinator.snapshot().await.unwrap();
        assert!(snapshot.cart.is_empty());
        assert_eq!(rig.bus.read::<StatusTopic>().await.unwrap(), Some('E'));
    }

    #[tokio::test]
    async fn test_unknown_mode_publishes_nothing() {
        let rig = rig();
        let mut listener = ModeChannelListener::new(rig.bus.clone(), rig.coordinator.clone());

        listener.handle(Some(9)).await;

        rig.coordinator.snapshot().await.unwrap();
        assert_eq!(rig.bus.read::<StatusTopic>().await.unwrap(), None);
    }

    /// Drives the whole path through channel writes, the way the hardware does.
    #[tokio::test]
    async fn test_end_to_end_through_channel() {
        let rig = rig();
        let key = rig.bus.key::<ModeTopic>();
        rig.channel
            .write(&rig.bus.key::<ProductNameTopic>(), json!("Apple"))
            .await
            .unwrap();
        let listener = ModeChannelListener::new(rig.bus.clone(), rig.coordinator.clone())
            .start()
            .await
            .unwrap();

        let steps: [(Value, &str); 5] = [
            (json!(1), "500.00"),
            (json!(0), "500.00"),
            (json!("1"), "1000.00"),
            (json!(2), "500.00"),
            (json!(3), "0.00"),
        ];
        for (mode, expected) in steps {
            rig.channel.write(&key, mode).await.unwrap();
            // Wait until the listener has enqueued, then until the coordinator ran it.
            let mut settled = false;
            for _ in 0..100 {
                tokio::task::yield_now().await;
                rig.coordinator.snapshot().await.unwrap();
                if weight(&rig).await == expected {
                    settled = true;
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
            assert!(settled, "weight never reached {expected}");
        }

        listener.stop().await;
    }

    #[tokio::test]
    async fn test_leftover_mode_is_not_replayed() {
        let rig = rig();
        rig.channel
            .write(&rig.bus.key::<ProductNameTopic>(), json!("Apple"))
            .await
            .unwrap();
        rig.channel
            .write(&rig.bus.key::<ModeTopic>(), json!(1))
            .await
            .unwrap();

        let listener = ModeChannelListener::new(rig.bus.clone(), rig.coordinator.clone())
            .start()
            .await
            .unwrap();
        // Same value written again: still the baseline.
        rig.channel
            .write(&rig.bus.key::<ModeTopic>(), json!(1))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert!(rig.coordinator.snapshot().await.unwrap().cart.is_empty());
        listener.stop().await;
    }
}
