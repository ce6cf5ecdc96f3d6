//! # Scan Decode Pipeline
//!
//! Turns decoded scanner text into `AddItem` commands on the coordinator
//! queue, the same queue the mode switch uses.
//!
//! ## Flow
//! ```text
//! "p01|Apple|500g|1.20"
//!        │
//!        ▼
//! ┌──────────────┐ duplicate within window ──► Duplicate (dropped, silent)
//! │ ScanDebouncer│
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐ blank id ──► Rejected(Validation) + 'E'
//! │ ScanPayload  │
//! └──────┬───────┘
//!        ▼
//! catalog.product_by_id(id)
//!        ├── hit ──────────────────────────► Forwarded(product)
//!        ├── miss, all four fields ────────► Forwarded(rebuilt from payload)
//!        └── miss, fewer fields ───────────► Rejected(NotFound) + 'E'
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use aisle_core::scan::{ScanDebouncer, ScanPayload};
use aisle_core::{CoreError, OperationStatus, Product, ProductRef};

use crate::coordinator::CoordinatorHandle;
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::feedback::FeedbackPublisher;
use crate::machine::Transition;
use crate::store::CatalogSource;

/// What happened to one scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanDisposition {
    /// Same payload as the last accepted scan, inside the window.
    Duplicate,
    /// Enqueued as `AddItem`.
    Forwarded(Product),
    /// Not enqueued; `E` was published.
    Rejected(ErrorKind),
}

pub struct ScanDecodePipeline {
    debouncer: ScanDebouncer,
    catalog: Arc<dyn CatalogSource>,
    coordinator: CoordinatorHandle,
    feedback: FeedbackPublisher,
}

/// Sender side of a running pipeline.
#[derive(Clone)]
pub struct ScanSender {
    tx: mpsc::Sender<String>,
}

impl ScanSender {
    /// Hands decoded text to the pipeline.
    pub async fn submit(&self, text: impl Into<String>) -> SyncResult<()> {
        self.tx
            .send(text.into())
            .await
            .map_err(|_| SyncError::ChannelError("Scan pipeline channel closed".into()))
    }
}

impl ScanDecodePipeline {
    pub fn new(
        debounce_window: Duration,
        catalog: Arc<dyn CatalogSource>,
        coordinator: CoordinatorHandle,
        feedback: FeedbackPublisher,
    ) -> Self {
        ScanDecodePipeline {
            debouncer: ScanDebouncer::new(debounce_window),
            catalog,
            coordinator,
            feedback,
        }
    }

    /// Spawns the pipeline loop. It stops when every [`ScanSender`] is dropped.
    pub fn start(self, queue_capacity: usize) -> (ScanSender, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let task = tokio::spawn(async move {
            self.run(rx).await;
        });
        (ScanSender { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<String>) {
        info!(window_ms = self.debouncer.window().as_millis() as u64, "Scan pipeline started");
        while let Some(text) = rx.recv().await {
            let now = tokio::time::Instant::now().into_std();
            self.process(&text, now).await;
        }
        info!("Scan pipeline stopped");
    }

    /// Handles one decoded payload seen at `now`.
    pub async fn process(&mut self, text: &str, now: Instant) -> ScanDisposition {
        if !self.debouncer.accept(text, now) {
            debug!(payload = %text, "Duplicate scan dropped");
            return ScanDisposition::Duplicate;
        }

        match self.resolve(text).await {
            Ok(product) => {
                debug!(product_id = %product.id, title = %product.title, "Scan resolved");
                let transition = Transition::Add(ProductRef::Resolved(product.clone()));
                match self.coordinator.submit(transition).await {
                    Ok(()) => ScanDisposition::Forwarded(product),
                    Err(e) => {
                        error!(error = %e, "Failed to enqueue scanned product");
                        ScanDisposition::Rejected(e.kind())
                    }
                }
            }
            Err(e) => {
                warn!(payload = %text, error = %e, "Scan rejected");
                if let Err(publish_err) = self.feedback.publish_status(OperationStatus::Error).await
                {
                    error!(error = %publish_err, "Failed to publish scan error");
                }
                ScanDisposition::Rejected(e.kind())
            }
        }
    }

    async fn resolve(&self, text: &str) -> SyncResult<Product> {
        let payload = ScanPayload::parse(text)?;

        if let Some(product) = self.catalog.product_by_id(&payload.id).await? {
            return Ok(product);
        }

        payload.to_product()?.ok_or_else(|| {
            CoreError::ProductNotFound(format!("{} (incomplete scan payload)", payload.id)).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{AllocatorPolicy, OrderAllocator};
    use crate::channel::InMemoryChannel;
    use crate::coordinator::BasketCoordinator;
    use crate::machine::{CartStateMachine, CheckoutPolicy};
    use crate::store::{InMemoryStore, Stores};
    use crate::topics::{StatusTopic, TopicBus};
    use aisle_core::CustomerProfile;

    struct Rig {
        pipeline: ScanDecodePipeline,
        coordinator: CoordinatorHandle,
        bus: TopicBus,
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
        let bus = TopicBus::new(Arc::new(InMemoryChannel::new()), "Shopping_Basket");
        let stores = Stores::in_memory(store);
        let machine = CartStateMachine::new(
            CustomerProfile::guest(),
            bus.clone(),
            stores.clone(),
            OrderAllocator::new(&stores, AllocatorPolicy::default()),
            CheckoutPolicy::default(),
        );
        let coordinator = BasketCoordinator::new(machine).start(16);
        let pipeline = ScanDecodePipeline::new(
            Duration::from_secs(2),
            stores.catalog.clone(),
            coordinator.clone(),
            FeedbackPublisher::new(bus.clone()),
        );
        Rig {
            pipeline,
            coordinator,
            bus,
        }
    }

    #[tokio::test]
    async fn test_catalog_hit_is_forwarded() {
        let mut rig = rig();
        let t0 = Instant::now();

        let disposition = rig.pipeline.process("p01|whatever|1g|9.99", t0).await;

        // Catalog data wins over the payload.
        match disposition {
            ScanDisposition::Forwarded(product) => {
                assert_eq!(product.title, "Apple");
                assert_eq!(product.weight_spec, "500g");
            }
            other => panic!("unexpected {other:?}"),
        }
        let snapshot = rig.coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.cart.quantity_of("p01"), 1);
    }

    #[tokio::test]
    async fn test_duplicate_inside_window_is_dropped() {
        let mut rig = rig();
        let t0 = Instant::now();

        assert!(matches!(
            rig.pipeline.process("p01|Apple|500g|1.20", t0).await,
            ScanDisposition::Forwarded(_)
        ));
        assert_eq!(
            rig.pipeline
                .process("p01|Apple|500g|1.20", t0 + Duration::from_millis(1500))
                .await,
            ScanDisposition::Duplicate
        );
        // The dropped duplicate didn't extend the window.
        assert!(matches!(
            rig.pipeline
                .process("p01|Apple|500g|1.20", t0 + Duration::from_millis(2100))
                .await,
            ScanDisposition::Forwarded(_)
        ));

        let snapshot = rig.coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.cart.quantity_of("p01"), 2);
    }

    #[tokio::test]
    async fn test_unknown_full_payload_is_rebuilt() {
        let mut rig = rig();

        let disposition = rig
            .pipeline
            .process("x42| Oat Bar |45g|not-a-price", Instant::now())
            .await;

        match disposition {
            ScanDisposition::Forwarded(product) => {
                assert_eq!(product.id, "x42");
                assert_eq!(product.title, "Oat Bar");
                assert_eq!(product.price_cents, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        let snapshot = rig.coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.expected_grams, 45.0);
    }

    #[tokio::test]
    async fn test_rejections_publish_error() {
        let mut rig = rig();
        let t0 = Instant::now();

        assert_eq!(
            rig.pipeline.process("x42|Oat Bar", t0).await,
            ScanDisposition::Rejected(ErrorKind::NotFound)
        );
        assert_eq!(rig.bus.read::<StatusTopic>().await.unwrap(), Some('E'));

        assert_eq!(
            rig.pipeline.process(" |Oat Bar|45g|1.00", t0).await,
            ScanDisposition::Rejected(ErrorKind::Validation)
        );
        assert!(rig.coordinator.snapshot().await.unwrap().cart.is_empty());
    }

    #[tokio::test]
    async fn test_absurd_label_price_rejected_and_basket_keeps_running() {
        let mut rig = rig();
        let t0 = Instant::now();

        for offset in [0, 3000] {
            assert_eq!(
                rig.pipeline
                    .process("x1|Gold Bar|1g|1e17", t0 + Duration::from_millis(offset))
                    .await,
                ScanDisposition::Rejected(ErrorKind::Validation)
            );
        }
        assert_eq!(rig.bus.read::<StatusTopic>().await.unwrap(), Some('E'));

        assert!(matches!(
            rig.pipeline.process("p01", t0).await,
            ScanDisposition::Forwarded(_)
        ));
        let snapshot = rig.coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.cart.quantity_of("p01"), 1);
        assert_eq!(snapshot.cart.quantity_of("x1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_pipeline_uses_runtime_clock() {
        let rig = rig();
        let (scanner, task) = rig.pipeline.start(8);

        scanner.submit("p01|Apple|500g|1.20").await.unwrap();
        scanner.submit("p01|Apple|500g|1.20").await.unwrap();
        // Paused clock only moves once the pipeline has drained both.
        tokio::time::sleep(Duration::from_millis(10)).await;
        tokio::time::advance(Duration::from_millis(2500)).await;
        scanner.submit("p01|Apple|500g|1.20").await.unwrap();

        drop(scanner);
        task.await.unwrap();
        let snapshot = rig.coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.cart.quantity_of("p01"), 2);
    }
}
