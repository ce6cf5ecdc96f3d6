//! # Basket Coordinator
//!
//! Single-writer actor around the [`CartStateMachine`]. Both intake
//! pipelines (mode switch, scanner) and the console enqueue commands here;
//! the actor drains them strictly in arrival order, one at a time.
//!
//! ## Architecture
//! ```text
//! ┌──────────────────┐
//! │ ModeChannel      │──┐
//! │ Listener         │  │   mpsc (bounded)    ┌──────────────────────────┐
//! └──────────────────┘  ├───────────────────► │   BasketCoordinator      │
//! ┌──────────────────┐  │   Apply / Snapshot  │                          │
//! │ ScanDecode       │──┤   Resync / Shutdown │   CartStateMachine       │
//! │ Pipeline         │  │                     │   (owned, never shared)  │
//! └──────────────────┘  │                     └──────────────────────────┘
//! ┌──────────────────┐  │
//! │ Console / tests  │──┘   replies via oneshot when the caller waits
//! └──────────────────┘
//! ```

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::machine::{BasketSnapshot, CartStateMachine, Transition, TransitionOutcome};

/// Default depth of the command queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Commands processed by the coordinator loop.
enum CoordinatorCommand {
    /// Run a transition. `reply` is `None` for fire-and-forget intake.
    Apply {
        transition: Transition,
        reply: Option<oneshot::Sender<SyncResult<TransitionOutcome>>>,
    },
    Snapshot {
        reply: oneshot::Sender<BasketSnapshot>,
    },
    Resync {
        reply: oneshot::Sender<SyncResult<()>>,
    },
    /// Stop after everything queued before it has run.
    Shutdown { reply: oneshot::Sender<()> },
}

/// Handle for sending commands to the coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    cmd_tx: mpsc::Sender<CoordinatorCommand>,
}

fn closed() -> SyncError {
    SyncError::ChannelError("Coordinator channel closed".into())
}

impl CoordinatorHandle {
    /// Enqueues a transition without waiting for it to run.
    ///
    /// The outcome still reaches the hardware through `Direction`.
    pub async fn submit(&self, transition: Transition) -> SyncResult<()> {
        self.cmd_tx
            .send(CoordinatorCommand::Apply {
                transition,
                reply: None,
            })
            .await
            .map_err(|_| closed())
    }

    /// Enqueues a transition and waits for its outcome.
    pub async fn apply(&self, transition: Transition) -> SyncResult<TransitionOutcome> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(CoordinatorCommand::Apply {
                transition,
                reply: Some(reply),
            })
            .await
            .map_err(|_| closed())?;
        rx.await.map_err(|_| SyncError::ShuttingDown)?
    }

    /// Current basket, after everything queued so far has run.
    pub async fn snapshot(&self) -> SyncResult<BasketSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(CoordinatorCommand::Snapshot { reply })
            .await
            .map_err(|_| closed())?;
        rx.await.map_err(|_| SyncError::ShuttingDown)
    }

    pub async fn resync(&self) -> SyncResult<()> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(CoordinatorCommand::Resync { reply })
            .await
            .map_err(|_| closed())?;
        rx.await.map_err(|_| SyncError::ShuttingDown)?
    }

    /// Drains the queue and stops the coordinator.
    pub async fn shutdown(&self) -> SyncResult<()> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(CoordinatorCommand::Shutdown { reply })
            .await
            .map_err(|_| closed())?;
        rx.await.map_err(|_| SyncError::ShuttingDown)
    }
}

pub struct BasketCoordinator {
    machine: CartStateMachine,
}

impl BasketCoordinator {
    pub fn new(machine: CartStateMachine) -> Self {
        BasketCoordinator { machine }
    }

    /// Starts the coordinator and returns a handle.
    pub fn start(self, queue_capacity: usize) -> CoordinatorHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(queue_capacity.max(1));

        tokio::spawn(async move {
            self.run(cmd_rx).await;
        });

        CoordinatorHandle { cmd_tx }
    }

    /// Main coordinator loop.
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<CoordinatorCommand>) {
        info!(uid = %self.machine.customer().uid, "Basket coordinator started");

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                CoordinatorCommand::Apply { transition, reply } => {
                    debug!(transition = transition.name(), "Applying transition");
                    let result = self.machine.apply(transition).await;
                    if let Some(reply) = reply {
                        // Caller may have given up waiting.
                        let _ = reply.send(result);
                    }
                }
                CoordinatorCommand::Snapshot { reply } => {
                    let _ = reply.send(self.machine.snapshot());
                }
                CoordinatorCommand::Resync { reply } => {
                    let result = self.machine.resync().await;
                    if let Err(e) = &result {
                        warn!(error = %e, "Resync failed");
                    }
                    let _ = reply.send(result);
                }
                CoordinatorCommand::Shutdown { reply } => {
                    info!("Basket coordinator shutting down");
                    let _ = reply.send(());
                    break;
                }
            }
        }

        info!("Basket coordinator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{AllocatorPolicy, OrderAllocator};
    use crate::channel::InMemoryChannel;
    use crate::machine::CheckoutPolicy;
    use crate::store::{InMemoryStore, Stores};
    use crate::topics::TopicBus;
    use aisle_core::{CustomerProfile, Product, ProductRef};
    use std::sync::Arc;

    fn start() -> CoordinatorHandle {
        let store = Arc::new(InMemoryStore::with_products([Product {
            id: "p01".into(),
            title: "Apple".into(),
            price_cents: 120,
            discount_price_cents: None,
            weight_spec: "500g".into(),
            category: None,
        }]));
        let stores = Stores::in_memory(store);
        let machine = CartStateMachine::new(
            CustomerProfile::guest(),
            TopicBus::new(Arc::new(InMemoryChannel::new()), "Shopping_Basket"),
            stores.clone(),
            OrderAllocator::new(&stores, AllocatorPolicy::default()),
            CheckoutPolicy::default(),
        );
        BasketCoordinator::new(machine).start(DEFAULT_QUEUE_CAPACITY)
    }

    #[tokio::test]
    async fn test_commands_run_in_order() {
        let handle = start();
        let apple = || Transition::Add(ProductRef::Title("Apple".into()));

        for _ in 0..5 {
            handle.submit(apple()).await.unwrap();
        }
        handle
            .submit(Transition::Remove(ProductRef::Id("p01".into())))
            .await
            .unwrap();

        // Snapshot is queued behind the submits, so it sees all of them.
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.cart.quantity_of("p01"), 4);
        assert_eq!(snapshot.expected_grams, 2000.0);
    }

    #[tokio::test]
    async fn test_apply_returns_rejection() {
        let handle = start();
        let err = handle
            .apply(Transition::Remove(ProductRef::Title("Apple".into())))
            .await
            .unwrap_err();
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_shutdown_closes_handle() {
        let handle = start();
        handle.submit(Transition::Reset).await.unwrap();
        handle.shutdown().await.unwrap();

        // Give the loop a chance to drop its receiver.
        tokio::task::yield_now().await;
        let err = handle.snapshot().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::ChannelError(_) | SyncError::ShuttingDown
        ));
    }
}
