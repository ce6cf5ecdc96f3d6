//! # Basket Agent
//!
//! Main orchestrator for one basket session. Resolves the shopper, restores
//! their basket and starts the intake tasks around a single coordinator.
//!
//! ## Agent Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        BasketAgent Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         BasketAgent                              │  │
//! │  │                                                                  │  │
//! │  │  • Resolves the session customer (stored, guest, or registered)  │  │
//! │  │  • Restores the saved basket and republishes Product_Weight      │  │
//! │  │  • Spawns the coordinator and both intake pipelines              │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ ModeChannel    │  │ Basket         │  │  ScanDecodePipeline    │    │
//! │  │ Listener       │─►│ Coordinator    │◄─│                        │    │
//! │  │                │  │                │  │ Debounce, catalog hit  │    │
//! │  │ Modes edges    │  │ CartState      │  │ or payload fallback    │    │
//! │  │                │  │ Machine        │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  SHARED CHANNEL (<root>/…):                                            │
//! │  Modes, Product_Name ──► in    Product_Weight, Direction ──► out       │
//! │  Weight ──► read at checkout                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use aisle_core::{CustomerProfile, MotionCommand};

use crate::allocator::{AllocatorPolicy, OrderAllocator};
use crate::channel::SharedChannel;
use crate::config::{AisleConfig, SessionSettings};
use crate::coordinator::{BasketCoordinator, CoordinatorHandle};
use crate::error::{SyncError, SyncResult};
use crate::feedback::FeedbackPublisher;
use crate::machine::{CartStateMachine, CheckoutPolicy};
use crate::mode_listener::{ListenerHandle, ModeChannelListener};
use crate::scan_pipeline::{ScanDecodePipeline, ScanSender};
use crate::store::Stores;
use crate::topics::TopicBus;

// =============================================================================
// Basket Agent
// =============================================================================

/// Main agent that runs one basket session.
pub struct BasketAgent {
    /// Engine configuration.
    config: Arc<AisleConfig>,

    /// Typed view over the shared channel.
    bus: TopicBus,

    /// Persistence and payment collaborators.
    stores: Stores,

    /// Customer resolved at start.
    customer: Option<CustomerProfile>,

    /// Coordinator handle (set after start).
    coordinator: Option<CoordinatorHandle>,

    /// Mode listener (set after start).
    listener: Option<ListenerHandle>,

    /// Scanner intake (set after start).
    scanner: Option<ScanSender>,
    scan_task: Option<JoinHandle<()>>,
}

fn not_running() -> SyncError {
    SyncError::Internal("basket agent is not running".into())
}

impl BasketAgent {
    /// Creates an agent. Nothing runs until [`start`](Self::start).
    pub fn new(config: AisleConfig, channel: Arc<dyn SharedChannel>, stores: Stores) -> Self {
        let bus = TopicBus::new(channel, config.channel.root.clone());
        BasketAgent {
            config: Arc::new(config),
            bus,
            stores,
            customer: None,
            coordinator: None,
            listener: None,
            scanner: None,
            scan_task: None,
        }
    }

    /// Starts the session for the configured customer.
    ///
    /// Validates the configuration, resolves the customer, restores their
    /// basket, then spawns the coordinator, the mode listener and the scan
    /// pipeline. Starting an already running agent is a no-op.
    pub async fn start(&mut self) -> SyncResult<()> {
        if self.coordinator.is_some() {
            debug!("Basket agent already running");
            return Ok(());
        }

        self.config.validate()?;

        let allocator = OrderAllocator::new(
            &self.stores,
            AllocatorPolicy::from(&self.config.allocator),
        );
        let customer = resolve_customer(&self.config.session, &self.stores, &allocator).await?;

        info!(
            uid = %customer.uid,
            customer_id = ?customer.customer_id,
            root = %self.bus.root(),
            "Starting basket agent"
        );

        let mut machine = CartStateMachine::new(
            customer.clone(),
            self.bus.clone(),
            self.stores.clone(),
            allocator,
            CheckoutPolicy::from(&self.config.checkout),
        );
        machine.restore().await?;

        let coordinator =
            BasketCoordinator::new(machine).start(self.config.coordinator.queue_capacity);

        let listener = match ModeChannelListener::new(self.bus.clone(), coordinator.clone())
            .start()
            .await
        {
            Ok(listener) => listener,
            Err(e) => {
                let _ = coordinator.shutdown().await;
                return Err(e);
            }
        };

        let (scanner, scan_task) = ScanDecodePipeline::new(
            self.config.scan.debounce_window(),
            self.stores.catalog.clone(),
            coordinator.clone(),
            self.feedback(),
        )
        .start(self.config.scan.queue_capacity);

        self.customer = Some(customer);
        self.coordinator = Some(coordinator);
        self.listener = Some(listener);
        self.scanner = Some(scanner);
        self.scan_task = Some(scan_task);

        info!("Basket agent started");
        Ok(())
    }

    /// Stops intake first, then drains the coordinator.
    pub async fn shutdown(&mut self) -> SyncResult<()> {
        info!("Shutting down basket agent");

        if let Some(listener) = self.listener.take() {
            listener.stop().await;
        }

        // Dropping the last sender ends the scan loop once it has drained.
        self.scanner.take();
        if let Some(task) = self.scan_task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Scan pipeline task ended abnormally");
            }
        }

        if let Some(coordinator) = self.coordinator.take() {
            coordinator.shutdown().await?;
        }

        info!("Basket agent stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.coordinator.is_some()
    }

    pub fn config(&self) -> &AisleConfig {
        &self.config
    }

    pub fn bus(&self) -> &TopicBus {
        &self.bus
    }

    /// The session customer as resolved at start.
    ///
    /// Guests receive their customer id at checkout; use
    /// [`CoordinatorHandle::snapshot`] for the current profile.
    pub fn customer(&self) -> Option<&CustomerProfile> {
        self.customer.as_ref()
    }

    pub fn coordinator(&self) -> SyncResult<&CoordinatorHandle> {
        self.coordinator.as_ref().ok_or_else(not_running)
    }

    /// Feeds decoded scanner text into the scan pipeline.
    pub async fn submit_scan(&self, text: impl Into<String>) -> SyncResult<()> {
        self.scanner.as_ref().ok_or_else(not_running)?.submit(text).await
    }

    /// Sends a locomotion command on `Direction`.
    pub async fn drive(&self, command: MotionCommand) -> SyncResult<()> {
        debug!(command = %command.as_char(), "Drive command");
        self.feedback().publish_motion(command).await
    }

    pub fn feedback(&self) -> FeedbackPublisher {
        FeedbackPublisher::new(self.bus.clone())
    }
}

// =============================================================================
// Session Customer
// =============================================================================

/// Finds or creates the customer the session belongs to.
///
/// ## Resolution
/// - configured uid found in the store: that profile
/// - a name or email configured: registered now, with a customer id
/// - otherwise: stored as a guest without an id (numbered at first checkout)
pub async fn resolve_customer(
    settings: &SessionSettings,
    stores: &Stores,
    allocator: &OrderAllocator,
) -> SyncResult<CustomerProfile> {
    if let Some(uid) = settings.customer_uid.as_deref() {
        if let Some(profile) = stores.customers.customer(uid).await? {
            debug!(uid = %uid, "Session customer found");
            return Ok(profile);
        }
        info!(uid = %uid, "Configured customer not found, creating it");
    }

    let mut profile = CustomerProfile::guest();
    if let Some(uid) = &settings.customer_uid {
        profile.uid = uid.clone();
    }

    if settings.full_name.is_some() || settings.email.is_some() {
        if let Some(name) = &settings.full_name {
            profile.full_name = name.clone();
        }
        if let Some(email) = &settings.email {
            profile.email = email.clone();
        }
        return allocator.register_customer(profile).await;
    }

    stores.customers.insert_customer(&profile).await?;
    info!(uid = %profile.uid, "Guest session started");
    Ok(profile)
}
