//! # aisle-sync: Basket Engine for Aisle
//!
//! This crate keeps a smart basket's cart in step with its hardware. It
//! listens to the shared channel and the scanner, applies one transition at a
//! time, and writes the expected weight and status back for the firmware.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Basket Engine Architecture                       │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    BasketAgent (Main Orchestrator)               │  │
//! │  │                                                                  │  │
//! │  │  Resolves the shopper, restores the basket, spawns the tasks     │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ ModeChannel    │  │ Basket         │  │  ScanDecodePipeline    │    │
//! │  │ Listener       │  │ Coordinator    │  │                        │    │
//! │  │                │  │                │  │ 2 s debounce           │    │
//! │  │ Modes → edge   │─►│ mpsc, single   │◄─│ catalog or payload     │    │
//! │  │ trigger        │  │ writer         │  │                        │    │
//! │  └────────────────┘  └───────┬────────┘  └────────────────────────┘    │
//! │                              ▼                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    CartStateMachine                             │   │
//! │  │                                                                 │   │
//! │  │ Add / Remove / Reset / Checkout                                 │   │
//! │  │ Weight reconciliation (±2 g) before any order number is minted  │   │
//! │  │ OrderAllocator: CAS counters, exactly-once order writes         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  SHARED CHANNEL (Shopping_Basket/…):                                   │
//! │  • Modes          - 1 add, 2 remove, 3 reset, 4 checkout              │
//! │  • Product_Name   - product for add/remove                             │
//! │  • Product_Weight - expected grams, "500.00"                           │
//! │  • Weight         - scale reading                                      │
//! │  • Direction      - 'S'/'E' status, or F/B/L/R/S motion                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! ### Runtime
//! - [`agent`] - Main `BasketAgent` orchestrator
//! - [`coordinator`] - Single-writer actor around the state machine
//! - [`mode_listener`] - `Modes` edge detection
//! - [`scan_pipeline`] - Scanner debounce and product resolution
//!
//! ### Basket Logic
//! - [`machine`] - Cart transitions and checkout
//! - [`allocator`] - Customer ids and order numbers
//!
//! ### Boundaries
//! - [`channel`] - Shared key-value channel with change notifications
//! - [`topics`] - Typed keys on the channel
//! - [`feedback`] - `Direction` writer
//! - [`store`] - Catalog, cart, order, customer, counter and payment traits
//! - [`config`] - Engine configuration
//! - [`error`] - Engine error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aisle_sync::{AisleConfig, BasketAgent, InMemoryChannel, Stores};
//! use aisle_db::Database;
//!
//! let config = AisleConfig::load_or_default(None);
//! let stores = Stores::sqlite(database);
//!
//! let mut agent = BasketAgent::new(config, Arc::new(InMemoryChannel::new()), stores);
//! agent.start().await?;
//!
//! agent.submit_scan("p01|Apple|500g|1.20").await?;
//! let basket = agent.coordinator()?.snapshot().await?;
//! println!("Expected weight: {:.2} g", basket.expected_grams);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

// Runtime
pub mod agent;
pub mod coordinator;
pub mod mode_listener;
pub mod scan_pipeline;

// Basket logic
pub mod allocator;
pub mod machine;

// Boundaries
pub mod channel;
pub mod config;
pub mod error;
pub mod feedback;
pub mod store;
pub mod topics;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{resolve_customer, BasketAgent};
pub use allocator::{AllocatorPolicy, OrderAllocator};
pub use channel::{InMemoryChannel, SharedChannel};
pub use config::AisleConfig;
pub use coordinator::{BasketCoordinator, CoordinatorHandle};
pub use error::{ErrorKind, SyncError, SyncResult};
pub use feedback::FeedbackPublisher;
pub use machine::{BasketSnapshot, CartStateMachine, CheckoutPolicy, Transition, TransitionOutcome};
pub use mode_listener::{ListenerHandle, ModeChannelListener};
pub use scan_pipeline::{ScanDecodePipeline, ScanDisposition, ScanSender};
pub use store::{InMemoryStore, Stores};
pub use topics::{
    ExpectedWeightTopic, ModeTopic, ProductNameTopic, StatusTopic, Topic, TopicBus, WeightTopic,
};
