//! # Engine Configuration
//!
//! Configuration management for the basket engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     AISLE_CHANNEL_ROOT=Shopping_Basket                                 │
//! │     AISLE_WEIGHT_TOLERANCE_GRAMS=2.0                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/aisle/aisle.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.aisle.aisle/aisle.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     2 g tolerance, 5% tax, 2 s scan debounce                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # aisle.toml
//! [channel]
//! root = "Shopping_Basket"
//!
//! [checkout]
//! weight_tolerance_grams = 2.0
//! tax_rate_bps = 500
//!
//! [scan]
//! debounce_window_ms = 2000
//!
//! [allocator]
//! max_attempts = 25
//!
//! [session]
//! customer_uid = "c0ffee00-0000-4000-8000-000000000001"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use aisle_core::{
    TaxRate, DEFAULT_SCAN_DEBOUNCE_MS, DEFAULT_TAX_RATE_BPS, DEFAULT_WEIGHT_TOLERANCE_GRAMS,
};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Channel Settings
// =============================================================================

/// Where the hardware signals live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSettings {
    /// Prefix for every key (`<root>/Modes`, `<root>/Weight`…).
    /// Empty puts the keys at the top level.
    #[serde(default = "default_channel_root")]
    pub root: String,

    /// Buffered updates per subscriber before it reports lag.
    #[serde(default = "default_subscription_capacity")]
    pub subscription_capacity: usize,
}

fn default_channel_root() -> String {
    "Shopping_Basket".to_string()
}

fn default_subscription_capacity() -> usize {
    crate::channel::DEFAULT_SUBSCRIPTION_CAPACITY
}

impl Default for ChannelSettings {
    fn default() -> Self {
        ChannelSettings {
            root: default_channel_root(),
            subscription_capacity: default_subscription_capacity(),
        }
    }
}

// =============================================================================
// Checkout Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Largest scale/basket difference a checkout accepts, in grams.
    #[serde(default = "default_weight_tolerance")]
    pub weight_tolerance_grams: f64,

    /// Tax rate in basis points (500 = 5%).
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,
}

fn default_weight_tolerance() -> f64 {
    DEFAULT_WEIGHT_TOLERANCE_GRAMS
}

fn default_tax_rate_bps() -> u32 {
    DEFAULT_TAX_RATE_BPS
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            weight_tolerance_grams: default_weight_tolerance(),
            tax_rate_bps: default_tax_rate_bps(),
        }
    }
}

impl CheckoutSettings {
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

// =============================================================================
// Scan Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Identical payloads inside this window are treated as one scan.
    #[serde(default = "default_debounce_window")]
    pub debounce_window_ms: u64,

    /// Decoded payloads waiting for the pipeline.
    #[serde(default = "default_scan_queue")]
    pub queue_capacity: usize,
}

fn default_debounce_window() -> u64 {
    DEFAULT_SCAN_DEBOUNCE_MS
}

fn default_scan_queue() -> usize {
    32
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            debounce_window_ms: default_debounce_window(),
            queue_capacity: default_scan_queue(),
        }
    }
}

impl ScanSettings {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }
}

// =============================================================================
// Allocator Settings
// =============================================================================

/// Retry policy for counter compare-and-swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatorSettings {
    /// Attempts before giving up with a concurrency conflict.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling (milliseconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    25
}
fn default_initial_backoff() -> u64 {
    5
}
fn default_max_backoff() -> u64 {
    200
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        AllocatorSettings {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

// =============================================================================
// Coordinator Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorSettings {
    /// Pending transitions before intake pipelines wait.
    #[serde(default = "default_command_queue")]
    pub queue_capacity: usize,
}

fn default_command_queue() -> usize {
    64
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        CoordinatorSettings {
            queue_capacity: default_command_queue(),
        }
    }
}

// =============================================================================
// Database / Session Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `aisle.db` in the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// The shopper this node serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Existing customer uid. A guest is registered when unset or unknown.
    #[serde(default)]
    pub customer_uid: Option<String>,

    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AisleConfig {
    #[serde(default)]
    pub channel: ChannelSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub scan: ScanSettings,

    #[serde(default)]
    pub allocator: AllocatorSettings,

    #[serde(default)]
    pub coordinator: CoordinatorSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub session: SessionSettings,
}

impl AisleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (aisle.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let tolerance = self.checkout.weight_tolerance_grams;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(SyncError::InvalidConfig(format!(
                "weight_tolerance_grams must be a non-negative number, got {}",
                tolerance
            )));
        }

        if self.checkout.tax_rate_bps > 10_000 {
            return Err(SyncError::InvalidConfig(format!(
                "tax_rate_bps must be at most 10000, got {}",
                self.checkout.tax_rate_bps
            )));
        }

        if self.allocator.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "max_attempts must be greater than 0".into(),
            ));
        }

        if self.channel.subscription_capacity == 0
            || self.scan.queue_capacity == 0
            || self.coordinator.queue_capacity == 0
        {
            return Err(SyncError::InvalidConfig(
                "queue capacities must be greater than 0".into(),
            ));
        }

        if self.channel.root.chars().any(char::is_whitespace) {
            return Err(SyncError::InvalidConfig(format!(
                "channel root may not contain whitespace: '{}'",
                self.channel.root
            )));
        }

        Ok(())
    }

    /// Applies overrides from `lookup` (the process environment in
    /// [`load`](Self::load)). Unparsable numbers are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup("AISLE_CHANNEL_ROOT") {
            debug!(root = %root, "Overriding channel root from environment");
            self.channel.root = root;
        }

        if let Some(raw) = lookup("AISLE_WEIGHT_TOLERANCE_GRAMS") {
            match raw.parse::<f64>() {
                Ok(grams) => self.checkout.weight_tolerance_grams = grams,
                Err(_) => warn!(value = %raw, "Ignoring invalid AISLE_WEIGHT_TOLERANCE_GRAMS"),
            }
        }

        if let Some(raw) = lookup("AISLE_TAX_RATE_BPS") {
            match raw.parse::<u32>() {
                Ok(bps) => self.checkout.tax_rate_bps = bps,
                Err(_) => warn!(value = %raw, "Ignoring invalid AISLE_TAX_RATE_BPS"),
            }
        }

        if let Some(raw) = lookup("AISLE_SCAN_DEBOUNCE_MS") {
            match raw.parse::<u64>() {
                Ok(ms) => self.scan.debounce_window_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid AISLE_SCAN_DEBOUNCE_MS"),
            }
        }

        if let Some(path) = lookup("AISLE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(uid) = lookup("AISLE_CUSTOMER_UID") {
            self.session.customer_uid = Some(uid);
        }

        if let Some(raw) = lookup("AISLE_COUNTER_MAX_ATTEMPTS") {
            match raw.parse::<u32>() {
                Ok(attempts) => self.allocator.max_attempts = attempts,
                Err(_) => warn!(value = %raw, "Ignoring invalid AISLE_COUNTER_MAX_ATTEMPTS"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "aisle", "aisle")
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("aisle.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Configured database file, falling back to the platform data dir.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database
            .path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("aisle.db")))
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.checkout.tax_rate()
    }
}
