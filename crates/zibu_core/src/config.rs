use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::dynamics::LinearDecay;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ZibuConfig {
    pub decay: DecayConfig,
    pub interaction: InteractionConfig,
    pub upset: UpsetConfig,
    pub storage: StorageConfig,
}

impl ZibuConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: ZibuConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ZIBU_DB_PATH") {
            self.storage.db_path = v;
        }
        if let Ok(v) = std::env::var("ZIBU_STATE_KEY") {
            self.storage.key = v;
        }
        if let Ok(v) = std::env::var("ZIBU_TICK_INTERVAL_MS") {
            if let Ok(n) = v.parse() {
                self.decay.tick_interval_ms = n;
            }
        }
        if let Ok(v) = std::env::var("ZIBU_DECAY_PER_TICK") {
            if let Ok(n) = v.parse() {
                self.decay.decay_per_tick = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Fraction of full scale lost per heartbeat tick.
    pub decay_per_tick: f64,
    /// Foreground heartbeat interval. Default: 300000 (5 minutes).
    pub tick_interval_ms: u64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            decay_per_tick: 0.01,
            tick_interval_ms: 300_000,
        }
    }
}

impl DecayConfig {
    pub fn dynamics(&self) -> LinearDecay {
        LinearDecay::new(self.decay_per_tick, self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Period of the feed/sleep increment while active.
    pub care_interval_ms: u64,
    pub feed_amount: f32,
    pub rest_amount: f32,
    pub clean_amount: f32,
    /// Minimum net horizontal drag for a wash stroke.
    pub swipe_threshold: f32,
    /// Acceleration magnitude (g) a sample must exceed to count as a shake.
    pub shake_threshold: f32,
    pub shake_amount: f32,
    pub shake_refractory_ms: i64,
    pub shake_poll_interval_ms: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            care_interval_ms: 1_000,
            feed_amount: 0.01,
            rest_amount: 0.01,
            clean_amount: 0.01,
            swipe_threshold: 20.0,
            shake_threshold: 2.0,
            shake_amount: 0.01,
            shake_refractory_ms: 500,
            shake_poll_interval_ms: 100,
        }
    }
}

impl InteractionConfig {
    pub fn care_interval(&self) -> Duration {
        Duration::from_millis(self.care_interval_ms.max(1))
    }

    pub fn shake_poll_interval(&self) -> Duration {
        Duration::from_millis(self.shake_poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpsetConfig {
    pub threshold: f32,
}

impl Default for UpsetConfig {
    fn default() -> Self {
        Self { threshold: 0.1 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Key the snapshot is stored under.
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "zibu.db".to_string(),
            key: "zibu_state".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
