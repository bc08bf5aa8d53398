//! Timer configuration for the simulation task
//!
//! The heartbeat drains the needs even when nobody is touching the pet;
//! the care and shake timers only run while an activity needs them.

use std::time::Duration;
use zibu_core::ZibuConfig;

/// Periods of the three tickers owned by the simulation task
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatConfig {
    /// Decay heartbeat (default: 5 minutes)
    pub interval: Duration,
    /// Feed/sleep increment while active (default: 1s)
    pub care_interval: Duration,
    /// Accelerometer polling while Play is armed (default: 100ms)
    pub shake_poll_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::from_config(&ZibuConfig::default())
    }
}

impl HeartbeatConfig {
    pub fn from_config(config: &ZibuConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.decay.tick_interval_ms.max(1)),
            care_interval: config.interaction.care_interval(),
            shake_poll_interval: config.interaction.shake_poll_interval(),
        }
    }
}
