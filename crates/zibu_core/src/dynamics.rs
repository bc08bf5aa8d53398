//! Decay dynamics: how needs drain over time
//!
//! Decay is modeled as a continuous linear rate even though the foreground
//! heartbeat samples it discretely:
//!
//! ```text
//! decay_per_ms = decay_per_tick / tick_interval_ms
//! v'(c)        = clamp(v(c) - decay_per_ms * elapsed_ms)
//! ```
//!
//! Because the rate is per millisecond rather than "ticks missed × step",
//! catching up 45 offline minutes gives the same result as nine foreground
//! ticks, and elapsed times that are not a multiple of the tick interval
//! decay proportionally.

use crate::needs::NeedsState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trait for implementing need decay
pub trait Dynamics: Send + Sync {
    /// Drain `state` by `elapsed_ms` worth of decay. Non-positive elapsed time is a no-op.
    fn decay(&self, state: &mut NeedsState, elapsed_ms: i64);

    /// Interval at which the foreground heartbeat should fire.
    fn tick_interval(&self) -> Duration;

    /// Apply exactly one heartbeat's worth of decay.
    fn tick(&self, state: &mut NeedsState) {
        let ms = i64::try_from(self.tick_interval().as_millis()).unwrap_or(i64::MAX);
        self.decay(state, ms);
    }
}

/// Linear decay applied independently and identically to all four channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearDecay {
    /// Fraction of full scale lost per tick (default 0.01).
    pub decay_per_tick: f64,
    /// Foreground tick length in milliseconds (default 5 minutes).
    pub tick_interval_ms: u64,
}

impl Default for LinearDecay {
    fn default() -> Self {
        Self {
            decay_per_tick: 0.01,
            tick_interval_ms: 300_000,
        }
    }
}

impl LinearDecay {
    pub fn new(decay_per_tick: f64, tick_interval_ms: u64) -> Self {
        Self {
            decay_per_tick,
            tick_interval_ms,
        }
    }

    /// Continuous rate derived from the per-tick step.
    pub fn decay_per_ms(&self) -> f64 {
        decay_per_ms(self.decay_per_tick, self.tick_interval_ms)
    }
}

impl Dynamics for LinearDecay {
    fn decay(&self, state: &mut NeedsState, elapsed_ms: i64) {
        *state = state.apply_decay(self.decay_per_ms(), elapsed_ms);
    }

    fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// `decay_per_tick / tick_ms`; a zero-length tick yields no decay.
pub fn decay_per_ms(decay_per_tick: f64, tick_ms: u64) -> f64 {
    if tick_ms == 0 {
        return 0.0;
    }
    decay_per_tick / tick_ms as f64
}
