//! # Zibu Limbic
//!
//! The always-on half of Zibu. A single background task owns the
//! [`zibu_core::NeedsEngine`] and drives it:
//!
//! - **Heartbeat**: one decay step every `tick_interval_ms` while foregrounded
//! - **Care ticker**: +0.01 hunger/rest every second while feeding or sleeping
//! - **Shake polling**: reads an attached accelerometer while Play is armed
//! - **Lifecycle**: persists on suspend, reconciles offline decay on resume
//!
//! Callers talk to it through [`NeedsSimulation`] and watch [`PetMarker`]s.
//!
//! [`PetMarker`]: zibu_core::PetMarker

mod heartbeat;
mod lifecycle;
mod system;

pub use heartbeat::HeartbeatConfig;
pub use lifecycle::{AppState, LifecycleBridge, LifecycleTransition, ParseAppStateError};
pub use system::NeedsSimulation;
