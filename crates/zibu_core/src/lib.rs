//! # Zibu Core
//!
//! Domain model of the Zibu virtual pet. Zibu has four needs (mood, hunger,
//! clean, rest) that drain over time and are topped up by interactions:
//!
//! - **Feed**: hold Zibu with the bottle armed
//! - **Clean**: swipe across Zibu with the sponge armed
//! - **Play**: shake the phone with the ball armed
//! - **Sleep**: arm the blanket
//!
//! Everything here is synchronous and deterministic. Timers, persistence and
//! app lifecycle live in `zibu_limbic` and `zibu_memory`.

pub mod activity;
pub mod clock;
pub mod config;
pub mod dynamics;
pub mod engine;
pub mod needs;
pub mod presence;
pub mod shake;
pub mod snapshot;
pub mod store;
pub mod upset;

pub use activity::{Activity, ActivityFlags, ParseToolError, Tool, ToolCategory};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DecayConfig, InteractionConfig, StorageConfig, UpsetConfig, ZibuConfig};
pub use dynamics::{decay_per_ms, Dynamics, LinearDecay};
pub use engine::{NeedsEngine, Outcome};
pub use needs::{clamp_need, NeedChannel, NeedsState};
pub use presence::{Animation, AnimationClip, NeedStatus, PetMarker, StatusBand};
pub use shake::{AccelSample, Accelerometer, ShakeDetector};
pub use snapshot::NeedsSnapshot;
pub use store::{ByteStore, MemoryStore, StoreError};
pub use upset::{UpsetLatch, UpsetTransition};
