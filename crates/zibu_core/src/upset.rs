//! Critical-need watcher
//!
//! Edge-triggered latch with a single threshold: it raises when any channel
//! first drops below the threshold and clears only once every channel is back
//! at or above it. Staying low does not re-raise.

use crate::needs::NeedsState;
use serde::{Deserialize, Serialize};

/// Edge reported by [`UpsetLatch::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsetTransition {
    /// A channel fell below the threshold; fires the one-shot upset animation.
    Raised,
    /// Every channel recovered.
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpsetLatch {
    threshold: f32,
    latched: bool,
}

impl Default for UpsetLatch {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl UpsetLatch {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            latched: false,
        }
    }

    pub fn is_upset(&self) -> bool {
        self.latched
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Inspect post-mutation state. Returns the edge if one was crossed.
    pub fn observe(&mut self, needs: &NeedsState) -> Option<UpsetTransition> {
        let critical = needs.any_below(self.threshold);
        match (critical, self.latched) {
            (true, false) => {
                self.latched = true;
                Some(UpsetTransition::Raised)
            }
            (false, true) => {
                self.latched = false;
                Some(UpsetTransition::Cleared)
            }
            _ => None,
        }
    }
}
