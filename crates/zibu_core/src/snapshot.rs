//! Persisted snapshot and offline reconciliation

use crate::dynamics::Dynamics;
use crate::needs::NeedsState;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// `{ needs, lastUpdated }` as written to the byte-store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedsSnapshot {
    pub needs: NeedsState,
    /// Epoch milliseconds of the write.
    #[serde(rename = "lastUpdated")]
    pub last_updated: i64,
}

impl NeedsSnapshot {
    pub fn new(needs: NeedsState, last_updated: i64) -> Self {
        Self {
            needs,
            last_updated,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("Failed to serialize needs snapshot")
    }

    /// Decode and sanitize a stored blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut snapshot: NeedsSnapshot =
            serde_json::from_slice(bytes).context("Failed to deserialize needs snapshot")?;
        snapshot.needs.normalize();
        Ok(snapshot)
    }

    /// Milliseconds between the write and `now_ms` (negative under clock skew).
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.last_updated)
    }

    /// Bring the stored needs forward to `now_ms`. Decay is only ever applied
    /// for strictly positive elapsed time, never backward.
    pub fn reconcile(&self, dynamics: &dyn Dynamics, now_ms: i64) -> NeedsState {
        let elapsed = self.elapsed_ms(now_ms);
        let mut needs = self.needs;
        if elapsed > 0 {
            dynamics.decay(&mut needs, elapsed);
            tracing::debug!("Reconciled {} ms of offline decay", elapsed);
        } else if elapsed < 0 {
            tracing::debug!("Snapshot is {} ms in the future, skipping decay", -elapsed);
        }
        needs
    }
}
