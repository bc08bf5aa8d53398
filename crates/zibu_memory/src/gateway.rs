//! Persistence gateway: fail-soft snapshot load/save over a byte-store
//!
//! Nothing in here ever surfaces an error to the simulation. A failed read
//! means "no snapshot" (the caller falls back to first-run defaults); a failed
//! write is logged and dropped, and the next mutation writes again.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use zibu_core::{ByteStore, Dynamics, NeedsSnapshot, NeedsState};

pub struct PersistenceGateway {
    store: Arc<dyn ByteStore>,
    key: String,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn ByteStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Latest snapshot, or `None` when absent, unreadable or corrupt.
    pub async fn load(&self) -> Option<NeedsSnapshot> {
        let bytes = match self.store.get(&self.key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read snapshot '{}': {}", self.key, e);
                return None;
            }
        };
        match NeedsSnapshot::from_bytes(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Discarding corrupt snapshot '{}': {:#}", self.key, e);
                None
            }
        }
    }

    /// Write `snapshot`. Returns whether it landed; callers may ignore it.
    pub async fn save(&self, snapshot: &NeedsSnapshot) -> bool {
        let bytes = match snapshot.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to encode snapshot: {:#}", e);
                return false;
            }
        };
        match self.store.set(&self.key, &bytes).await {
            Ok(()) => {
                tracing::debug!("Snapshot saved (lastUpdated={})", snapshot.last_updated);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to save snapshot '{}': {}", self.key, e);
                false
            }
        }
    }

    /// Stored needs brought forward to `now_ms`; never decays backward.
    pub fn reconcile_on_load(
        snapshot: &NeedsSnapshot,
        dynamics: &dyn Dynamics,
        now_ms: i64,
    ) -> NeedsState {
        snapshot.reconcile(dynamics, now_ms)
    }

    /// Cold-start state: the reconciled snapshot, or first-run defaults.
    pub async fn restore(
        &self,
        dynamics: &dyn Dynamics,
        now_ms: i64,
    ) -> (NeedsState, Option<NeedsSnapshot>) {
        match self.load().await {
            Some(snapshot) => {
                tracing::info!(
                    "Loaded snapshot from {} ms ago",
                    snapshot.elapsed_ms(now_ms).max(0)
                );
                (Self::reconcile_on_load(&snapshot, dynamics, now_ms), Some(snapshot))
            }
            None => {
                tracing::info!("No persisted state found, using first-run defaults");
                (NeedsState::default(), None)
            }
        }
    }
}

// ============================================================================
// Background writer
// ============================================================================

enum PersistRequest {
    Save(NeedsSnapshot),
    Load(oneshot::Sender<Option<NeedsSnapshot>>),
    Flush(oneshot::Sender<()>),
}

/// Handle to the persistence task. Saves are queued and return immediately;
/// requests are served strictly in order, so a `load` after a `save` sees it.
#[derive(Clone)]
pub struct PersistWriter {
    tx: mpsc::UnboundedSender<PersistRequest>,
}

impl PersistWriter {
    /// Spawn the writer task. It ends once every handle is dropped.
    pub fn spawn(gateway: PersistenceGateway) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(gateway, rx));
        (Self { tx }, handle)
    }

    /// Queue a save. Fire-and-forget.
    pub fn save(&self, snapshot: NeedsSnapshot) {
        if self.tx.send(PersistRequest::Save(snapshot)).is_err() {
            tracing::warn!("Persistence writer is gone, snapshot dropped");
        }
    }

    /// Read the latest snapshot after every queued save has been attempted.
    pub async fn load(&self) -> Option<NeedsSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(PersistRequest::Load(reply)).ok()?;
        rx.await.ok().flatten()
    }

    /// Wait until every queued save has been attempted.
    pub async fn flush(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(PersistRequest::Flush(reply)).is_ok() {
            let _ = rx.await;
        }
    }
}

async fn run_writer(gateway: PersistenceGateway, mut rx: mpsc::UnboundedReceiver<PersistRequest>) {
    let mut pending: Option<NeedsSnapshot> = None;

    while let Some(request) = rx.recv().await {
        let mut next = Some(request);
        while let Some(request) = next.take() {
            match request {
                PersistRequest::Save(snapshot) => {
                    // Coalesce: only the newest queued snapshot is written.
                    pending = Some(snapshot);
                    next = rx.try_recv().ok();
                }
                PersistRequest::Load(reply) => {
                    write_pending(&gateway, &mut pending).await;
                    let _ = reply.send(gateway.load().await);
                }
                PersistRequest::Flush(reply) => {
                    write_pending(&gateway, &mut pending).await;
                    let _ = reply.send(());
                }
            }
        }
        write_pending(&gateway, &mut pending).await;
    }

    write_pending(&gateway, &mut pending).await;
    tracing::debug!("Persistence writer stopped");
}

async fn write_pending(gateway: &PersistenceGateway, pending: &mut Option<NeedsSnapshot>) {
    if let Some(snapshot) = pending.take() {
        gateway.save(&snapshot).await;
    }
}
