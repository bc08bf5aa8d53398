//! The needs simulation task
//!
//! `NeedsSimulation` is a cheap handle over a command channel. A single
//! background task owns the `NeedsEngine`, its tickers and the persistence
//! writer, so every mutation is applied strictly in order without a lock:
//!
//! - Decay heartbeat while foregrounded
//! - Care ticker while feeding (pressed) or sleeping
//! - Accelerometer polling while Play is armed and a sensor is attached
//! - Commands from the host (tools, gestures, lifecycle, queries)
//!
//! Timers are polled before commands, so a command queued at the same
//! instant as a due tick observes that tick.

use crate::heartbeat::HeartbeatConfig;
use crate::lifecycle::{AppState, LifecycleBridge, LifecycleTransition};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval};
use zibu_core::{
    AccelSample, Accelerometer, Activity, ByteStore, Clock, NeedsEngine, NeedsSnapshot, Outcome,
    PetMarker, Tool, ToolCategory, ZibuConfig,
};
use zibu_memory::{PersistWriter, PersistenceGateway};

enum Command {
    SelectTool(Tool),
    OpenPicker(ToolCategory),
    Deselect,
    PressStart,
    PressEnd,
    DragRelease(f32),
    Shake(AccelSample),
    AttachAccelerometer(Box<dyn Accelerometer>),
    Lifecycle(AppState),
    Tick,
    GetState(oneshot::Sender<PetMarker>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running simulation. Clones share the same task; the task ends
/// on `shutdown()` or once every handle is dropped.
#[derive(Clone)]
pub struct NeedsSimulation {
    command_tx: mpsc::Sender<Command>,
    marker_rx: watch::Receiver<PetMarker>,
}

impl NeedsSimulation {
    /// Restore the pet from `store` (reconciling offline decay against
    /// `clock`), write the result back and spawn the simulation task.
    pub async fn start(
        config: &ZibuConfig,
        store: Arc<dyn ByteStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let gateway = PersistenceGateway::new(store, config.storage.key.clone());
        let now = clock.now_ms();
        let (needs, stored) = gateway.restore(&config.decay.dynamics(), now).await;
        // Restored needs are decayed through now (or through a stamp that is
        // ahead of a clock that went back).
        let stamp = stored.map_or(now, |s| s.last_updated.max(now));
        let engine = NeedsEngine::with_config(config, needs, stamp);

        let (writer, writer_task) = PersistWriter::spawn(gateway);
        writer.save(engine.snapshot());

        let (command_tx, command_rx) = mpsc::channel(64);
        let (marker_tx, marker_rx) = watch::channel(engine.marker());
        tracing::info!("Zibu is awake: {}", marker_rx.borrow().describe());

        let task = SimulationTask {
            engine,
            writer,
            writer_task,
            clock,
            heartbeat: HeartbeatConfig::from_config(config),
            lifecycle: LifecycleBridge::new(),
            marker_tx,
            accelerometer: None,
            epoch: Instant::now(),
            decay_timer: None,
            care_timer: None,
            care_for: None,
            shake_timer: None,
        };
        tokio::spawn(task.run(command_rx));

        Self {
            command_tx,
            marker_rx,
        }
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| anyhow!("simulation stopped"))
    }

    pub async fn select_tool(&self, tool: Tool) -> Result<()> {
        self.send(Command::SelectTool(tool)).await
    }

    /// Opening a category's picker disarms any other category's tool.
    pub async fn open_picker(&self, category: ToolCategory) -> Result<()> {
        self.send(Command::OpenPicker(category)).await
    }

    pub async fn deselect(&self) -> Result<()> {
        self.send(Command::Deselect).await
    }

    pub async fn press_start(&self) -> Result<()> {
        self.send(Command::PressStart).await
    }

    pub async fn press_end(&self) -> Result<()> {
        self.send(Command::PressEnd).await
    }

    /// A completed horizontal drag with net displacement `dx`.
    pub async fn drag_release(&self, dx: f32) -> Result<()> {
        self.send(Command::DragRelease(dx)).await
    }

    /// Push one accelerometer sample.
    pub async fn shake(&self, sample: AccelSample) -> Result<()> {
        self.send(Command::Shake(sample)).await
    }

    /// Poll `sensor` whenever Play is armed. Replaces any previous sensor.
    pub async fn attach_accelerometer(&self, sensor: Box<dyn Accelerometer>) -> Result<()> {
        self.send(Command::AttachAccelerometer(sensor)).await
    }

    pub async fn set_app_state(&self, state: AppState) -> Result<()> {
        self.send(Command::Lifecycle(state)).await
    }

    /// Apply one heartbeat of decay right away.
    pub async fn tick(&self) -> Result<()> {
        self.send(Command::Tick).await
    }

    /// Current marker, after every previously sent command has been applied.
    pub async fn state(&self) -> Result<PetMarker> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::GetState(reply)).await?;
        rx.await.map_err(|_| anyhow!("simulation stopped"))
    }

    /// Last published marker, without waiting for queued commands.
    pub fn marker(&self) -> PetMarker {
        self.marker_rx.borrow().clone()
    }

    /// Subscribe to marker updates
    pub fn subscribe(&self) -> watch::Receiver<PetMarker> {
        self.marker_rx.clone()
    }

    /// Stop the task, drop every ticker and wait for pending writes.
    pub async fn shutdown(&self) -> Result<()> {
        let (ack, rx) = oneshot::channel();
        self.send(Command::Shutdown(ack)).await?;
        rx.await.map_err(|_| anyhow!("simulation stopped"))
    }
}

// ============================================================================
// Simulation task
// ============================================================================

struct SimulationTask {
    engine: NeedsEngine,
    writer: PersistWriter,
    writer_task: JoinHandle<()>,
    clock: Arc<dyn Clock>,
    heartbeat: HeartbeatConfig,
    lifecycle: LifecycleBridge,
    marker_tx: watch::Sender<PetMarker>,
    accelerometer: Option<Box<dyn Accelerometer>>,
    /// Origin of the monotonic milliseconds fed to the shake detector.
    epoch: Instant,
    decay_timer: Option<Interval>,
    care_timer: Option<Interval>,
    /// Activity the running care ticker was started for.
    care_for: Option<Activity>,
    shake_timer: Option<Interval>,
}

impl SimulationTask {
    async fn run(mut self, mut command_rx: mpsc::Receiver<Command>) {
        self.decay_timer = Some(periodic(self.heartbeat.interval));
        self.sync_timers();

        let ack = loop {
            tokio::select! {
                biased;

                _ = tick(&mut self.decay_timer) => {
                    let outcome = self.engine.decay_tick();
                    tracing::debug!("Heartbeat decay: {:?}", self.engine.needs());
                    self.commit(outcome);
                }

                _ = tick(&mut self.care_timer) => {
                    let outcome = self.engine.care_tick();
                    self.commit(outcome);
                }

                _ = tick(&mut self.shake_timer) => self.poll_accelerometer(),

                command = command_rx.recv() => match command {
                    Some(Command::Shutdown(ack)) => break Some(ack),
                    Some(command) => self.handle(command).await,
                    None => break None,
                },
            }
        };

        // Close the channel first so nothing is accepted after the ack.
        drop(command_rx);
        self.stop().await;
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    async fn handle(&mut self, command: Command) {
        let outcome = match command {
            Command::Lifecycle(state) => return self.on_lifecycle(state).await,
            Command::GetState(reply) => {
                let _ = reply.send(self.engine.marker());
                return;
            }
            Command::AttachAccelerometer(sensor) => {
                self.accelerometer = Some(sensor);
                self.sync_timers();
                return;
            }
            // Handled by the run loop.
            Command::Shutdown(_) => return,
            _ if !self.lifecycle.is_foreground() => {
                tracing::debug!("Ignoring interaction while suspended");
                return;
            }
            Command::SelectTool(tool) => self.engine.select_tool(tool),
            Command::OpenPicker(category) => self.engine.open_picker(category),
            Command::Deselect => self.engine.deselect(),
            Command::PressStart => self.engine.press_start(),
            Command::PressEnd => self.engine.press_end(),
            Command::DragRelease(dx) => self.engine.drag_release(dx),
            Command::Shake(sample) => {
                let now = self.monotonic_ms();
                self.engine.shake(sample, now)
            }
            Command::Tick => self.engine.decay_tick(),
        };
        self.commit(outcome);
    }

    /// Persist and broadcast whatever `outcome` changed.
    fn commit(&mut self, outcome: Outcome) {
        if outcome.needs_changed {
            self.writer.save(self.engine.snapshot());
        }
        if outcome.changed() {
            self.publish();
        }
        if outcome.activity_changed {
            self.sync_timers();
        }
    }

    fn publish(&self) {
        let _ = self.marker_tx.send(self.engine.marker());
    }

    fn poll_accelerometer(&mut self) {
        let Some(sample) = self.accelerometer.as_mut().and_then(|a| a.read()) else {
            return;
        };
        let now = self.monotonic_ms();
        let outcome = self.engine.shake(sample, now);
        self.commit(outcome);
    }

    fn monotonic_ms(&self) -> i64 {
        self.epoch.elapsed().as_millis() as i64
    }

    /// Start or drop the care and shake tickers to match the current
    /// activity and foreground state.
    fn sync_timers(&mut self) {
        let foreground = self.lifecycle.is_foreground();
        let activity = self.engine.activity();

        if !(foreground && activity.needs_care_ticker()) {
            if self.care_timer.take().is_some() {
                tracing::debug!("Care ticker stopped");
            }
            self.care_for = None;
        } else if self.care_for != Some(activity) {
            tracing::debug!("Care ticker started for {:?}", activity);
            self.care_timer = Some(periodic(self.heartbeat.care_interval));
            self.care_for = Some(activity);
        }

        let polling =
            foreground && activity == Activity::Playing && self.accelerometer.is_some();
        if !polling {
            self.shake_timer = None;
        } else if self.shake_timer.is_none() {
            self.shake_timer = Some(periodic(self.heartbeat.shake_poll_interval));
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    async fn on_lifecycle(&mut self, state: AppState) {
        match self.lifecycle.transition(state) {
            Some(LifecycleTransition::Suspend) => self.suspend().await,
            Some(LifecycleTransition::Resume) => self.resume().await,
            None => tracing::debug!("App state {} (no change)", state),
        }
    }

    async fn suspend(&mut self) {
        self.decay_timer = None;
        // Nobody can keep holding the pet from the background.
        let released = self.engine.press_end();
        self.commit(released);
        self.sync_timers();

        let snapshot = self.engine.snapshot();
        self.writer.save(snapshot);
        self.writer.flush().await;
        tracing::info!("Suspended, snapshot stamped {}", snapshot.last_updated);
    }

    async fn resume(&mut self) {
        let now = self.clock.now_ms();
        let base = resume_base(self.writer.load().await, self.engine.snapshot());
        self.engine.reconcile(&base, now);
        tracing::info!(
            "Resumed, charged {} ms of decay",
            base.elapsed_ms(now).max(0)
        );
        self.writer.save(self.engine.snapshot());

        self.decay_timer = Some(periodic(self.heartbeat.interval));
        self.sync_timers();
        self.publish();
    }

    async fn stop(self) {
        let SimulationTask {
            engine,
            writer,
            writer_task,
            lifecycle,
            ..
        } = self;

        // A suspended pet already has its snapshot on disk.
        if lifecycle.is_foreground() {
            writer.save(engine.snapshot());
        }
        drop(writer);
        if let Err(e) = writer_task.await {
            tracing::warn!("Persistence writer failed: {}", e);
        }
        tracing::info!("Simulation stopped");
    }
}

/// Snapshot to resume from. The stored one wins only when it is strictly
/// newer than the live state, so a failed suspend write never rolls back
/// progress made in this process.
fn resume_base(stored: Option<NeedsSnapshot>, live: NeedsSnapshot) -> NeedsSnapshot {
    match stored {
        Some(stored) if stored.last_updated > live.last_updated => stored,
        Some(stored) if stored == live => live,
        Some(_) => {
            tracing::warn!("Stored snapshot is stale, resuming from in-memory state");
            live
        }
        None => {
            tracing::warn!("No snapshot to resume from, reconciling in-memory state");
            live
        }
    }
}

/// Interval whose first tick lands one full period from now.
fn periodic(period: Duration) -> Interval {
    tokio::time::interval_at(Instant::now() + period, period)
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zibu_core::NeedsState;

    #[test]
    fn test_resume_prefers_newer_stored_snapshot() {
        let live = NeedsSnapshot::new(NeedsState::uniform(0.5), 1_000);
        let newer = NeedsSnapshot::new(NeedsState::uniform(0.3), 2_000);
        assert_eq!(resume_base(Some(newer), live), newer);
    }

    #[test]
    fn test_resume_keeps_live_over_stale_or_missing() {
        let live = NeedsSnapshot::new(NeedsState::uniform(0.55), 1_000);
        let older = NeedsSnapshot::new(NeedsState::uniform(0.5), 500);
        let same_stamp = NeedsSnapshot::new(NeedsState::uniform(0.5), 1_000);
        assert_eq!(resume_base(Some(older), live), live);
        assert_eq!(resume_base(Some(same_stamp), live), live);
        assert_eq!(resume_base(None, live), live);
    }
}
