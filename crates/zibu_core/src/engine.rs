//! Needs engine: the single owner of Zibu's state
//!
//! Every command mutates the in-memory state synchronously and then runs the
//! upset latch against the post-mutation values. The engine has no timers or
//! I/O of its own; the runtime calls [`NeedsEngine::decay_tick`] and
//! [`NeedsEngine::care_tick`] from its intervals and persists
//! [`NeedsEngine::snapshot`] afterwards.
//!
//! ## Activity transitions
//!
//! ```text
//! Idle ──select(tool)──> Feeding{pressing:false} | Cleaning | Playing | Sleeping
//! Feeding{false} ──press_start──> Feeding{true} ──press_end──> Feeding{false}
//! any ──select(other tool)──> armed_by(other)      (clears the previous one)
//! any ──open_picker(other category) | deselect──> Idle
//! ```

use crate::activity::{Activity, ActivityFlags, Tool, ToolCategory};
use crate::config::{InteractionConfig, ZibuConfig};
use crate::dynamics::Dynamics;
use crate::needs::{NeedChannel, NeedsState};
use crate::presence::PetMarker;
use crate::shake::{AccelSample, ShakeDetector};
use crate::snapshot::NeedsSnapshot;
use crate::upset::{UpsetLatch, UpsetTransition};

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    pub needs_changed: bool,
    pub activity_changed: bool,
    pub upset: Option<UpsetTransition>,
}

impl Outcome {
    pub fn changed(&self) -> bool {
        self.needs_changed || self.activity_changed || self.upset.is_some()
    }
}

pub struct NeedsEngine {
    needs: NeedsState,
    activity: Activity,
    upset: UpsetLatch,
    shake: ShakeDetector,
    dynamics: Box<dyn Dynamics>,
    tuning: InteractionConfig,
    /// Wall-clock ms the needs are decayed through. Advanced by every decay
    /// step and reconcile, never by interactions; never decreases.
    decayed_through: i64,
}

impl std::fmt::Debug for NeedsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeedsEngine")
            .field("needs", &self.needs)
            .field("activity", &self.activity)
            .field("upset", &self.upset)
            .field("decayed_through", &self.decayed_through)
            .finish()
    }
}

impl NeedsEngine {
    /// Engine with default tuning around the given needs.
    pub fn new(needs: NeedsState, last_updated: i64) -> Self {
        Self::with_config(&ZibuConfig::default(), needs, last_updated)
    }

    pub fn with_config(config: &ZibuConfig, needs: NeedsState, last_updated: i64) -> Self {
        Self::with_dynamics(
            config,
            Box::new(config.decay.dynamics()),
            needs,
            last_updated,
        )
    }

    pub fn with_dynamics(
        config: &ZibuConfig,
        dynamics: Box<dyn Dynamics>,
        needs: NeedsState,
        last_updated: i64,
    ) -> Self {
        let tuning = config.interaction.clone();
        let mut engine = Self {
            needs,
            activity: Activity::Idle,
            upset: UpsetLatch::new(config.upset.threshold),
            shake: ShakeDetector::new(tuning.shake_threshold, tuning.shake_refractory_ms),
            dynamics,
            tuning,
            decayed_through: last_updated,
        };
        engine.needs.normalize();
        // Initial state may already be critical (the first-run hunger is).
        engine.upset.observe(&engine.needs);
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn needs(&self) -> NeedsState {
        self.needs
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn flags(&self) -> ActivityFlags {
        ActivityFlags::new(self.activity, self.upset.is_upset())
    }

    pub fn is_upset(&self) -> bool {
        self.upset.is_upset()
    }

    pub fn selection(&self, category: ToolCategory) -> Option<Tool> {
        self.activity.selection(category)
    }

    /// Time the needs are current through; the stamp of every snapshot.
    pub fn last_updated(&self) -> i64 {
        self.decayed_through
    }

    pub fn marker(&self) -> PetMarker {
        PetMarker::from_engine(self)
    }

    /// Current needs stamped with the time they are decayed through, so a
    /// later reconcile charges exactly the decay not yet applied.
    pub fn snapshot(&self) -> NeedsSnapshot {
        NeedsSnapshot::new(self.needs, self.decayed_through)
    }

    // ── Tool selection ───────────────────────────────────────────────

    /// Arm `tool`, clearing every other category's selection in the same
    /// assignment. Any non-blanket tool also ends sleep.
    pub fn select_tool(&mut self, tool: Tool) -> Outcome {
        if self.activity.tool() == Some(tool) {
            return Outcome::default();
        }
        let next = Activity::armed_by(tool);
        tracing::debug!("Tool selected: {} ({:?} -> {:?})", tool, self.activity, next);
        self.transition(next)
    }

    /// Opening another category's picker disarms the current selection first.
    pub fn open_picker(&mut self, category: ToolCategory) -> Outcome {
        match self.activity.category() {
            Some(armed) if armed != category => self.transition(Activity::Idle),
            _ => Outcome::default(),
        }
    }

    /// Disarm everything; the explicit way out of sleep.
    pub fn deselect(&mut self) -> Outcome {
        self.transition(Activity::Idle)
    }

    fn transition(&mut self, next: Activity) -> Outcome {
        if next == self.activity {
            return Outcome::default();
        }
        if self.activity == Activity::Playing {
            self.shake.reset();
        }
        self.activity = next;
        self.settle(false, true)
    }

    // ── Gestures and sensors ─────────────────────────────────────────

    /// Start holding Zibu. Only meaningful with the bottle armed.
    pub fn press_start(&mut self) -> Outcome {
        match self.activity {
            Activity::Feeding { pressing: false } => {
                self.activity = Activity::Feeding { pressing: true };
                self.settle(false, true)
            }
            _ => Outcome::default(),
        }
    }

    pub fn press_end(&mut self) -> Outcome {
        match self.activity {
            Activity::Feeding { pressing: true } => {
                self.activity = Activity::Feeding { pressing: false };
                self.settle(false, true)
            }
            _ => Outcome::default(),
        }
    }

    /// A finished horizontal drag. One wash stroke per qualifying release,
    /// regardless of distance travelled.
    pub fn drag_release(&mut self, dx: f32) -> Outcome {
        if self.activity != Activity::Cleaning {
            return Outcome::default();
        }
        if !dx.is_finite() || dx.abs() <= self.tuning.swipe_threshold {
            return Outcome::default();
        }
        self.bump(NeedChannel::Clean, self.tuning.clean_amount)
    }

    /// Feed one accelerometer sample. `now_ms` must be monotonic.
    pub fn shake(&mut self, sample: AccelSample, now_ms: i64) -> Outcome {
        if self.activity != Activity::Playing {
            return Outcome::default();
        }
        if !self.shake.accept(sample, now_ms) {
            return Outcome::default();
        }
        tracing::debug!("Shake accepted (|a|={:.2})", sample.magnitude());
        self.bump(NeedChannel::Mood, self.tuning.shake_amount)
    }

    // ── Timed steps ──────────────────────────────────────────────────

    /// One period of the care ticker: hunger while feeding, rest while sleeping.
    pub fn care_tick(&mut self) -> Outcome {
        match self.activity {
            Activity::Feeding { pressing: true } => {
                self.bump(NeedChannel::Hunger, self.tuning.feed_amount)
            }
            Activity::Sleeping => self.bump(NeedChannel::Rest, self.tuning.rest_amount),
            _ => Outcome::default(),
        }
    }

    /// One heartbeat of decay, applied to every channel regardless of activity.
    pub fn decay_tick(&mut self) -> Outcome {
        let before = self.needs;
        self.dynamics.tick(&mut self.needs);
        let step = self.dynamics.tick_interval().as_millis() as i64;
        self.decayed_through = self.decayed_through.saturating_add(step);
        self.settle(before != self.needs, false)
    }

    /// Replace the live needs with a stored snapshot brought forward to `now_ms`.
    pub fn reconcile(&mut self, snapshot: &NeedsSnapshot, now_ms: i64) -> Outcome {
        let before = self.needs;
        self.needs = snapshot.reconcile(self.dynamics.as_ref(), now_ms);
        self.decayed_through = self
            .decayed_through
            .max(snapshot.last_updated)
            .max(now_ms);
        self.settle(before != self.needs, false)
    }

    fn bump(&mut self, channel: NeedChannel, amount: f32) -> Outcome {
        let before = self.needs;
        self.needs = self.needs.increment(channel, amount);
        self.settle(before != self.needs, false)
    }

    /// Runs strictly after a mutation so the latch sees the new values.
    fn settle(&mut self, needs_changed: bool, activity_changed: bool) -> Outcome {
        let upset = self.upset.observe(&self.needs);
        match upset {
            Some(UpsetTransition::Raised) => {
                let (channel, value) = self.needs.lowest();
                tracing::info!("Zibu is upset: {} at {:.2}", channel, value);
            }
            Some(UpsetTransition::Cleared) => tracing::info!("Zibu calmed down"),
            None => {}
        }
        Outcome {
            needs_changed,
            activity_changed,
            upset,
        }
    }
}

impl Default for NeedsEngine {
    fn default() -> Self {
        Self::new(NeedsState::default(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::LinearDecay;

    fn engine_at(v: f32) -> NeedsEngine {
        NeedsEngine::new(NeedsState::uniform(v), 0)
    }

    #[test]
    fn test_first_run_is_upset() {
        // Default hunger (0.04) is already below the critical line.
        let engine = NeedsEngine::default();
        assert!(engine.is_upset());
        assert!(engine.flags().is_upset);
    }

    #[test]
    fn test_select_clears_other_categories() {
        let mut engine = engine_at(0.5);
        engine.select_tool(Tool::Blanket);
        assert!(engine.flags().is_sleeping);

        let out = engine.select_tool(Tool::Bottle);
        assert!(out.activity_changed);
        assert!(!engine.flags().is_sleeping);
        assert_eq!(engine.selection(ToolCategory::Feed), Some(Tool::Bottle));
        assert_eq!(engine.selection(ToolCategory::Sleep), None);
        assert_eq!(engine.selection(ToolCategory::Clean), None);
        assert_eq!(engine.selection(ToolCategory::Play), None);
    }

    #[test]
    fn test_reselecting_same_tool_keeps_press() {
        let mut engine = engine_at(0.5);
        engine.select_tool(Tool::Bottle);
        engine.press_start();
        assert!(!engine.select_tool(Tool::Bottle).changed());
        assert!(engine.flags().is_feeding);
    }

    #[test]
    fn test_open_picker_disarms_other_category() {
        let mut engine = engine_at(0.5);
        engine.select_tool(Tool::Blanket);
        // Same category's picker keeps the selection.
        assert!(!engine.open_picker(ToolCategory::Sleep).changed());
        assert!(engine.flags().is_sleeping);

        assert!(engine.open_picker(ToolCategory::Feed).activity_changed);
        assert_eq!(engine.activity(), Activity::Idle);
    }

    #[test]
    fn test_scenario_b_feeding_three_seconds() {
        let mut engine = engine_at(0.5);
        engine.select_tool(Tool::Bottle);
        engine.press_start();
        assert!(engine.flags().is_feeding);
        for _ in 0..3 {
            engine.care_tick();
        }
        engine.press_end();
        assert!(!engine.flags().is_feeding);
        assert!((engine.needs().hunger - 0.53).abs() < 1e-5);
        // Ticks after release do nothing.
        assert!(!engine.care_tick().changed());
    }

    #[test]
    fn test_feeding_caps_at_one() {
        let mut engine = engine_at(0.99);
        engine.select_tool(Tool::Bottle);
        engine.press_start();
        for _ in 0..5 {
            engine.care_tick();
        }
        assert_eq!(engine.needs().hunger, 1.0);
    }

    #[test]
    fn test_press_without_bottle_is_ignored() {
        let mut engine = engine_at(0.5);
        assert!(!engine.press_start().changed());
        engine.select_tool(Tool::Sponge);
        assert!(!engine.press_start().changed());
        assert!(!engine.flags().is_feeding);
    }

    #[test]
    fn test_scenario_c_sleep_then_feed() {
        let mut engine = engine_at(0.5);
        engine.select_tool(Tool::Blanket);
        for _ in 0..10 {
            engine.care_tick();
        }
        assert!((engine.needs().rest - 0.6).abs() < 1e-5);

        engine.select_tool(Tool::Bottle);
        assert!(!engine.flags().is_sleeping);
        assert!(!engine.care_tick().changed());
        assert!((engine.needs().rest - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_swipe_threshold() {
        let mut engine = engine_at(0.5);
        engine.select_tool(Tool::Sponge);
        assert!(!engine.drag_release(20.0).changed());
        assert!(engine.drag_release(21.0).needs_changed);
        assert!(engine.drag_release(-35.0).needs_changed);
        assert!((engine.needs().clean - 0.52).abs() < 1e-5);
    }

    #[test]
    fn test_swipe_without_sponge_is_ignored() {
        let mut engine = engine_at(0.5);
        engine.select_tool(Tool::Ball);
        assert!(!engine.drag_release(100.0).changed());
        assert!((engine.needs().clean - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_shake_refractory() {
        let mut engine = engine_at(0.5);
        engine.select_tool(Tool::Ball);
        let hard = AccelSample::new(2.5, 0.0, 1.0);
        assert!(engine.shake(hard, 0).needs_changed);
        assert!(!engine.shake(hard, 300).changed());
        assert!(engine.shake(hard, 600).needs_changed);
        assert!((engine.needs().mood - 0.52).abs() < 1e-5);
    }

    #[test]
    fn test_shake_only_while_playing() {
        let mut engine = engine_at(0.5);
        assert!(!engine.shake(AccelSample::new(5.0, 0.0, 0.0), 0).changed());
        engine.select_tool(Tool::Blanket);
        assert!(!engine.shake(AccelSample::new(5.0, 0.0, 0.0), 0).changed());
    }

    #[test]
    fn test_decay_tick_hits_every_channel() {
        let mut engine = engine_at(0.5);
        engine.select_tool(Tool::Blanket);
        engine.decay_tick();
        let n = engine.needs();
        for (_, v) in n.iter() {
            assert!((v - 0.49).abs() < 1e-5);
        }
    }

    #[test]
    fn test_decay_raises_upset_once() {
        let mut engine = engine_at(0.115);
        assert!(!engine.is_upset());
        assert_eq!(engine.decay_tick().upset, None); // 0.105
        assert_eq!(engine.decay_tick().upset, Some(UpsetTransition::Raised)); // 0.095
        assert_eq!(engine.decay_tick().upset, None);
        assert!(engine.is_upset());
    }

    #[test]
    fn test_care_clears_upset() {
        let mut engine = NeedsEngine::new(
            NeedsState {
                mood: 0.5,
                hunger: 0.095,
                clean: 0.5,
                rest: 0.5,
            },
            0,
        );
        assert!(engine.is_upset());
        engine.select_tool(Tool::Bottle);
        engine.press_start();
        let out = engine.care_tick();
        assert_eq!(out.upset, Some(UpsetTransition::Cleared));
        assert!(!engine.is_upset());
    }

    #[test]
    fn test_snapshot_stamp_follows_decay_only() {
        let mut engine = NeedsEngine::new(NeedsState::uniform(0.5), 1_000);
        engine.select_tool(Tool::Sponge);
        engine.drag_release(40.0);
        assert_eq!(engine.snapshot().last_updated, 1_000);

        engine.decay_tick();
        assert_eq!(engine.snapshot().last_updated, 301_000);
    }

    #[test]
    fn test_reconcile_stamp_never_decreases() {
        let mut engine = engine_at(0.5);
        let ahead = NeedsSnapshot::new(NeedsState::uniform(0.7), 5_000);
        // Clock behind the stored stamp: no decay, stamp kept.
        engine.reconcile(&ahead, 2_000);
        assert_eq!(engine.needs(), NeedsState::uniform(0.7));
        assert_eq!(engine.last_updated(), 5_000);

        engine.reconcile(&NeedsSnapshot::new(NeedsState::uniform(0.7), 1_000), 3_000);
        assert_eq!(engine.last_updated(), 5_000);
    }

    #[test]
    fn test_partial_interval_charged_on_reconcile() {
        // One heartbeat, then 150 s more: same as 450 s of continuous decay.
        let mut engine = engine_at(0.5);
        engine.decay_tick();
        let snap = engine.snapshot();
        engine.reconcile(&snap, 450_000);

        let dense = NeedsState::uniform(0.5)
            .apply_decay(LinearDecay::default().decay_per_ms(), 450_000);
        for (channel, value) in engine.needs().iter() {
            assert!((value - dense.get(channel)).abs() < 1e-5);
            assert!((value - 0.485).abs() < 1e-5);
        }
        assert_eq!(engine.last_updated(), 450_000);
    }

    #[test]
    fn test_reconcile_applies_offline_decay() {
        let mut engine = engine_at(0.9);
        let snap = NeedsSnapshot::new(NeedsState::default(), 0);
        let out = engine.reconcile(&snap, 2_700_000);
        assert!(out.needs_changed);
        assert!((engine.needs().mood - 0.41).abs() < 1e-5);
        assert_eq!(engine.needs().hunger, 0.0);
        assert!(engine.is_upset());
    }

    #[test]
    fn test_leaving_play_resets_refractory() {
        let mut engine = engine_at(0.5);
        let hard = AccelSample::new(3.0, 0.0, 0.0);
        engine.select_tool(Tool::Ball);
        assert!(engine.shake(hard, 0).needs_changed);
        engine.deselect();
        engine.select_tool(Tool::Ball);
        assert!(engine.shake(hard, 100).needs_changed);
    }
}
