//! Need channels and the bounded needs vector
//!
//! Zibu tracks four wellbeing channels. Each is a scalar in `[0.0, 1.0]`
//! where 1.0 is fully satisfied. All mutation goes through [`clamp_need`],
//! so a `NeedsState` can never hold an out-of-range or non-finite value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four tracked needs. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeedChannel {
    Mood,
    Hunger,
    Clean,
    Rest,
}

impl NeedChannel {
    pub const ALL: [NeedChannel; 4] = [
        NeedChannel::Mood,
        NeedChannel::Hunger,
        NeedChannel::Clean,
        NeedChannel::Rest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NeedChannel::Mood => "mood",
            NeedChannel::Hunger => "hunger",
            NeedChannel::Clean => "clean",
            NeedChannel::Rest => "rest",
        }
    }
}

impl fmt::Display for NeedChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `max(0, min(1, x))`. NaN collapses to 0.
#[inline]
pub fn clamp_need(x: f32) -> f32 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}

/// Guard against NaN and Infinity coming in from outside (e.g. a stored blob).
#[inline]
fn sanitize(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("Non-finite need value detected, resetting to {}", fallback);
        fallback
    }
}

/// Total mapping from every [`NeedChannel`] to a value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedsState {
    pub mood: f32,
    pub hunger: f32,
    pub clean: f32,
    pub rest: f32,
}

impl Default for NeedsState {
    /// First-run vector: starts partially needy so decay and interaction are
    /// visible straight away.
    fn default() -> Self {
        Self {
            mood: 0.5,
            hunger: 0.04,
            clean: 0.5,
            rest: 0.1,
        }
    }
}

impl NeedsState {
    /// Every channel at the same value (clamped).
    pub fn uniform(value: f32) -> Self {
        let v = clamp_need(value);
        Self {
            mood: v,
            hunger: v,
            clean: v,
            rest: v,
        }
    }

    pub fn get(&self, channel: NeedChannel) -> f32 {
        match channel {
            NeedChannel::Mood => self.mood,
            NeedChannel::Hunger => self.hunger,
            NeedChannel::Clean => self.clean,
            NeedChannel::Rest => self.rest,
        }
    }

    /// Set a channel, clamping into range.
    pub fn set(&mut self, channel: NeedChannel, value: f32) {
        let v = clamp_need(value);
        match channel {
            NeedChannel::Mood => self.mood = v,
            NeedChannel::Hunger => self.hunger = v,
            NeedChannel::Clean => self.clean = v,
            NeedChannel::Rest => self.rest = v,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NeedChannel, f32)> + '_ {
        NeedChannel::ALL.iter().map(move |&c| (c, self.get(c)))
    }

    /// Add `amount` to one channel; the others are untouched.
    pub fn increment(&self, channel: NeedChannel, amount: f32) -> Self {
        let mut next = *self;
        next.set(channel, self.get(channel) + amount);
        next
    }

    /// Subtract `decay_per_ms * elapsed_ms` from every channel.
    /// Zero or negative elapsed time leaves the state as it is.
    pub fn apply_decay(&self, decay_per_ms: f64, elapsed_ms: i64) -> Self {
        if elapsed_ms <= 0 || decay_per_ms <= 0.0 {
            return *self;
        }
        let amount = decay_per_ms * elapsed_ms as f64;
        let mut next = *self;
        for channel in NeedChannel::ALL {
            let v = f64::from(self.get(channel)) - amount;
            next.set(channel, v as f32);
        }
        next
    }

    /// Lowest channel and its value.
    pub fn lowest(&self) -> (NeedChannel, f32) {
        self.iter()
            .fold((NeedChannel::Mood, f32::INFINITY), |acc, (c, v)| {
                if v < acc.1 {
                    (c, v)
                } else {
                    acc
                }
            })
    }

    /// True if any channel sits strictly below `threshold`.
    pub fn any_below(&self, threshold: f32) -> bool {
        self.iter().any(|(_, v)| v < threshold)
    }

    /// Sanitize and clamp every channel; used after deserializing foreign data.
    pub fn normalize(&mut self) {
        let defaults = NeedsState::default();
        for channel in NeedChannel::ALL {
            let v = sanitize(self.get(channel), defaults.get(channel));
            self.set(channel, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_need() {
        assert_eq!(clamp_need(-0.5), 0.0);
        assert_eq!(clamp_need(1.5), 1.0);
        assert_eq!(clamp_need(0.3), 0.3);
        assert_eq!(clamp_need(f32::NAN), 0.0);
    }

    #[test]
    fn test_default_is_partially_depleted() {
        let s = NeedsState::default();
        assert!((s.mood - 0.5).abs() < 1e-6);
        assert!((s.hunger - 0.04).abs() < 1e-6);
        assert!((s.clean - 0.5).abs() < 1e-6);
        assert!((s.rest - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_increment_touches_one_channel() {
        let s = NeedsState::uniform(0.5).increment(NeedChannel::Hunger, 0.2);
        assert!((s.hunger - 0.7).abs() < 1e-6);
        assert!((s.mood - 0.5).abs() < 1e-6);
        assert!((s.clean - 0.5).abs() < 1e-6);
        assert!((s.rest - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_increment_caps_at_one() {
        let s = NeedsState::uniform(0.995).increment(NeedChannel::Rest, 0.01);
        assert_eq!(s.rest, 1.0);
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let s = NeedsState::default().apply_decay(0.01 / 300_000.0, 2_700_000);
        assert!((s.mood - 0.41).abs() < 1e-5);
        assert_eq!(s.hunger, 0.0);
        assert!((s.clean - 0.41).abs() < 1e-5);
        assert!((s.rest - 0.01).abs() < 1e-5);
    }

    #[test]
    fn test_decay_ignores_non_positive_elapsed() {
        let s = NeedsState::default();
        assert_eq!(s.apply_decay(0.001, 0), s);
        assert_eq!(s.apply_decay(0.001, -5_000), s);
    }

    #[test]
    fn test_lowest_and_any_below() {
        let s = NeedsState::default();
        assert_eq!(s.lowest().0, NeedChannel::Hunger);
        assert!(s.any_below(0.1));
        assert!(!NeedsState::uniform(0.1).any_below(0.1));
    }

    #[test]
    fn test_normalize_replaces_non_finite() {
        let mut s = NeedsState {
            mood: f32::NAN,
            hunger: 3.0,
            clean: f32::INFINITY,
            rest: -1.0,
        };
        s.normalize();
        assert!((s.mood - 0.5).abs() < 1e-6);
        assert_eq!(s.hunger, 1.0);
        assert!((s.clean - 0.5).abs() < 1e-6);
        assert_eq!(s.rest, 0.0);
    }
}
