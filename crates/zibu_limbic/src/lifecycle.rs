//! App lifecycle classification
//!
//! The host reports every foreground/background change; only the edges into
//! and out of `Active` matter to the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Active,
    Inactive,
    Background,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Active => "active",
            AppState::Inactive => "inactive",
            AppState::Background => "background",
        }
    }

    pub fn is_foreground(&self) -> bool {
        matches!(self, AppState::Active)
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown app state '{0}' (expected active, inactive or background)")]
pub struct ParseAppStateError(pub String);

impl FromStr for AppState {
    type Err = ParseAppStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "foreground" => Ok(AppState::Active),
            "inactive" => Ok(AppState::Inactive),
            "background" => Ok(AppState::Background),
            other => Err(ParseAppStateError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTransition {
    /// Leaving the foreground: persist and stop every ticker.
    Suspend,
    /// Back in the foreground: reconcile offline decay and restart.
    Resume,
}

/// Remembers the last reported state and turns reports into edges.
#[derive(Debug, Clone)]
pub struct LifecycleBridge {
    current: AppState,
}

impl Default for LifecycleBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleBridge {
    /// The simulation starts in the foreground.
    pub fn new() -> Self {
        Self {
            current: AppState::Active,
        }
    }

    pub fn current(&self) -> AppState {
        self.current
    }

    pub fn is_foreground(&self) -> bool {
        self.current.is_foreground()
    }

    /// Record `next` and classify the change. `Inactive -> Background` and
    /// repeated reports are no-ops.
    pub fn transition(&mut self, next: AppState) -> Option<LifecycleTransition> {
        let was_active = self.current.is_foreground();
        self.current = next;
        match (was_active, next.is_foreground()) {
            (true, false) => Some(LifecycleTransition::Suspend),
            (false, true) => Some(LifecycleTransition::Resume),
            _ => None,
        }
    }
}
