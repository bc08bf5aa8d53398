//! Tools and the single active activity
//!
//! Only one tool category can be armed at a time. Instead of one selection
//! slot per category plus separate `is_sleeping`/`is_feeding` booleans, the
//! whole thing is one tagged union: the armed tool is derived from the
//! variant, so two armed categories cannot be represented at all.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Interaction categories, one picker each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Feed,
    Clean,
    Play,
    Sleep,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 4] = [
        ToolCategory::Feed,
        ToolCategory::Clean,
        ToolCategory::Play,
        ToolCategory::Sleep,
    ];

    /// Tools offered by this category's picker.
    pub fn tools(&self) -> &'static [Tool] {
        match self {
            ToolCategory::Feed => &[Tool::Bottle],
            ToolCategory::Clean => &[Tool::Sponge],
            ToolCategory::Play => &[Tool::Ball],
            ToolCategory::Sleep => &[Tool::Blanket],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Feed => "feed",
            ToolCategory::Clean => "clean",
            ToolCategory::Play => "play",
            ToolCategory::Sleep => "sleep",
        }
    }
}

/// Selectable items. Each belongs to exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Bottle,
    Sponge,
    Ball,
    Blanket,
}

impl Tool {
    pub fn category(&self) -> ToolCategory {
        match self {
            Tool::Bottle => ToolCategory::Feed,
            Tool::Sponge => ToolCategory::Clean,
            Tool::Ball => ToolCategory::Play,
            Tool::Blanket => ToolCategory::Sleep,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Tool::Bottle => "bottle",
            Tool::Sponge => "sponge",
            Tool::Ball => "ball",
            Tool::Blanket => "blanket",
        }
    }

    /// Hint shown under an armed picker selection.
    pub fn instructions(&self) -> &'static str {
        match self {
            Tool::Bottle => "Hold Zibu to feed",
            Tool::Sponge => "Swipe across Zibu to wash",
            Tool::Ball => "Shake your phone to play",
            Tool::Blanket => "Zibu is sleeping",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseToolError {
    #[error("unknown tool '{0}' (expected bottle, sponge, ball or blanket)")]
    UnknownTool(String),
    #[error("unknown category '{0}' (expected feed, clean, play or sleep)")]
    UnknownCategory(String),
}

impl FromStr for Tool {
    type Err = ParseToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bottle" => Ok(Tool::Bottle),
            "sponge" => Ok(Tool::Sponge),
            "ball" => Ok(Tool::Ball),
            "blanket" => Ok(Tool::Blanket),
            other => Err(ParseToolError::UnknownTool(other.to_string())),
        }
    }
}

impl FromStr for ToolCategory {
    type Err = ParseToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feed" => Ok(ToolCategory::Feed),
            "clean" => Ok(ToolCategory::Clean),
            "play" => Ok(ToolCategory::Play),
            "sleep" => Ok(ToolCategory::Sleep),
            other => Err(ParseToolError::UnknownCategory(other.to_string())),
        }
    }
}

/// What Zibu is currently doing. At most one category is ever armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    #[default]
    Idle,
    /// Bottle armed; `pressing` while the user holds Zibu.
    Feeding { pressing: bool },
    /// Sponge armed.
    Cleaning,
    /// Ball armed.
    Playing,
    /// Blanket armed.
    Sleeping,
}

impl Activity {
    /// The activity a freshly selected tool arms.
    pub fn armed_by(tool: Tool) -> Self {
        match tool.category() {
            ToolCategory::Feed => Activity::Feeding { pressing: false },
            ToolCategory::Clean => Activity::Cleaning,
            ToolCategory::Play => Activity::Playing,
            ToolCategory::Sleep => Activity::Sleeping,
        }
    }

    pub fn category(&self) -> Option<ToolCategory> {
        match self {
            Activity::Idle => None,
            Activity::Feeding { .. } => Some(ToolCategory::Feed),
            Activity::Cleaning => Some(ToolCategory::Clean),
            Activity::Playing => Some(ToolCategory::Play),
            Activity::Sleeping => Some(ToolCategory::Sleep),
        }
    }

    pub fn tool(&self) -> Option<Tool> {
        match self {
            Activity::Idle => None,
            Activity::Feeding { .. } => Some(Tool::Bottle),
            Activity::Cleaning => Some(Tool::Sponge),
            Activity::Playing => Some(Tool::Ball),
            Activity::Sleeping => Some(Tool::Blanket),
        }
    }

    /// Selection held by `category`; `None` for every category but the armed one.
    pub fn selection(&self, category: ToolCategory) -> Option<Tool> {
        self.tool().filter(|t| t.category() == category)
    }

    pub fn is_sleeping(&self) -> bool {
        matches!(self, Activity::Sleeping)
    }

    pub fn is_feeding(&self) -> bool {
        matches!(self, Activity::Feeding { pressing: true })
    }

    /// Whether the 1-second care ticker should be running.
    pub fn needs_care_ticker(&self) -> bool {
        self.is_feeding() || self.is_sleeping()
    }
}

/// Derived booleans the view reads. `is_upset` comes from the upset latch and
/// can be true alongside either of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivityFlags {
    pub is_sleeping: bool,
    pub is_feeding: bool,
    pub is_upset: bool,
}

impl ActivityFlags {
    pub fn new(activity: Activity, is_upset: bool) -> Self {
        Self {
            is_sleeping: activity.is_sleeping(),
            is_feeding: activity.is_feeding(),
            is_upset,
        }
    }
}
