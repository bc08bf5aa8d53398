//! What the view layer reads: the pet marker, status bands and animation choice
//!
//! The view never touches the engine directly. After every mutation the
//! runtime publishes a [`PetMarker`], and the view renders from that alone.

use crate::activity::{Activity, ActivityFlags, Tool};
use crate::engine::NeedsEngine;
use crate::needs::{NeedChannel, NeedsState};
use serde::{Deserialize, Serialize};

/// Sprite animation to play. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    Blink,
    Eating,
    Sleeping,
    Upset,
    Playing,
}

/// Sprite-sheet layout and playback rate of one animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub frame_count: u32,
    pub cols: u32,
    pub rows: u32,
    pub fps: u32,
}

impl Animation {
    /// Priority: upset > sleeping > feeding > playing > idle blink.
    pub fn select(flags: ActivityFlags, activity: Activity) -> Self {
        if flags.is_upset {
            Animation::Upset
        } else if flags.is_sleeping {
            Animation::Sleeping
        } else if flags.is_feeding {
            Animation::Eating
        } else if activity == Activity::Playing {
            Animation::Playing
        } else {
            Animation::Blink
        }
    }

    pub fn clip(&self) -> AnimationClip {
        let (frame_count, cols, rows, fps) = match self {
            Animation::Blink => (8, 3, 3, 20),
            Animation::Sleeping => (3, 3, 1, 15),
            Animation::Eating => (17, 6, 3, 15),
            Animation::Upset => (5, 5, 1, 15),
            Animation::Playing => (24, 3, 8, 15),
        };
        AnimationClip {
            frame_count,
            cols,
            rows,
            fps,
        }
    }
}

/// Colour band of a need indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBand {
    Critical,
    Low,
    Fair,
    Good,
}

impl StatusBand {
    pub fn of(value: f32) -> Self {
        if value >= 0.75 {
            StatusBand::Good
        } else if value >= 0.5 {
            StatusBand::Fair
        } else if value >= 0.25 {
            StatusBand::Low
        } else {
            StatusBand::Critical
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            StatusBand::Good => "#6DD19C",
            StatusBand::Fair => "#F4D35E",
            StatusBand::Low => "#FFA552",
            StatusBand::Critical => "#E94F37",
        }
    }
}

/// Whole-number percentage shown on the badge.
pub fn percent(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// One need indicator as the view draws it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedStatus {
    pub channel: NeedChannel,
    pub value: f32,
    pub percent: u8,
    pub band: StatusBand,
}

/// Compressed state broadcast to the view after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetMarker {
    pub needs: NeedsState,
    pub activity: Activity,
    pub tool: Option<Tool>,
    pub flags: ActivityFlags,
    pub animation: Animation,
    pub last_updated: i64,
}

impl PetMarker {
    pub fn from_engine(engine: &NeedsEngine) -> Self {
        let activity = engine.activity();
        let flags = engine.flags();
        Self {
            needs: engine.needs(),
            activity,
            tool: activity.tool(),
            flags,
            animation: Animation::select(flags, activity),
            last_updated: engine.last_updated(),
        }
    }

    pub fn statuses(&self) -> Vec<NeedStatus> {
        self.needs
            .iter()
            .map(|(channel, value)| NeedStatus {
                channel,
                value,
                percent: percent(value),
                band: StatusBand::of(value),
            })
            .collect()
    }

    /// One-line summary, e.g. for a terminal.
    pub fn describe(&self) -> String {
        let bars: Vec<String> = self
            .statuses()
            .iter()
            .map(|s| format!("{} {:>3}%", s.channel, s.percent))
            .collect();
        let tool = self.tool.map(|t| t.key()).unwrap_or("none");
        format!(
            "{} | tool: {} | animation: {:?}",
            bars.join("  "),
            tool,
            self.animation
        )
    }
}
