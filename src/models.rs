//! Plain‑data structs shared across the store, sessions and dashboard.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::NoteError;

/// A single row from the `notes` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Zero until the store assigns an id on first insert.
    pub id: i64,
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub priority: Priority,
    pub timer_enabled: bool,
    /// Epoch seconds. Only `Some` while `timer_enabled` is set.
    pub timer_time: Option<i64>,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            id: 0,
            x: 0,
            y: 0,
            text: String::new(),
            priority: Priority::Low,
            timer_enabled: false,
            timer_time: None,
        }
    }
}

impl Note {
    /// Keeps `timer_time` present exactly when the timer is enabled.
    /// An enabled timer with no time is switched off.
    pub fn normalize_timer(&mut self) {
        if self.timer_enabled && self.timer_time.is_none() {
            self.timer_enabled = false;
        }
        if !self.timer_enabled {
            self.timer_time = None;
        }
    }
}

/* ----------------------------- priority ----------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }

    /// Dashboard rank, lower sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 1,
            Priority::High => 2,
            Priority::Medium => 3,
            Priority::Low => 4,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Priority::Critical => "#C5172E",
            Priority::High => "#85193C",
            Priority::Medium => "#E85C0D",
            Priority::Low => "#FCF259",
        }
    }

    fn is_urgent(&self) -> bool {
        matches!(self, Priority::Critical | Priority::High)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| NoteError::invalid_priority(s))
    }
}

/* --------------------------- UI convenience -------------------------- */

/// Display state derived from a note's priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteStyle {
    pub background: &'static str,
    pub foreground: &'static str,
    pub font_pt: u8,
    pub stays_on_top: bool,
}

impl NoteStyle {
    pub fn for_priority(priority: Priority) -> Self {
        if priority.is_urgent() {
            Self {
                background: priority.color(),
                foreground: "#FFFFFF",
                font_pt: 18,
                stays_on_top: true,
            }
        } else {
            Self {
                background: priority.color(),
                foreground: "#62622f",
                font_pt: 16,
                stays_on_top: false,
            }
        }
    }
}

/// Opaque key of one live session, issued by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionHandle(pub u64);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for SessionHandle {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .trim_start_matches('#')
            .parse::<u64>()
            .map(SessionHandle)
            .map_err(|_| NoteError::invalid_command(format!("not a session handle: {s}")))
    }
}
