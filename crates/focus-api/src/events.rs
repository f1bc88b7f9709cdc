//! Event types for focusd -> client streaming

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{API_VERSION, OverlayVisibility};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: focus_util::now(),
            payload,
        }
    }
}

/// All possible events from the daemon to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A restricted session started or ended
    SessionChanged { active: bool },

    /// The overlay supervisor applied a different visibility
    OverlayChanged { visibility: OverlayVisibility },

    /// A focus minute was credited
    FocusMinute { day: NaiveDate, minutes: u32 },

    /// The debug override was flipped
    DebugOverrideChanged { enabled: bool },

    /// The overlay permission status changed
    PermissionChanged { granted: bool },

    /// An enforcement tick swept the restricted apps
    TerminationSweep { attempted: usize, failed: usize },

    /// The schedule or restriction set was edited
    PlannerChanged,
}
