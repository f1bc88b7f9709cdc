//! Audit event types

use chrono::{DateTime, Local};
use focus_util::{AppId, DayKey};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    DaemonStarted,

    DaemonStopped,

    /// Initial restriction set derived from the app inventory
    RestrictionsSeeded { restricted: usize, inventory: usize },

    SlotToggled {
        day: DayKey,
        hour: u8,
        scheduled: bool,
    },

    RestrictionToggled { app_id: AppId, restricted: bool },

    DebugOverrideChanged { enabled: bool },

    /// The overlay permission grant flow was started
    PermissionRequested,
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Set by the store on append
    pub id: i64,

    pub timestamp: DateTime<Local>,

    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0,
            timestamp: focus_util::now(),
            event,
        }
    }
}
