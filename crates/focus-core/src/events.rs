//! Events emitted by the engine

use chrono::NaiveDate;
use focus_api::OverlayVisibility;

/// Events emitted by the engine on its broadcast channel
///
/// Loops only publish session and overlay events when the value differs
/// from what that loop last saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SessionChanged { active: bool },

    OverlayChanged { visibility: OverlayVisibility },

    /// A focus minute was credited; `minutes` is the new total for `day`
    FocusMinute { day: NaiveDate, minutes: u32 },

    DebugOverrideChanged { enabled: bool },

    PermissionChanged { granted: bool },

    /// Result of one pass over the restriction set
    TerminationSweep { attempted: usize, failed: usize },
}
