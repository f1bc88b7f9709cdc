//! Session evaluation

use chrono::{DateTime, Local};
use focus_api::PlannerSnapshot;

/// Whether a restricted session is active at `now`
///
/// The debug override forces a session regardless of the schedule.
/// Otherwise the wall-clock weekday and hour must be a scheduled slot.
pub fn is_session_active(
    planner: &PlannerSnapshot,
    debug_override: bool,
    now: &DateTime<Local>,
) -> bool {
    debug_override || planner.schedule.covers(now)
}
