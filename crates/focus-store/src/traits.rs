//! Store trait definitions

use chrono::NaiveDate;
use focus_api::PlannerSnapshot;

use crate::{AuditEvent, StoreResult};

/// Persistence collaborator used by the daemon
///
/// The enforcement engine never touches the store; the daemon loads state
/// into the engine at startup and writes back after changes.
pub trait Store: Send + Sync {
    // Planner

    /// Load the last saved schedule and restriction set
    fn load_planner(&self) -> StoreResult<Option<PlannerSnapshot>>;

    fn save_planner(&self, planner: &PlannerSnapshot) -> StoreResult<()>;

    // Focus counter

    /// Focus minutes accrued on `day`; zero when nothing was recorded
    fn get_focus_minutes(&self, day: NaiveDate) -> StoreResult<u32>;

    /// Record focus minutes for `day`; a lower value never replaces a higher one
    fn set_focus_minutes(&self, day: NaiveDate, minutes: u32) -> StoreResult<()>;

    // Audit log

    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Most recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    fn is_healthy(&self) -> bool;
}
