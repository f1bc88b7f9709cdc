//! Shared planner state

use focus_api::{InstalledApp, PlannerSnapshot, RestrictionSet, WeekSchedule};
use focus_util::{AppId, DayKey, FocusError};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Owner of the weekly schedule and the restriction set
///
/// Readers get an immutable snapshot that later edits never touch. Writers
/// build a new value from the current one and swap it in under the write
/// lock, so a snapshot never shows a half-applied edit.
#[derive(Debug, Default)]
pub struct PlannerState {
    current: RwLock<Arc<PlannerSnapshot>>,
    seeded: AtomicBool,
}

impl PlannerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of the schedule and restriction set
    pub fn snapshot(&self) -> Arc<PlannerSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut PlannerSnapshot) -> Result<T, FocusError>,
    ) -> Result<T, FocusError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = PlannerSnapshot::clone(&current);
        let result = f(&mut next)?;
        *current = Arc::new(next);
        Ok(result)
    }

    /// Flip `hour` on `day`, returning whether the slot is now scheduled
    ///
    /// Hours outside 0..=23 are rejected and nothing changes.
    pub fn toggle_slot(&self, day: DayKey, hour: u8) -> Result<bool, FocusError> {
        let scheduled = self.update(|planner| planner.schedule.toggle(day, hour))?;
        debug!(%day, hour, scheduled, "Schedule slot toggled");
        Ok(scheduled)
    }

    /// Flip membership of `id`, returning whether it is now restricted
    pub fn toggle_restriction(&self, id: AppId) -> bool {
        let log_id = id.clone();
        let restricted = self
            .update(|planner| Ok(planner.restricted.toggle(id)))
            .unwrap_or_default();
        debug!(app_id = %log_id, restricted, "Restriction toggled");
        restricted
    }

    /// One-time initialization of the restriction set from the inventory
    ///
    /// Returns the number of restricted apps, or `None` if the set was
    /// already seeded or replaced from persisted state.
    pub fn seed_restrictions(
        &self,
        inventory: &[InstalledApp],
        allow_list: &BTreeSet<AppId>,
        system_prefixes: &[String],
    ) -> Option<usize> {
        if self.seeded.swap(true, Ordering::SeqCst) {
            debug!("Restrictions already seeded, skipping");
            return None;
        }

        let restricted = RestrictionSet::from_inventory(inventory, allow_list, system_prefixes);
        let count = restricted.len();
        let _ = self.update(|planner| {
            planner.restricted = restricted;
            Ok(())
        });

        info!(
            restricted = count,
            inventory = inventory.len(),
            "Restriction set seeded"
        );
        Some(count)
    }

    /// Install persisted state wholesale; later seeding becomes a no-op
    pub fn replace(&self, planner: PlannerSnapshot) {
        self.seeded.store(true, Ordering::SeqCst);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(planner);
    }

    /// Install a schedule, leaving the restriction set untouched
    pub fn replace_schedule(&self, schedule: WeekSchedule) {
        let _ = self.update(|planner| {
            planner.schedule = schedule;
            Ok(())
        });
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_slot_twice_restores_membership() {
        let state = PlannerState::new();
        for day in DayKey::ALL {
            for hour in 0..24 {
                let before = state.snapshot();
                assert!(state.toggle_slot(day, hour).unwrap());
                assert!(!state.toggle_slot(day, hour).unwrap());
                assert_eq!(*state.snapshot(), *before);
            }
        }
    }

    #[test]
    fn out_of_range_hour_is_rejected_without_mutation() {
        let state = PlannerState::new();
        state.toggle_slot(DayKey::Friday, 17).unwrap();
        let before = state.snapshot();

        assert!(matches!(
            state.toggle_slot(DayKey::Friday, 24),
            Err(FocusError::HourOutOfRange(24))
        ));
        assert_eq!(*state.snapshot(), *before);
    }

    #[test]
    fn toggle_restriction_twice_restores_membership() {
        let state = PlannerState::new();
        assert!(state.toggle_restriction(AppId::new("game")));
        assert!(state.snapshot().restricted.contains(&AppId::new("game")));
        assert!(!state.toggle_restriction(AppId::new("game")));
        assert!(state.snapshot().restricted.is_empty());
    }

    #[test]
    fn snapshot_is_independent_of_later_edits() {
        let state = PlannerState::new();
        let before = state.snapshot();
        state.toggle_slot(DayKey::Monday, 9).unwrap();
        state.toggle_restriction(AppId::new("x"));

        assert!(before.schedule.is_empty());
        assert!(before.restricted.is_empty());
        assert_eq!(state.snapshot().schedule.slot_count(), 1);
    }

    #[test]
    fn seeding_happens_once() {
        let state = PlannerState::new();
        let apps = vec![
            InstalledApp::new("Game", "com.example.game"),
            InstalledApp::new("Messages", "com.android.messaging"),
            InstalledApp::new("Launcher", "com.main"),
        ];
        let allow: BTreeSet<AppId> = [AppId::new("com.main")].into_iter().collect();
        let prefixes = vec!["com.android".to_string(), "android.".to_string()];

        assert_eq!(state.seed_restrictions(&apps, &allow, &prefixes), Some(1));
        assert!(state
            .snapshot()
            .restricted
            .contains(&AppId::new("com.example.game")));

        state.toggle_restriction(AppId::new("com.example.game"));
        assert_eq!(state.seed_restrictions(&apps, &allow, &prefixes), None);
        assert!(state.snapshot().restricted.is_empty());
    }

    fn matched_planner(hours: std::ops::Range<u8>) -> PlannerSnapshot {
        let mut planner = PlannerSnapshot::default();
        for hour in hours {
            planner.schedule.toggle(DayKey::Monday, hour).unwrap();
            planner.restricted.toggle(AppId::new(format!("app{hour}")));
        }
        planner
    }

    #[test]
    fn concurrent_readers_never_see_a_mixed_planner() {
        let state = PlannerState::new();
        state.replace(matched_planner(0..1));

        std::thread::scope(|scope| {
            for writer in 0..2u8 {
                let state = &state;
                scope.spawn(move || {
                    for round in 0..500u16 {
                        let len = ((round + u16::from(writer) * 7) % 24) as u8 + 1;
                        state.replace(matched_planner(0..len));
                    }
                });
            }

            for _ in 0..4 {
                let state = &state;
                scope.spawn(move || {
                    for _ in 0..2000 {
                        let snapshot = state.snapshot();
                        let expected: BTreeSet<AppId> = snapshot
                            .schedule
                            .hours(DayKey::Monday)
                            .iter()
                            .map(|hour| AppId::new(format!("app{hour}")))
                            .collect();
                        let restricted: BTreeSet<AppId> =
                            snapshot.restricted.iter().cloned().collect();
                        assert!(!expected.is_empty());
                        assert_eq!(restricted, expected);
                    }
                });
            }
        });
    }

    #[test]
    fn replace_disables_seeding() {
        let state = PlannerState::new();
        let mut planner = PlannerSnapshot::default();
        planner.restricted.toggle(AppId::new("video"));
        state.replace(planner.clone());

        let apps = vec![InstalledApp::new("Game", "game")];
        assert_eq!(state.seed_restrictions(&apps, &BTreeSet::new(), &[]), None);
        assert_eq!(*state.snapshot(), planner);
    }
}
