//! Planner data model shared by the engine, the store and clients

use chrono::{DateTime, Local};
use focus_util::{AppId, DayKey, FocusError, HOURS_PER_DAY, hour_of};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Weekly grid of restricted hour slots
///
/// Always holds all seven day keys; each maps to a (possibly empty) set of
/// hours in 0..=23. Serialized as a map from lowercase day name to hours.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<DayKey, BTreeSet<u8>>",
    into = "BTreeMap<DayKey, BTreeSet<u8>>"
)]
pub struct WeekSchedule {
    slots: [BTreeSet<u8>; 7],
}

impl WeekSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, day: DayKey, hour: u8) -> bool {
        self.slots[day.index()].contains(&hour)
    }

    /// Flip membership of `hour` on `day`, returning the new membership
    pub fn toggle(&mut self, day: DayKey, hour: u8) -> Result<bool, FocusError> {
        check_hour(hour)?;
        let hours = &mut self.slots[day.index()];
        if hours.remove(&hour) {
            Ok(false)
        } else {
            hours.insert(hour);
            Ok(true)
        }
    }

    pub fn insert(&mut self, day: DayKey, hour: u8) -> Result<(), FocusError> {
        check_hour(hour)?;
        self.slots[day.index()].insert(hour);
        Ok(())
    }

    pub fn hours(&self, day: DayKey) -> &BTreeSet<u8> {
        &self.slots[day.index()]
    }

    /// Whether the wall-clock hour of `now` is a scheduled slot
    pub fn covers(&self, now: &DateTime<Local>) -> bool {
        self.contains(DayKey::of(now), hour_of(now))
    }

    pub fn slot_count(&self) -> usize {
        self.slots.iter().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slot_count() == 0
    }
}

fn check_hour(hour: u8) -> Result<(), FocusError> {
    if hour < HOURS_PER_DAY {
        Ok(())
    } else {
        Err(FocusError::HourOutOfRange(hour))
    }
}

impl TryFrom<BTreeMap<DayKey, BTreeSet<u8>>> for WeekSchedule {
    type Error = FocusError;

    fn try_from(map: BTreeMap<DayKey, BTreeSet<u8>>) -> Result<Self, Self::Error> {
        let mut schedule = WeekSchedule::new();
        for (day, hours) in map {
            for hour in hours {
                schedule.insert(day, hour)?;
            }
        }
        Ok(schedule)
    }
}

impl From<WeekSchedule> for BTreeMap<DayKey, BTreeSet<u8>> {
    fn from(schedule: WeekSchedule) -> Self {
        DayKey::ALL
            .into_iter()
            .zip(schedule.slots)
            .collect()
    }
}

/// Set of application identifiers blocked during sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestrictionSet(BTreeSet<AppId>);

impl RestrictionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// All user-installed apps that are not on the allow-list
    ///
    /// An app counts as user-installed when its identifier starts with none
    /// of `system_prefixes`.
    pub fn from_inventory(
        apps: &[InstalledApp],
        allow_list: &BTreeSet<AppId>,
        system_prefixes: &[String],
    ) -> Self {
        apps.iter()
            .filter(|app| app.is_user_app(system_prefixes))
            .filter(|app| !allow_list.contains(&app.id))
            .map(|app| app.id.clone())
            .collect()
    }

    pub fn contains(&self, id: &AppId) -> bool {
        self.0.contains(id)
    }

    /// Flip membership of `id`, returning the new membership
    pub fn toggle(&mut self, id: AppId) -> bool {
        if self.0.remove(&id) {
            false
        } else {
            self.0.insert(id);
            true
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<AppId> for RestrictionSet {
    fn from_iter<I: IntoIterator<Item = AppId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An installed application as reported by the app inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledApp {
    pub display_name: String,
    pub id: AppId,
}

impl InstalledApp {
    pub fn new(display_name: impl Into<String>, id: impl Into<AppId>) -> Self {
        Self {
            display_name: display_name.into(),
            id: id.into(),
        }
    }

    pub fn is_user_app(&self, system_prefixes: &[String]) -> bool {
        !system_prefixes
            .iter()
            .any(|prefix| self.id.as_str().starts_with(prefix.as_str()))
    }
}

/// Consistent copy of the schedule and restriction set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerSnapshot {
    pub schedule: WeekSchedule,
    pub restricted: RestrictionSet,
}

/// Target state of the blocking overlay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayVisibility {
    #[default]
    Hidden,
    Shown,
}

impl OverlayVisibility {
    pub fn is_shown(self) -> bool {
        self == OverlayVisibility::Shown
    }
}

/// Content of the persistent notification shown while the debug override is on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub title: String,
    pub text: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: "Focus Mode Active".into(),
            text: "Restricted apps are blocked.".into(),
        }
    }
}

/// Engine status as reported to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub api_version: u32,
    pub running: bool,
    pub session_active: bool,
    pub debug_override: bool,
    pub overlay: OverlayVisibility,
    pub focus_minutes: u32,
    pub daily_target: u32,
    pub permission_granted: bool,
    pub planner: PlannerSnapshot,
}
