//! Validated policy structures

use crate::schema::{
    RawConfig, RawDaemonConfig, RawEngineConfig, RawHostConfig, RawNotification, RawRestrictions,
};
use focus_api::{NotificationConfig, WeekSchedule};
use focus_util::{AppId, DayKey, data_dir_without_env, default_log_dir, socket_path_without_env};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENFORCEMENT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_OVERLAY_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_COLLABORATOR_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_DAILY_TARGET_MINUTES: u32 = 60;
pub const DEFAULT_OVERLAY_APP_ID: &str = "focusguard-overlay";

/// Essential communication and system apps that initial seeding never restricts
pub const DEFAULT_ALLOW_LIST: &[&str] = &[
    "com.android.messaging",
    "com.google.android.apps.messaging",
    "com.android.dialer",
    "com.google.android.dialer",
    "com.android.settings",
    "com.android.systemui",
    "com.android.launcher3",
    "com.google.android.apps.nexuslauncher",
    "com.main",
];

pub const DEFAULT_SYSTEM_PREFIXES: &[&str] = &["com.android", "android."];

/// Validated policy ready for use by the daemon and engine
#[derive(Debug, Clone)]
pub struct Policy {
    pub daemon: DaemonConfig,
    pub engine: EngineConfig,
    pub restrictions: RestrictionsConfig,
    pub notification: NotificationConfig,

    /// Slots installed when no planner has been persisted yet
    pub initial_schedule: WeekSchedule,

    pub host: HostConfig,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonConfig::from_raw(raw.daemon),
            engine: EngineConfig::from_raw(raw.engine),
            restrictions: RestrictionsConfig::from_raw(raw.restrictions),
            notification: convert_notification(raw.notification),
            initial_schedule: convert_schedule(raw.schedule),
            host: HostConfig::from_raw(raw.host),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl DaemonConfig {
    fn from_raw(raw: RawDaemonConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(socket_path_without_env),
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
            log_dir: raw.log_dir.unwrap_or_else(default_log_dir),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_raw(RawDaemonConfig::default())
    }
}

/// Loop cadences, collaborator timeout and focus target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub enforcement_interval: Duration,
    pub overlay_interval: Duration,
    pub collaborator_timeout: Duration,
    pub daily_target: u32,
}

impl EngineConfig {
    fn from_raw(raw: RawEngineConfig) -> Self {
        Self {
            enforcement_interval: Duration::from_secs(
                raw.enforcement_interval_seconds
                    .unwrap_or(DEFAULT_ENFORCEMENT_INTERVAL_SECS),
            ),
            overlay_interval: Duration::from_secs(
                raw.overlay_interval_seconds
                    .unwrap_or(DEFAULT_OVERLAY_INTERVAL_SECS),
            ),
            collaborator_timeout: Duration::from_millis(
                raw.collaborator_timeout_ms
                    .unwrap_or(DEFAULT_COLLABORATOR_TIMEOUT_MS),
            ),
            daily_target: raw
                .daily_target_minutes
                .unwrap_or(DEFAULT_DAILY_TARGET_MINUTES),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_raw(RawEngineConfig::default())
    }
}

/// Rules for the one-time restriction seeding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictionsConfig {
    pub allow_list: BTreeSet<AppId>,
    pub system_prefixes: Vec<String>,
}

impl RestrictionsConfig {
    fn from_raw(raw: RawRestrictions) -> Self {
        let allow_list = match raw.allow_list {
            Some(list) => list.into_iter().map(AppId::new).collect(),
            None => DEFAULT_ALLOW_LIST.iter().map(|id| AppId::new(*id)).collect(),
        };
        let system_prefixes = raw.system_prefixes.unwrap_or_else(|| {
            DEFAULT_SYSTEM_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect()
        });

        Self {
            allow_list,
            system_prefixes,
        }
    }
}

impl Default for RestrictionsConfig {
    fn default() -> Self {
        Self::from_raw(RawRestrictions::default())
    }
}

/// Platform collaborator commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub overlay_command: Vec<String>,
    pub overlay_app_id: String,
    pub settings_command: Option<Vec<String>>,
}

impl HostConfig {
    fn from_raw(raw: RawHostConfig) -> Self {
        let overlay_app_id = raw
            .overlay_app_id
            .unwrap_or_else(|| DEFAULT_OVERLAY_APP_ID.to_string());
        let overlay_command = raw
            .overlay_command
            .unwrap_or_else(|| default_overlay_command(&overlay_app_id));

        Self {
            overlay_command,
            overlay_app_id,
            settings_command: raw.settings_command,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::from_raw(RawHostConfig::default())
    }
}

/// A fullscreen terminal showing a static banner until killed
fn default_overlay_command(app_id: &str) -> Vec<String> {
    vec![
        "foot".into(),
        "--fullscreen".into(),
        format!("--app-id={}", app_id),
        "--".into(),
        "sh".into(),
        "-c".into(),
        "printf '\\n  Focus Mode Active\\n'; exec sleep infinity".into(),
    ]
}

fn convert_notification(raw: RawNotification) -> NotificationConfig {
    let defaults = NotificationConfig::default();
    NotificationConfig {
        title: raw.title.unwrap_or(defaults.title),
        text: raw.text.unwrap_or(defaults.text),
    }
}

fn convert_schedule(raw: BTreeMap<String, Vec<u32>>) -> WeekSchedule {
    let mut schedule = WeekSchedule::new();
    for (name, hours) in raw {
        // Validation already rejected bad day names and hours
        let Ok(day) = name.parse::<DayKey>() else {
            continue;
        };
        for hour in hours {
            if let Ok(hour) = u8::try_from(hour) {
                let _ = schedule.insert(day, hour);
            }
        }
    }
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let policy = Policy::default();
        assert_eq!(policy.engine.enforcement_interval, Duration::from_secs(60));
        assert_eq!(policy.engine.overlay_interval, Duration::from_secs(3));
        assert_eq!(policy.engine.collaborator_timeout, Duration::from_millis(2000));
        assert_eq!(policy.engine.daily_target, 60);
        assert!(policy.initial_schedule.is_empty());
        assert!(policy
            .restrictions
            .allow_list
            .contains(&AppId::new("com.android.dialer")));
        assert_eq!(policy.notification.title, "Focus Mode Active");
    }

    #[test]
    fn default_overlay_command_uses_app_id() {
        let host = HostConfig::default();
        assert_eq!(host.overlay_app_id, DEFAULT_OVERLAY_APP_ID);
        assert!(host
            .overlay_command
            .iter()
            .any(|arg| arg.ends_with(DEFAULT_OVERLAY_APP_ID)));
        assert!(host.settings_command.is_none());
    }

    #[test]
    fn explicit_allow_list_replaces_default() {
        let restrictions = RestrictionsConfig::from_raw(RawRestrictions {
            allow_list: Some(vec!["firefox".into()]),
            system_prefixes: None,
        });
        assert_eq!(restrictions.allow_list.len(), 1);
        assert_eq!(restrictions.system_prefixes, vec!["com.android", "android."]);
    }
}
