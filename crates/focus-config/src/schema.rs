//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::CURRENT_CONFIG_VERSION;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    #[serde(default)]
    pub daemon: RawDaemonConfig,

    #[serde(default)]
    pub engine: RawEngineConfig,

    #[serde(default)]
    pub restrictions: RawRestrictions,

    #[serde(default)]
    pub notification: RawNotification,

    /// Initial schedule slots keyed by day name, used when nothing is persisted
    #[serde(default)]
    pub schedule: BTreeMap<String, Vec<u32>>,

    #[serde(default)]
    pub host: RawHostConfig,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION,
            daemon: RawDaemonConfig::default(),
            engine: RawEngineConfig::default(),
            restrictions: RawRestrictions::default(),
            notification: RawNotification::default(),
            schedule: BTreeMap::new(),
            host: RawHostConfig::default(),
        }
    }
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/focusguard/focusd.sock)
    pub socket_path: Option<PathBuf>,

    /// Data directory for the state store
    pub data_dir: Option<PathBuf>,

    pub log_dir: Option<PathBuf>,
}

/// Loop cadences and collaborator limits
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawEngineConfig {
    pub enforcement_interval_seconds: Option<u64>,
    pub overlay_interval_seconds: Option<u64>,
    pub collaborator_timeout_ms: Option<u64>,
    pub daily_target_minutes: Option<u32>,
}

/// Restriction seeding rules
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRestrictions {
    /// Identifiers never restricted by the initial seeding
    pub allow_list: Option<Vec<String>>,

    /// Identifier prefixes that mark an app as part of the system
    pub system_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNotification {
    pub title: Option<String>,
    pub text: Option<String>,
}

/// Platform collaborator commands
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawHostConfig {
    /// argv of the fullscreen blocker spawned while the overlay is shown
    pub overlay_command: Option<Vec<String>>,

    /// Window app id of the blocker; ignored by the foreground inspector
    pub overlay_app_id: Option<String>,

    /// argv launched when the user asks to grant the overlay permission
    pub settings_command: Option<Vec<String>>,
}
