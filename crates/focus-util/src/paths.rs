//! Default paths for focusguard components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/focusguard/focusd.sock` or `/tmp/focusguard-$USER/focusd.sock`
//! - Config: `$XDG_CONFIG_HOME/focusguard/config.toml` or `~/.config/focusguard/config.toml`
//! - Data: `$XDG_DATA_HOME/focusguard` or `~/.local/share/focusguard`
//! - Logs: `$XDG_STATE_HOME/focusguard` or `~/.local/state/focusguard`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const FOCUSGUARD_SOCKET_ENV: &str = "FOCUSGUARD_SOCKET";

/// Environment variable for overriding the data directory
pub const FOCUSGUARD_DATA_DIR_ENV: &str = "FOCUSGUARD_DATA_DIR";

const SOCKET_FILENAME: &str = "focusd.sock";
const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "focusguard";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$FOCUSGUARD_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/focusguard/focusd.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/focusguard-$USER/focusd.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(FOCUSGUARD_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the socket path without checking the FOCUSGUARD_SOCKET env var.
/// Used for config defaults, where the env var is checked separately.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default configuration file path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$FOCUSGUARD_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/focusguard` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/focusguard` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(FOCUSGUARD_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking the FOCUSGUARD_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default log directory.
pub fn default_log_dir() -> PathBuf {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(state_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("state")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_contains_app_dir() {
        let path = socket_path_without_env();
        assert!(path.to_string_lossy().contains("focusguard"));
        assert!(path.to_string_lossy().ends_with("focusd.sock"));
    }

    #[test]
    fn config_path_is_toml() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("focusguard"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
    }

    #[test]
    fn data_and_log_dirs_contain_app_dir() {
        assert!(data_dir_without_env().to_string_lossy().contains("focusguard"));
        assert!(default_log_dir().to_string_lossy().contains("focusguard"));
    }
}
