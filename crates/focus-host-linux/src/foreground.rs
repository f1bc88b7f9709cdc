//! Foreground application detection through sway IPC

use async_trait::async_trait;
use focus_host_api::{Capability, ForegroundInspector, HostError, HostResult};
use focus_util::AppId;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tokio::process::Command;
use tracing::debug;

/// Reads the focused window from `swaymsg -t get_tree`
///
/// Wayland windows report `app_id`; XWayland windows fall back to the X11
/// class. Windows in `ignored` (the overlay itself) are looked through: the
/// last other focused app is reported instead.
pub struct SwayForeground {
    program: String,
    ignored: HashSet<AppId>,
    last_seen: Mutex<Option<AppId>>,
}

impl SwayForeground {
    pub fn new(ignored: impl IntoIterator<Item = AppId>) -> Self {
        Self {
            program: "swaymsg".into(),
            ignored: ignored.into_iter().collect(),
            last_seen: Mutex::new(None),
        }
    }

    async fn query_tree(&self) -> HostResult<Value> {
        let output = Command::new(&self.program)
            .args(["-t", "get_tree", "-r"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                HostError::call_failed(
                    Capability::ForegroundInspector,
                    format!("failed to run {}: {}", self.program, e),
                )
            })?;

        if !output.status.success() {
            return Err(HostError::call_failed(
                Capability::ForegroundInspector,
                format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            HostError::call_failed(
                Capability::ForegroundInspector,
                format!("invalid tree JSON: {}", e),
            )
        })
    }

    fn resolve(&self, focused: AppId) -> HostResult<AppId> {
        let mut last_seen = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        if self.ignored.contains(&focused) {
            debug!(app_id = %focused, "Focused window is ignored, reporting previous app");
            return last_seen.clone().ok_or_else(|| {
                HostError::call_failed(
                    Capability::ForegroundInspector,
                    "only an ignored window has had focus",
                )
            });
        }
        *last_seen = Some(focused.clone());
        Ok(focused)
    }
}

#[async_trait]
impl ForegroundInspector for SwayForeground {
    async fn current(&self) -> HostResult<AppId> {
        let tree = self.query_tree().await?;
        let focused = focused_app_id(&tree).ok_or_else(|| {
            HostError::call_failed(Capability::ForegroundInspector, "no focused window")
        })?;
        self.resolve(focused)
    }
}

/// App id of the focused window in a sway tree
pub fn focused_app_id(node: &Value) -> Option<AppId> {
    if node.get("focused").and_then(Value::as_bool) == Some(true) {
        if let Some(id) = node
            .get("app_id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            return Some(AppId::new(id));
        }
        if let Some(class) = node
            .pointer("/window_properties/class")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
        {
            return Some(AppId::new(class));
        }
        // A focused workspace or output has no app
        return None;
    }

    ["nodes", "floating_nodes"]
        .iter()
        .filter_map(|key| node.get(*key).and_then(Value::as_array))
        .flatten()
        .find_map(focused_app_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(focused: Value) -> Value {
        json!({
            "type": "root",
            "focused": false,
            "nodes": [{
                "type": "output",
                "focused": false,
                "nodes": [{
                    "type": "workspace",
                    "focused": false,
                    "nodes": [
                        { "type": "con", "focused": false, "app_id": "foot" }
                    ],
                    "floating_nodes": [focused]
                }]
            }]
        })
    }

    #[test]
    fn finds_wayland_app_id() {
        let value = tree(json!({ "type": "floating_con", "focused": true, "app_id": "firefox" }));
        assert_eq!(focused_app_id(&value), Some(AppId::new("firefox")));
    }

    #[test]
    fn falls_back_to_x11_class() {
        let value = tree(json!({
            "type": "con",
            "focused": true,
            "app_id": null,
            "window_properties": { "class": "steam" }
        }));
        assert_eq!(focused_app_id(&value), Some(AppId::new("steam")));
    }

    #[test]
    fn empty_workspace_has_no_app() {
        let value = json!({
            "type": "root",
            "focused": false,
            "nodes": [{ "type": "workspace", "focused": true, "nodes": [] }]
        });
        assert_eq!(focused_app_id(&value), None);
    }

    #[test]
    fn ignored_window_reports_previous_app() {
        let inspector = SwayForeground::new([AppId::new("focusguard-overlay")]);

        assert!(inspector.resolve(AppId::new("focusguard-overlay")).is_err());
        assert_eq!(
            inspector.resolve(AppId::new("game")).unwrap(),
            AppId::new("game")
        );
        assert_eq!(
            inspector.resolve(AppId::new("focusguard-overlay")).unwrap(),
            AppId::new("game")
        );
    }
}
