//! Persistent desktop notification via `notify-send`

use async_trait::async_trait;
use focus_api::NotificationConfig;
use focus_host_api::{Capability, ForegroundNotifier, HostError, HostResult};
use std::sync::{Mutex, PoisonError};
use tokio::process::Command;
use tracing::debug;

const APP_NAME: &str = "focusguard";

pub struct NotifySendNotifier {
    program: String,
    notification_id: Mutex<Option<u32>>,
}

impl NotifySendNotifier {
    pub fn new() -> Self {
        Self {
            program: "notify-send".into(),
            notification_id: Mutex::new(None),
        }
    }

    async fn send(&self, args: Vec<String>) -> HostResult<String> {
        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                HostError::call_failed(
                    Capability::Notifier,
                    format!("failed to run {}: {}", self.program, e),
                )
            })?;

        if !output.status.success() {
            return Err(HostError::call_failed(
                Capability::Notifier,
                format!("{} exited with {}", self.program, output.status),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for NotifySendNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments for a notification that stays until replaced
fn start_args(config: &NotificationConfig, replace: Option<u32>) -> Vec<String> {
    let mut args = vec![
        format!("--app-name={}", APP_NAME),
        "--urgency=critical".into(),
        "--expire-time=0".into(),
        "--print-id".into(),
    ];
    if let Some(id) = replace {
        args.push(format!("--replace-id={}", id));
    }
    args.push(config.title.clone());
    args.push(config.text.clone());
    args
}

/// Arguments replacing the persistent notification with a short-lived one
fn stop_args(id: u32) -> Vec<String> {
    vec![
        format!("--app-name={}", APP_NAME),
        format!("--replace-id={}", id),
        "--urgency=low".into(),
        "--expire-time=1".into(),
        "Focus mode ended".into(),
    ]
}

#[async_trait]
impl ForegroundNotifier for NotifySendNotifier {
    async fn start(&self, config: &NotificationConfig) -> HostResult<()> {
        let existing = *self
            .notification_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let stdout = self.send(start_args(config, existing)).await?;
        let id = stdout.trim().parse::<u32>().ok();
        debug!(?id, "Persistent notification shown");

        *self
            .notification_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = id.or(existing);
        Ok(())
    }

    async fn stop(&self) -> HostResult<()> {
        let id = self
            .notification_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(id) = id else {
            return Ok(());
        };

        self.send(stop_args(id)).await?;
        debug!(id, "Persistent notification replaced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_args_are_persistent() {
        let args = start_args(&NotificationConfig::default(), None);
        assert!(args.contains(&"--expire-time=0".to_string()));
        assert!(args.contains(&"--print-id".to_string()));
        assert_eq!(args[args.len() - 2], "Focus Mode Active");
        assert_eq!(args[args.len() - 1], "Restricted apps are blocked.");
        assert!(!args.iter().any(|a| a.starts_with("--replace-id")));
    }

    #[test]
    fn restart_replaces_existing_notification() {
        let args = start_args(&NotificationConfig::default(), Some(42));
        assert!(args.contains(&"--replace-id=42".to_string()));
        assert!(stop_args(42).contains(&"--replace-id=42".to_string()));
    }

    #[tokio::test]
    async fn stop_without_start_is_noop() {
        let notifier = NotifySendNotifier::new();
        assert!(notifier.stop().await.is_ok());
    }
}
