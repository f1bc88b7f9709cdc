//! Blocking overlay backed by a fullscreen command

use async_trait::async_trait;
use focus_host_api::{Capability, HostError, HostResult, OverlayRenderer, PermissionBackend};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{find_in_path, has_graphical_session};

/// Whether this session may draw the overlay
///
/// Granted when a graphical session is reachable and the overlay program
/// resolves. The grant flow launches `settings_command`, if configured.
pub struct OverlayPermission {
    overlay_program: String,
    settings_command: Option<Vec<String>>,
}

impl OverlayPermission {
    pub fn new(overlay_program: impl Into<String>, settings_command: Option<Vec<String>>) -> Self {
        Self {
            overlay_program: overlay_program.into(),
            settings_command,
        }
    }

    pub fn check(&self) -> bool {
        has_graphical_session() && find_in_path(&self.overlay_program).is_some()
    }
}

#[async_trait]
impl PermissionBackend for OverlayPermission {
    async fn is_granted(&self) -> HostResult<bool> {
        Ok(self.check())
    }

    async fn request_grant(&self) -> HostResult<()> {
        let Some((program, args)) = self.settings_command.as_ref().and_then(|c| c.split_first())
        else {
            warn!(
                program = %self.overlay_program,
                "Overlay unavailable; install the overlay program or set [host] settings_command"
            );
            return Err(HostError::PermissionDenied(format!(
                "{} cannot be shown and no settings command is configured",
                self.overlay_program
            )));
        };

        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                HostError::call_failed(
                    Capability::Permission,
                    format!("failed to launch {}: {}", program, e),
                )
            })?;

        info!(program = %program, "Launched overlay permission settings");
        Ok(())
    }
}

/// Shows the overlay by spawning `command`, hides it by killing the child
///
/// Both operations are idempotent and no-op without permission.
pub struct CommandOverlay {
    command: Vec<String>,
    permission: OverlayPermission,
    child: Mutex<Option<Child>>,
}

impl CommandOverlay {
    pub fn new(command: Vec<String>, settings_command: Option<Vec<String>>) -> Self {
        let program = command.first().cloned().unwrap_or_default();
        Self {
            command,
            permission: OverlayPermission::new(program, settings_command),
            child: Mutex::new(None),
        }
    }

    pub fn permission(&self) -> &OverlayPermission {
        &self.permission
    }

    pub async fn is_shown(&self) -> bool {
        let mut child = self.child.lock().await;
        still_running(&mut child)
    }
}

fn still_running(child: &mut Option<Child>) -> bool {
    match child {
        Some(c) => matches!(c.try_wait(), Ok(None)),
        None => false,
    }
}

#[async_trait]
impl OverlayRenderer for CommandOverlay {
    async fn show(&self) -> HostResult<bool> {
        let mut child = self.child.lock().await;
        if still_running(&mut child) {
            return Ok(true);
        }
        if !self.permission.check() {
            debug!("Overlay permission missing, not showing");
            return Ok(false);
        }

        let Some((program, args)) = self.command.split_first() else {
            return Err(HostError::Unavailable(Capability::OverlayRenderer));
        };
        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                HostError::call_failed(
                    Capability::OverlayRenderer,
                    format!("failed to spawn {}: {}", program, e),
                )
            })?;

        info!(pid = spawned.id(), "Overlay shown");
        *child = Some(spawned);
        Ok(true)
    }

    async fn hide(&self) -> HostResult<()> {
        let mut child = self.child.lock().await;
        let Some(mut running) = child.take() else {
            return Ok(());
        };

        if let Err(e) = running.kill().await {
            // Already exited is fine
            debug!(error = %e, "Overlay process kill failed");
        }
        info!("Overlay hidden");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hide_without_show_is_noop() {
        let overlay = CommandOverlay::new(vec!["sleep".into(), "30".into()], None);
        overlay.hide().await.unwrap();
        assert!(!overlay.is_shown().await);
    }

    #[tokio::test]
    async fn missing_program_means_no_permission() {
        let permission = OverlayPermission::new("definitely-not-a-real-overlay", None);
        assert!(!permission.is_granted().await.unwrap());
        assert!(matches!(
            permission.request_grant().await,
            Err(HostError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn show_is_noop_without_permission() {
        let overlay = CommandOverlay::new(vec!["definitely-not-a-real-overlay".into()], None);
        assert!(!overlay.show().await.unwrap());
        assert!(!overlay.is_shown().await);
    }

    #[tokio::test]
    async fn settings_command_is_launched() {
        let permission =
            OverlayPermission::new("definitely-not-a-real-overlay", Some(vec!["true".into()]));
        assert!(permission.request_grant().await.is_ok());
    }
}
