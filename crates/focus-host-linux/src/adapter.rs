//! Linux host adapter implementation

use async_trait::async_trait;
use focus_api::{InstalledApp, NotificationConfig};
use focus_config::HostConfig;
use focus_host_api::{
    AppInventory, Capability, ForegroundInspector, ForegroundNotifier, HostCapabilities,
    HostError, HostResult, OverlayRenderer, PermissionBackend, ProcessTerminator,
};
use focus_util::AppId;
use tracing::{info, warn};

use crate::{
    CommandOverlay, DesktopInventory, NotifySendNotifier, ProcTerminator, SwayForeground,
    find_in_path,
};

/// Linux host adapter
///
/// Bundles every collaborator. Capabilities whose tools are missing at
/// detection time answer with [`HostError::Unavailable`].
pub struct LinuxHost {
    capabilities: HostCapabilities,
    inventory: DesktopInventory,
    terminator: ProcTerminator,
    foreground: SwayForeground,
    overlay: CommandOverlay,
    notifier: NotifySendNotifier,
}

impl LinuxHost {
    /// Build the adapter and detect which collaborators can work here
    pub fn detect(config: &HostConfig) -> Self {
        let terminator = ProcTerminator::new();
        let overlay_program = config.overlay_command.first().cloned().unwrap_or_default();

        let capabilities = HostCapabilities {
            can_list_apps: true,
            can_kill: terminator.is_available(),
            can_inspect_foreground: std::env::var_os("SWAYSOCK").is_some()
                && find_in_path("swaymsg").is_some(),
            can_render_overlay: !overlay_program.is_empty(),
            can_request_permission: true,
            can_notify: find_in_path("notify-send").is_some(),
        };

        let missing = capabilities.missing();
        if missing.is_empty() {
            info!("All Linux collaborators available");
        } else {
            let names: Vec<String> = missing.iter().map(|c| c.to_string()).collect();
            warn!(missing = ?names, "Some Linux collaborators are unavailable");
        }

        Self {
            capabilities,
            inventory: DesktopInventory::from_xdg(),
            terminator,
            foreground: SwayForeground::new([AppId::new(config.overlay_app_id.clone())]),
            overlay: CommandOverlay::new(
                config.overlay_command.clone(),
                config.settings_command.clone(),
            ),
            notifier: NotifySendNotifier::new(),
        }
    }

    pub fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    fn require(&self, capability: Capability) -> HostResult<()> {
        if self.capabilities.supports(capability) {
            Ok(())
        } else {
            Err(HostError::Unavailable(capability))
        }
    }
}

#[async_trait]
impl AppInventory for LinuxHost {
    async fn list(&self) -> HostResult<Vec<InstalledApp>> {
        self.require(Capability::Inventory)?;
        self.inventory.list().await
    }
}

#[async_trait]
impl ProcessTerminator for LinuxHost {
    async fn kill(&self, id: &AppId) -> HostResult<()> {
        self.require(Capability::Terminator)?;
        self.terminator.kill(id).await
    }
}

#[async_trait]
impl ForegroundInspector for LinuxHost {
    async fn current(&self) -> HostResult<AppId> {
        self.require(Capability::ForegroundInspector)?;
        self.foreground.current().await
    }
}

#[async_trait]
impl OverlayRenderer for LinuxHost {
    async fn show(&self) -> HostResult<bool> {
        self.require(Capability::OverlayRenderer)?;
        self.overlay.show().await
    }

    async fn hide(&self) -> HostResult<()> {
        self.require(Capability::OverlayRenderer)?;
        self.overlay.hide().await
    }
}

#[async_trait]
impl PermissionBackend for LinuxHost {
    async fn is_granted(&self) -> HostResult<bool> {
        self.require(Capability::Permission)?;
        self.overlay.permission().is_granted().await
    }

    async fn request_grant(&self) -> HostResult<()> {
        self.require(Capability::Permission)?;
        self.overlay.permission().request_grant().await
    }
}

#[async_trait]
impl ForegroundNotifier for LinuxHost {
    async fn start(&self, config: &NotificationConfig) -> HostResult<()> {
        self.require(Capability::Notifier)?;
        self.notifier.start(config).await
    }

    async fn stop(&self) -> HostResult<()> {
        self.require(Capability::Notifier)?;
        self.notifier.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_capability_is_unavailable() {
        let mut host = LinuxHost::detect(&HostConfig::default());
        host.capabilities = HostCapabilities::none();

        let err = host.current().await.unwrap_err();
        assert!(matches!(
            err,
            HostError::Unavailable(Capability::ForegroundInspector)
        ));
        assert!(host.kill(&AppId::new("x")).await.unwrap_err().is_unavailable());
        assert!(host.show().await.unwrap_err().is_unavailable());
    }

    #[test]
    fn inventory_and_permission_always_detected() {
        let host = LinuxHost::detect(&HostConfig::default());
        assert!(host.capabilities().can_list_apps);
        assert!(host.capabilities().can_request_permission);
        assert!(host.capabilities().can_render_overlay);
    }
}
