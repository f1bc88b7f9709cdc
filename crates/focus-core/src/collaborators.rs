//! Timeout-bounded access to the platform collaborators

use focus_api::{InstalledApp, NotificationConfig, OverlayVisibility};
use focus_host_api::{
    AppInventory, Capability, ForegroundInspector, ForegroundNotifier, HostError, HostResult,
    OverlayRenderer, PermissionBackend, ProcessTerminator,
};
use focus_util::AppId;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// The six collaborators the engine drives
///
/// Every call is bounded by `timeout`. Failures are logged here and handed
/// back to the caller, which decides whether to fail open. An unavailable
/// capability is reported at warn level once, then only at debug level.
pub struct Collaborators {
    inventory: Arc<dyn AppInventory>,
    terminator: Arc<dyn ProcessTerminator>,
    foreground: Arc<dyn ForegroundInspector>,
    overlay: Arc<dyn OverlayRenderer>,
    permission: Arc<dyn PermissionBackend>,
    notifier: Arc<dyn ForegroundNotifier>,
    timeout: Duration,
    reported_unavailable: Mutex<HashSet<Capability>>,
    overlay_shown: AtomicBool,
}

impl Collaborators {
    pub fn new(
        inventory: Arc<dyn AppInventory>,
        terminator: Arc<dyn ProcessTerminator>,
        foreground: Arc<dyn ForegroundInspector>,
        overlay: Arc<dyn OverlayRenderer>,
        permission: Arc<dyn PermissionBackend>,
        notifier: Arc<dyn ForegroundNotifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            inventory,
            terminator,
            foreground,
            overlay,
            permission,
            notifier,
            timeout,
            reported_unavailable: Mutex::new(HashSet::new()),
            overlay_shown: AtomicBool::new(false),
        }
    }

    /// Use one host object for every capability
    pub fn from_host<H>(host: Arc<H>, timeout: Duration) -> Self
    where
        H: AppInventory
            + ProcessTerminator
            + ForegroundInspector
            + OverlayRenderer
            + PermissionBackend
            + ForegroundNotifier
            + 'static,
    {
        Self::new(
            host.clone(),
            host.clone(),
            host.clone(),
            host.clone(),
            host.clone(),
            host,
            timeout,
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Last visibility the renderer accepted
    pub fn overlay_visibility(&self) -> OverlayVisibility {
        if self.overlay_shown.load(Ordering::SeqCst) {
            OverlayVisibility::Shown
        } else {
            OverlayVisibility::Hidden
        }
    }

    async fn call<T>(
        &self,
        capability: Capability,
        fut: impl Future<Output = HostResult<T>>,
    ) -> HostResult<T> {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(HostError::Timeout(capability, self.timeout)),
        };
        if let Err(e) = &result {
            self.report(capability, e);
        }
        result
    }

    fn report(&self, capability: Capability, err: &HostError) {
        if err.is_unavailable() {
            let first = self
                .reported_unavailable
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(capability);
            if first {
                warn!(%capability, "Collaborator unavailable, degrading to no-op");
            } else {
                debug!(%capability, "Collaborator unavailable");
            }
            return;
        }

        match capability {
            // Polled every few seconds; failures are routine
            Capability::ForegroundInspector => debug!(error = %err, "Foreground query failed"),
            _ => warn!(%capability, error = %err, "Collaborator call failed"),
        }
    }

    /// Installed applications; any failure yields an empty list
    pub async fn list_apps(&self) -> Vec<InstalledApp> {
        self.call(Capability::Inventory, self.inventory.list())
            .await
            .unwrap_or_default()
    }

    pub async fn kill(&self, id: &AppId) -> HostResult<()> {
        self.call(Capability::Terminator, self.terminator.kill(id))
            .await
    }

    pub async fn foreground(&self) -> HostResult<AppId> {
        self.call(Capability::ForegroundInspector, self.foreground.current())
            .await
    }

    /// Apply a visibility through the idempotent renderer operation
    ///
    /// Returns the visibility the renderer actually reached. A show without
    /// the overlay permission leaves it hidden.
    pub async fn apply_overlay(
        &self,
        visibility: OverlayVisibility,
    ) -> HostResult<OverlayVisibility> {
        let shown = match visibility {
            OverlayVisibility::Shown => {
                self.call(Capability::OverlayRenderer, self.overlay.show())
                    .await?
            }
            OverlayVisibility::Hidden => {
                self.call(Capability::OverlayRenderer, self.overlay.hide())
                    .await?;
                false
            }
        };
        self.overlay_shown.store(shown, Ordering::SeqCst);
        Ok(self.overlay_visibility())
    }

    /// Permission status; failures count as not granted
    pub async fn permission_granted(&self) -> bool {
        self.call(Capability::Permission, self.permission.is_granted())
            .await
            .unwrap_or(false)
    }

    pub async fn request_permission(&self) -> HostResult<()> {
        self.call(Capability::Permission, self.permission.request_grant())
            .await
    }

    pub async fn start_notifier(&self, config: &NotificationConfig) -> HostResult<()> {
        self.call(Capability::Notifier, self.notifier.start(config))
            .await
    }

    pub async fn stop_notifier(&self) -> HostResult<()> {
        self.call(Capability::Notifier, self.notifier.stop()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_host_api::{MockForeground, MockHost};

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out() {
        let host = Arc::new(MockHost::new());
        host.set_foreground(MockForeground::Hang(
            Duration::from_secs(30),
            AppId::new("game"),
        ));
        let collaborators = Collaborators::from_host(host, Duration::from_secs(2));

        let err = collaborators.foreground().await.unwrap_err();
        assert!(matches!(
            err,
            HostError::Timeout(Capability::ForegroundInspector, _)
        ));
    }

    #[tokio::test]
    async fn inventory_failure_yields_empty_list() {
        let host = Arc::new(MockHost::new().with_apps(vec![InstalledApp::new("Game", "game")]));
        host.set_inventory_failure(true);
        let collaborators = Collaborators::from_host(host, Duration::from_secs(2));

        assert!(collaborators.list_apps().await.is_empty());
    }

    #[tokio::test]
    async fn overlay_visibility_tracks_renderer() {
        let host = Arc::new(MockHost::new());
        let collaborators = Collaborators::from_host(host.clone(), Duration::from_secs(2));
        assert_eq!(collaborators.overlay_visibility(), OverlayVisibility::Hidden);

        let reached = collaborators
            .apply_overlay(OverlayVisibility::Shown)
            .await
            .unwrap();
        assert_eq!(reached, OverlayVisibility::Shown);
        assert_eq!(collaborators.overlay_visibility(), OverlayVisibility::Shown);
        assert_eq!(host.show_calls(), 1);

        collaborators
            .apply_overlay(OverlayVisibility::Hidden)
            .await
            .unwrap();
        assert_eq!(collaborators.overlay_visibility(), OverlayVisibility::Hidden);
    }

    #[tokio::test]
    async fn show_without_permission_stays_hidden() {
        let host = Arc::new(MockHost::new());
        host.set_permission_granted(false);
        let collaborators = Collaborators::from_host(host.clone(), Duration::from_secs(2));

        let reached = collaborators
            .apply_overlay(OverlayVisibility::Shown)
            .await
            .unwrap();
        assert_eq!(reached, OverlayVisibility::Hidden);
        assert_eq!(collaborators.overlay_visibility(), OverlayVisibility::Hidden);
        assert_eq!(host.show_calls(), 1);

        host.set_permission_granted(true);
        collaborators
            .apply_overlay(OverlayVisibility::Shown)
            .await
            .unwrap();
        assert_eq!(collaborators.overlay_visibility(), OverlayVisibility::Shown);
    }

    #[tokio::test]
    async fn unavailable_capability_is_reported_once() {
        let host = Arc::new(MockHost::new());
        host.set_kill_unavailable(true);
        let collaborators = Collaborators::from_host(host, Duration::from_secs(2));

        for _ in 0..3 {
            assert!(collaborators.kill(&AppId::new("x")).await.is_err());
        }
        let reported = collaborators.reported_unavailable.lock().unwrap();
        assert_eq!(reported.len(), 1);
        assert!(reported.contains(&Capability::Terminator));
    }
}
