//! Mock host for testing
//!
//! A single `MockHost` backs every collaborator trait and records the calls
//! it receives, so tests can assert on kills, overlay state and notifier
//! state after driving the engine.

use async_trait::async_trait;
use focus_api::{InstalledApp, NotificationConfig, OverlayVisibility};
use focus_util::AppId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::{
    AppInventory, Capability, ForegroundInspector, ForegroundNotifier, HostError, HostResult,
    OverlayRenderer, PermissionBackend, ProcessTerminator,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What the mock foreground inspector returns
#[derive(Debug, Clone)]
pub enum MockForeground {
    App(AppId),
    Fail(String),
    /// Sleep for the given duration, then return the app
    Hang(Duration, AppId),
    Unavailable,
}

/// Mock host for unit/integration testing
pub struct MockHost {
    apps: Mutex<Vec<InstalledApp>>,
    fail_inventory: Mutex<bool>,

    kills: Mutex<Vec<AppId>>,
    fail_kill_for: Mutex<HashSet<AppId>>,
    kill_unavailable: Mutex<bool>,
    kill_delay: Mutex<Duration>,

    foreground: Mutex<MockForeground>,
    foreground_queries: AtomicUsize,

    overlay: Mutex<OverlayVisibility>,
    show_calls: AtomicUsize,
    hide_calls: AtomicUsize,

    permission_granted: Mutex<bool>,
    permission_requests: AtomicUsize,

    notifier_active: Mutex<bool>,
    notifier_config: Mutex<Option<NotificationConfig>>,
    notifier_stops: AtomicUsize,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            apps: Mutex::new(Vec::new()),
            fail_inventory: Mutex::new(false),
            kills: Mutex::new(Vec::new()),
            fail_kill_for: Mutex::new(HashSet::new()),
            kill_unavailable: Mutex::new(false),
            kill_delay: Mutex::new(Duration::ZERO),
            foreground: Mutex::new(MockForeground::Fail("no foreground app set".into())),
            foreground_queries: AtomicUsize::new(0),
            overlay: Mutex::new(OverlayVisibility::Hidden),
            show_calls: AtomicUsize::new(0),
            hide_calls: AtomicUsize::new(0),
            permission_granted: Mutex::new(true),
            permission_requests: AtomicUsize::new(0),
            notifier_active: Mutex::new(false),
            notifier_config: Mutex::new(None),
            notifier_stops: AtomicUsize::new(0),
        }
    }

    pub fn with_apps(self, apps: Vec<InstalledApp>) -> Self {
        *lock(&self.apps) = apps;
        self
    }

    pub fn set_inventory_failure(&self, fail: bool) {
        *lock(&self.fail_inventory) = fail;
    }

    pub fn set_foreground(&self, foreground: MockForeground) {
        *lock(&self.foreground) = foreground;
    }

    pub fn fail_kill_for(&self, id: impl Into<AppId>) {
        lock(&self.fail_kill_for).insert(id.into());
    }

    pub fn set_kill_unavailable(&self, unavailable: bool) {
        *lock(&self.kill_unavailable) = unavailable;
    }

    /// Make every kill take `delay` after it is recorded
    pub fn set_kill_delay(&self, delay: Duration) {
        *lock(&self.kill_delay) = delay;
    }

    pub fn set_permission_granted(&self, granted: bool) {
        *lock(&self.permission_granted) = granted;
    }

    /// Every kill request received, failures included
    pub fn kills(&self) -> Vec<AppId> {
        lock(&self.kills).clone()
    }

    pub fn clear_kills(&self) {
        lock(&self.kills).clear();
    }

    pub fn overlay(&self) -> OverlayVisibility {
        *lock(&self.overlay)
    }

    pub fn show_calls(&self) -> usize {
        self.show_calls.load(Ordering::SeqCst)
    }

    pub fn hide_calls(&self) -> usize {
        self.hide_calls.load(Ordering::SeqCst)
    }

    pub fn foreground_queries(&self) -> usize {
        self.foreground_queries.load(Ordering::SeqCst)
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    pub fn notifier_active(&self) -> bool {
        *lock(&self.notifier_active)
    }

    pub fn notifier_config(&self) -> Option<NotificationConfig> {
        lock(&self.notifier_config).clone()
    }

    pub fn notifier_stops(&self) -> usize {
        self.notifier_stops.load(Ordering::SeqCst)
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppInventory for MockHost {
    async fn list(&self) -> HostResult<Vec<InstalledApp>> {
        if *lock(&self.fail_inventory) {
            return Err(HostError::call_failed(Capability::Inventory, "mock inventory failure"));
        }
        Ok(lock(&self.apps).clone())
    }
}

#[async_trait]
impl ProcessTerminator for MockHost {
    async fn kill(&self, id: &AppId) -> HostResult<()> {
        if *lock(&self.kill_unavailable) {
            return Err(HostError::Unavailable(Capability::Terminator));
        }
        lock(&self.kills).push(id.clone());
        let delay = *lock(&self.kill_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if lock(&self.fail_kill_for).contains(id) {
            return Err(HostError::call_failed(
                Capability::Terminator,
                format!("mock kill failure for {}", id),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ForegroundInspector for MockHost {
    async fn current(&self) -> HostResult<AppId> {
        self.foreground_queries.fetch_add(1, Ordering::SeqCst);
        let foreground = lock(&self.foreground).clone();
        match foreground {
            MockForeground::App(id) => Ok(id),
            MockForeground::Fail(message) => Err(HostError::call_failed(
                Capability::ForegroundInspector,
                message,
            )),
            MockForeground::Hang(delay, id) => {
                tokio::time::sleep(delay).await;
                Ok(id)
            }
            MockForeground::Unavailable => {
                Err(HostError::Unavailable(Capability::ForegroundInspector))
            }
        }
    }
}

#[async_trait]
impl OverlayRenderer for MockHost {
    async fn show(&self) -> HostResult<bool> {
        self.show_calls.fetch_add(1, Ordering::SeqCst);
        let granted = *lock(&self.permission_granted);
        if granted {
            *lock(&self.overlay) = OverlayVisibility::Shown;
        }
        Ok(granted)
    }

    async fn hide(&self) -> HostResult<()> {
        self.hide_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.overlay) = OverlayVisibility::Hidden;
        Ok(())
    }
}

#[async_trait]
impl PermissionBackend for MockHost {
    async fn is_granted(&self) -> HostResult<bool> {
        Ok(*lock(&self.permission_granted))
    }

    async fn request_grant(&self) -> HostResult<()> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ForegroundNotifier for MockHost {
    async fn start(&self, config: &NotificationConfig) -> HostResult<()> {
        *lock(&self.notifier_active) = true;
        *lock(&self.notifier_config) = Some(config.clone());
        Ok(())
    }

    async fn stop(&self) -> HostResult<()> {
        *lock(&self.notifier_active) = false;
        self.notifier_stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
