//! Engine lifecycle and control path

use chrono::{DateTime, Local};
use focus_api::{API_VERSION, EngineStatus, InstalledApp, NotificationConfig, PlannerSnapshot};
use focus_config::{EngineConfig, RestrictionsConfig};
use focus_util::{AppId, DayKey};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    Collaborators, DebugOverride, EngineError, EngineEvent, EngineResult, EnforcementLoop,
    FocusCounter, OverlaySupervisor, PermissionGate, PlannerState, check_permission,
    is_session_active, refresh_permission, request_permission, toggle_debug,
};

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// State shared by the loops and the control path
pub struct EngineContext {
    pub config: EngineConfig,
    pub notification: NotificationConfig,
    pub planner: PlannerState,
    pub debug: DebugOverride,
    pub counter: FocusCounter,
    pub permission: PermissionGate,
    pub host: Collaborators,
    /// Serializes debug toggles with overlay decisions
    pub(crate) debug_lock: tokio::sync::Mutex<()>,
    inventory: RwLock<Vec<InstalledApp>>,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineContext {
    pub fn new(config: EngineConfig, notification: NotificationConfig, host: Collaborators) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            notification,
            planner: PlannerState::new(),
            debug: DebugOverride::default(),
            counter: FocusCounter::new(config.daily_target),
            permission: PermissionGate::default(),
            host,
            debug_lock: tokio::sync::Mutex::new(()),
            inventory: RwLock::new(Vec::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

struct RunningLoops {
    cancel: CancellationToken,
    enforcement: JoinHandle<()>,
    overlay: JoinHandle<()>,
}

/// The focus-enforcement engine
///
/// Owns the shared planner state and, between [`start`](Self::start) and
/// [`stop`](Self::stop), the two periodic tasks.
pub struct FocusEngine {
    ctx: Arc<EngineContext>,
    running: Mutex<Option<RunningLoops>>,
}

impl FocusEngine {
    pub fn new(config: EngineConfig, notification: NotificationConfig, host: Collaborators) -> Self {
        info!(
            enforcement_secs = config.enforcement_interval.as_secs(),
            overlay_secs = config.overlay_interval.as_secs(),
            daily_target = config.daily_target,
            "Focus engine initialized"
        );
        Self {
            ctx: Arc::new(EngineContext::new(config, notification, host)),
            running: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.ctx
    }

    pub fn planner(&self) -> &PlannerState {
        &self.ctx.planner
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.ctx.subscribe()
    }

    /// Load the inventory once and seed the restriction set from it
    ///
    /// An inventory failure is treated as an empty list. Seeding is skipped
    /// when persisted state was already installed.
    pub async fn load_inventory(&self, restrictions: &RestrictionsConfig) -> Option<usize> {
        let apps = self.ctx.host.list_apps().await;
        info!(count = apps.len(), "App inventory loaded");

        let seeded = self.ctx.planner.seed_restrictions(
            &apps,
            &restrictions.allow_list,
            &restrictions.system_prefixes,
        );
        *self
            .ctx
            .inventory
            .write()
            .unwrap_or_else(PoisonError::into_inner) = apps;
        seeded
    }

    /// Inventory captured by [`load_inventory`](Self::load_inventory)
    pub fn installed_apps(&self) -> Vec<InstalledApp> {
        self.ctx
            .inventory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Spawn both loops; must be called within a tokio runtime
    pub fn start(&self) -> EngineResult<()> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            return Err(EngineError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let enforcement = tokio::spawn(
            EnforcementLoop::new(self.ctx.clone())
                .run(self.ctx.config.enforcement_interval, cancel.clone()),
        );
        let overlay = tokio::spawn(
            OverlaySupervisor::new(self.ctx.clone())
                .run(self.ctx.config.overlay_interval, cancel.clone()),
        );

        *running = Some(RunningLoops {
            cancel,
            enforcement,
            overlay,
        });
        info!("Focus engine started");
        Ok(())
    }

    /// Cancel both loops and wait for them to exit
    ///
    /// A tick already in progress runs to completion first. Stopping an
    /// engine that is not running does nothing.
    pub async fn stop(&self) {
        let loops = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(loops) = loops else {
            return;
        };

        loops.cancel.cancel();
        for (name, handle) in [("enforcement", loops.enforcement), ("overlay", loops.overlay)] {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "Engine task ended abnormally");
            }
        }
        info!("Focus engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn snapshot(&self) -> Arc<PlannerSnapshot> {
        self.ctx.planner.snapshot()
    }

    pub fn toggle_slot(&self, day: DayKey, hour: u8) -> EngineResult<bool> {
        Ok(self.ctx.planner.toggle_slot(day, hour)?)
    }

    pub fn toggle_restriction(&self, id: AppId) -> bool {
        self.ctx.planner.toggle_restriction(id)
    }

    pub async fn toggle_debug(&self) -> bool {
        toggle_debug(&self.ctx).await
    }

    pub fn debug_enabled(&self) -> bool {
        self.ctx.debug.is_enabled()
    }

    /// Startup permission check; requests the grant when missing
    pub async fn check_permission(&self) -> bool {
        check_permission(&self.ctx).await
    }

    pub async fn refresh_permission(&self) -> bool {
        refresh_permission(&self.ctx).await
    }

    /// Re-poll, and start the grant flow if still not granted
    pub async fn request_permission(&self) -> bool {
        request_permission(&self.ctx).await
    }

    /// Hide the overlay and stop the notifier, used on shutdown
    pub async fn release_host(&self) {
        let _ = self
            .ctx
            .host
            .apply_overlay(focus_api::OverlayVisibility::Hidden)
            .await;
        if self.ctx.debug.is_enabled() {
            let _ = self.ctx.host.stop_notifier().await;
        }
    }

    pub fn restore_focus_minutes(&self, day: chrono::NaiveDate, minutes: u32) {
        self.ctx.counter.restore(day, minutes);
    }

    pub fn status(&self, now: DateTime<Local>) -> EngineStatus {
        let planner = self.ctx.planner.snapshot();
        let debug_override = self.ctx.debug.is_enabled();

        EngineStatus {
            api_version: API_VERSION,
            running: self.is_running(),
            session_active: is_session_active(&planner, debug_override, &now),
            debug_override,
            overlay: self.ctx.host.overlay_visibility(),
            focus_minutes: self.ctx.counter.minutes_on(now.date_naive()),
            daily_target: self.ctx.counter.target(),
            permission_granted: self.ctx.permission.is_granted(),
            planner: PlannerSnapshot::clone(&planner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::monday_at;
    use focus_api::OverlayVisibility;
    use focus_host_api::MockHost;
    use std::time::Duration;

    fn engine(host: Arc<MockHost>) -> FocusEngine {
        let config = EngineConfig {
            enforcement_interval: Duration::from_secs(60),
            overlay_interval: Duration::from_secs(3),
            collaborator_timeout: Duration::from_secs(2),
            daily_target: 60,
        };
        FocusEngine::new(
            config,
            NotificationConfig::default(),
            Collaborators::from_host(host, config.collaborator_timeout),
        )
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let engine = engine(Arc::new(MockHost::new()));
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(EngineError::AlreadyRunning)));
        engine.stop().await;
        assert!(!engine.is_running());

        engine.start().unwrap();
        engine.stop().await;
    }

    #[tokio::test]
    async fn stop_without_start_is_noop() {
        let engine = engine(Arc::new(MockHost::new()));
        engine.stop().await;
        assert!(!engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn loops_enforce_while_debug_is_on() {
        let host = Arc::new(MockHost::new());
        let engine = engine(host.clone());
        engine.toggle_restriction(AppId::new("game"));
        engine.toggle_debug().await;
        host.clear_kills();

        engine.start().unwrap();
        tokio::time::sleep(Duration::from_secs(125)).await;
        engine.stop().await;

        // Ticks at t=0, 60 and 120
        assert_eq!(host.kills().len(), 3);
        assert_eq!(host.overlay(), OverlayVisibility::Shown);
        let today = focus_util::now().date_naive();
        assert_eq!(engine.context().counter.minutes_on(today), 3);
    }

    #[tokio::test]
    async fn load_inventory_seeds_once() {
        let host = Arc::new(MockHost::new().with_apps(vec![
            InstalledApp::new("Game", "org.example.game"),
            InstalledApp::new("Dialer", "com.android.dialer"),
        ]));
        let engine = engine(host);
        let restrictions = RestrictionsConfig {
            allow_list: Default::default(),
            system_prefixes: vec!["com.android".into()],
        };

        assert_eq!(engine.load_inventory(&restrictions).await, Some(1));
        assert_eq!(engine.installed_apps().len(), 2);
        assert_eq!(engine.load_inventory(&restrictions).await, None);
    }

    #[tokio::test]
    async fn status_reflects_state() {
        let host = Arc::new(MockHost::new());
        let engine = engine(host);
        engine.toggle_slot(DayKey::Monday, 9).unwrap();
        engine.check_permission().await;

        let status = engine.status(monday_at(9, 15));
        assert!(status.session_active);
        assert!(!status.debug_override);
        assert!(!status.running);
        assert!(status.permission_granted);
        assert_eq!(status.daily_target, 60);
        assert_eq!(status.overlay, OverlayVisibility::Hidden);
        assert!(status.planner.schedule.contains(DayKey::Monday, 9));

        assert!(!engine.status(monday_at(10, 15)).session_active);
    }

    #[tokio::test]
    async fn status_overlay_follows_renderer_not_request() {
        let host = Arc::new(MockHost::new());
        host.set_permission_granted(false);
        let engine = engine(host.clone());

        assert!(engine.toggle_debug().await);
        let status = engine.status(monday_at(9, 15));
        assert!(status.debug_override);
        assert_eq!(status.overlay, OverlayVisibility::Hidden);
        assert_eq!(host.show_calls(), 1);
    }

    #[tokio::test]
    async fn release_host_hides_overlay() {
        let host = Arc::new(MockHost::new());
        let engine = engine(host.clone());
        engine.toggle_debug().await;
        assert_eq!(host.overlay(), OverlayVisibility::Shown);

        engine.release_host().await;
        assert_eq!(host.overlay(), OverlayVisibility::Hidden);
        assert!(!host.notifier_active());
    }
}
