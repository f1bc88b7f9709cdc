//! Overlay supervisor
//!
//! Fine-grained periodic task deciding whether the blocking overlay should
//! cover the foreground application. Every tick recomputes the target and
//! applies it, so a missed or failed call heals on the next tick.

use chrono::{DateTime, Local};
use focus_api::OverlayVisibility;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{EngineContext, EngineEvent, is_session_active};

pub struct OverlaySupervisor {
    ctx: Arc<EngineContext>,
    last_visibility: Option<OverlayVisibility>,
}

impl OverlaySupervisor {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self {
            ctx,
            last_visibility: None,
        }
    }

    /// Target visibility at `now`
    ///
    /// Any foreground inspector failure or timeout hides the overlay.
    pub async fn decide(&self, now: DateTime<Local>) -> OverlayVisibility {
        if self.ctx.debug.is_enabled() {
            return OverlayVisibility::Shown;
        }

        let planner = self.ctx.planner.snapshot();
        if !is_session_active(&planner, false, &now) {
            return OverlayVisibility::Hidden;
        }

        match self.ctx.host.foreground().await {
            Ok(id) if planner.restricted.contains(&id) => {
                debug!(app_id = %id, "Restricted app in foreground");
                OverlayVisibility::Shown
            }
            Ok(_) | Err(_) => OverlayVisibility::Hidden,
        }
    }

    /// Decide and apply; returns the visibility the renderer reached
    pub async fn tick(&mut self, now: DateTime<Local>) -> OverlayVisibility {
        // Serialized with debug toggles so a stale decision never lands after one
        let _guard = self.ctx.debug_lock.lock().await;

        let target = self.decide(now).await;
        let visibility = match self.ctx.host.apply_overlay(target).await {
            Ok(reached) => reached,
            Err(_) => self.ctx.host.overlay_visibility(),
        };

        if self.last_visibility != Some(visibility) {
            debug!(?visibility, "Overlay visibility changed");
            self.last_visibility = Some(visibility);
            self.ctx.emit(EngineEvent::OverlayChanged { visibility });
        }
        visibility
    }

    /// Tick every `period` until `cancel` fires
    pub async fn run(mut self, period: Duration, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(period_ms = period.as_millis() as u64, "Overlay supervisor started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick(focus_util::now()).await;
                }
            }
        }
        debug!("Overlay supervisor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, monday_at};
    use focus_host_api::{MockForeground, MockHost};
    use focus_util::{AppId, DayKey};

    fn restricted_monday_nine(host: Arc<MockHost>) -> Arc<EngineContext> {
        let ctx = context(host, 60);
        ctx.planner.toggle_slot(DayKey::Monday, 9).unwrap();
        ctx.planner.toggle_restriction(AppId::new("game"));
        ctx
    }

    #[tokio::test]
    async fn restricted_foreground_shows_overlay() {
        let host = Arc::new(MockHost::new());
        host.set_foreground(MockForeground::App(AppId::new("game")));
        let ctx = restricted_monday_nine(host.clone());

        let mut supervisor = OverlaySupervisor::new(ctx);
        assert_eq!(
            supervisor.tick(monday_at(9, 30)).await,
            OverlayVisibility::Shown
        );
        assert_eq!(host.overlay(), OverlayVisibility::Shown);
    }

    #[tokio::test]
    async fn missing_permission_reports_hidden() {
        let host = Arc::new(MockHost::new());
        host.set_foreground(MockForeground::App(AppId::new("game")));
        host.set_permission_granted(false);
        let ctx = restricted_monday_nine(host.clone());
        let mut events = ctx.subscribe();

        let mut supervisor = OverlaySupervisor::new(ctx.clone());
        assert_eq!(
            supervisor.tick(monday_at(9, 30)).await,
            OverlayVisibility::Hidden
        );
        assert_eq!(host.show_calls(), 1);
        assert_eq!(ctx.host.overlay_visibility(), OverlayVisibility::Hidden);
        assert!(matches!(
            events.try_recv(),
            Ok(EngineEvent::OverlayChanged {
                visibility: OverlayVisibility::Hidden
            })
        ));
    }

    #[tokio::test]
    async fn unrestricted_foreground_hides_overlay() {
        let host = Arc::new(MockHost::new());
        host.set_foreground(MockForeground::App(AppId::new("game")));
        let ctx = restricted_monday_nine(host.clone());
        let mut supervisor = OverlaySupervisor::new(ctx);
        supervisor.tick(monday_at(9, 30)).await;

        host.set_foreground(MockForeground::App(AppId::new("editor")));
        assert_eq!(
            supervisor.tick(monday_at(9, 31)).await,
            OverlayVisibility::Hidden
        );
        assert_eq!(host.overlay(), OverlayVisibility::Hidden);
    }

    #[tokio::test]
    async fn inspector_error_fails_open() {
        let host = Arc::new(MockHost::new());
        host.set_foreground(MockForeground::Fail("usage stats denied".into()));
        let ctx = restricted_monday_nine(host.clone());

        let mut supervisor = OverlaySupervisor::new(ctx);
        assert_eq!(
            supervisor.tick(monday_at(9, 30)).await,
            OverlayVisibility::Hidden
        );
        assert_eq!(host.overlay(), OverlayVisibility::Hidden);
    }

    #[tokio::test(start_paused = true)]
    async fn inspector_hang_fails_open() {
        let host = Arc::new(MockHost::new());
        host.set_foreground(MockForeground::Hang(
            Duration::from_secs(60),
            AppId::new("game"),
        ));
        let ctx = restricted_monday_nine(host.clone());

        let mut supervisor = OverlaySupervisor::new(ctx);
        assert_eq!(
            supervisor.tick(monday_at(9, 30)).await,
            OverlayVisibility::Hidden
        );
    }

    #[tokio::test]
    async fn outside_session_skips_inspector() {
        let host = Arc::new(MockHost::new());
        host.set_foreground(MockForeground::App(AppId::new("game")));
        let ctx = restricted_monday_nine(host.clone());

        let mut supervisor = OverlaySupervisor::new(ctx);
        assert_eq!(
            supervisor.tick(monday_at(11, 0)).await,
            OverlayVisibility::Hidden
        );
        assert_eq!(host.foreground_queries(), 0);
        assert_eq!(host.hide_calls(), 1);
    }

    #[tokio::test]
    async fn debug_override_shows_without_inspecting() {
        let host = Arc::new(MockHost::new());
        let ctx = context(host.clone(), 60);
        ctx.debug.set(true);

        let mut supervisor = OverlaySupervisor::new(ctx);
        assert_eq!(
            supervisor.tick(monday_at(2, 0)).await,
            OverlayVisibility::Shown
        );
        assert_eq!(host.foreground_queries(), 0);
    }

    #[tokio::test]
    async fn renderer_called_every_tick_but_event_only_on_change() {
        let host = Arc::new(MockHost::new());
        let ctx = context(host.clone(), 60);
        let mut events = ctx.subscribe();
        let mut supervisor = OverlaySupervisor::new(ctx);

        for minute in 0..3 {
            supervisor.tick(monday_at(11, minute)).await;
        }
        assert_eq!(host.hide_calls(), 3);

        let mut changes = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, EngineEvent::OverlayChanged { .. }) {
                changes += 1;
            }
        }
        assert_eq!(changes, 1);
    }
}
