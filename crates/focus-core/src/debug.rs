//! Debug override controller

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use crate::{EngineContext, EngineEvent, sweep_restricted};
use focus_api::OverlayVisibility;

/// Manual switch forcing a session regardless of the schedule
#[derive(Debug, Default)]
pub struct DebugOverride(AtomicBool);

impl DebugOverride {
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }

    /// Flip the flag, returning the new value
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
}

/// Flip the debug override and apply its effects immediately
///
/// Turning it on starts the notifier, shows the overlay and sweeps every
/// restricted app without waiting for the next enforcement tick. Turning it
/// off hides the overlay and stops the notifier. The schedule is never read
/// or written here.
pub(crate) async fn toggle_debug(ctx: &EngineContext) -> bool {
    let guard = ctx.debug_lock.lock().await;

    let enabled = ctx.debug.toggle();
    info!(enabled, "Debug override toggled");
    ctx.emit(EngineEvent::DebugOverrideChanged { enabled });

    if !enabled {
        let _ = ctx.host.apply_overlay(OverlayVisibility::Hidden).await;
        let _ = ctx.host.stop_notifier().await;
        return false;
    }

    let _ = ctx.host.start_notifier(&ctx.notification).await;
    let _ = ctx.host.apply_overlay(OverlayVisibility::Shown).await;
    let planner = ctx.planner.snapshot();

    // Kills can be slow; the overlay supervisor must keep its cadence
    drop(guard);
    sweep_restricted(ctx, &planner.restricted).await;

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OverlaySupervisor;
    use crate::test_support::{context, monday_at};
    use focus_host_api::MockHost;
    use focus_util::AppId;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn toggle_returns_new_value() {
        let flag = DebugOverride::default();
        assert!(!flag.is_enabled());
        assert!(flag.toggle());
        assert!(flag.is_enabled());
        assert!(!flag.toggle());
        assert!(!flag.is_enabled());
    }

    #[tokio::test]
    async fn enabling_shows_overlay_and_kills_immediately() {
        let host = Arc::new(MockHost::new());
        let ctx = context(host.clone(), 60);
        ctx.planner.toggle_restriction(AppId::new("x"));
        ctx.planner.toggle_restriction(AppId::new("y"));

        assert!(toggle_debug(&ctx).await);

        assert_eq!(host.overlay(), OverlayVisibility::Shown);
        assert!(host.notifier_active());
        assert_eq!(
            host.notifier_config().map(|c| c.title),
            Some("Focus Mode Active".to_string())
        );
        let mut kills = host.kills();
        kills.sort();
        assert_eq!(kills, vec![AppId::new("x"), AppId::new("y")]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_kills_do_not_stall_overlay_ticks() {
        let host = Arc::new(MockHost::new());
        host.set_kill_delay(Duration::from_millis(1500));
        let ctx = context(host.clone(), 60);
        for n in 0..10 {
            ctx.planner.toggle_restriction(AppId::new(format!("app{n}")));
        }

        let sweep = {
            let ctx = ctx.clone();
            tokio::spawn(async move { toggle_debug(&ctx).await })
        };
        while host.kills().is_empty() {
            tokio::task::yield_now().await;
        }

        let mut supervisor = OverlaySupervisor::new(ctx.clone());
        let visibility = tokio::time::timeout(
            Duration::from_millis(100),
            supervisor.tick(monday_at(12, 0)),
        )
        .await
        .expect("overlay tick blocked behind the sweep");
        assert_eq!(visibility, OverlayVisibility::Shown);
        assert!(!sweep.is_finished());

        assert!(sweep.await.unwrap());
        assert_eq!(host.kills().len(), 10);
    }

    #[tokio::test]
    async fn disabling_hides_overlay_and_stops_notifier() {
        let host = Arc::new(MockHost::new());
        let ctx = context(host.clone(), 60);

        toggle_debug(&ctx).await;
        assert_eq!(host.overlay(), OverlayVisibility::Shown);

        assert!(!toggle_debug(&ctx).await);
        assert_eq!(host.overlay(), OverlayVisibility::Hidden);
        assert!(!host.notifier_active());
        assert_eq!(host.notifier_stops(), 1);
        assert_eq!(ctx.host.overlay_visibility(), OverlayVisibility::Hidden);
    }

    #[tokio::test]
    async fn toggling_never_touches_schedule() {
        let host = Arc::new(MockHost::new());
        let ctx = context(host, 60);
        ctx.planner
            .toggle_slot(focus_util::DayKey::Wednesday, 14)
            .unwrap();
        let before = ctx.planner.snapshot();

        toggle_debug(&ctx).await;
        toggle_debug(&ctx).await;

        assert_eq!(ctx.planner.snapshot().schedule, before.schedule);
    }
}
