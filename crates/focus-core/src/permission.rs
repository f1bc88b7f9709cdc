//! Overlay permission gate

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::{EngineContext, EngineEvent};

/// Last known overlay permission status
///
/// Feeds an indicator only; the loops call the renderer unconditionally.
#[derive(Debug, Default)]
pub struct PermissionGate {
    granted: AtomicBool,
}

impl PermissionGate {
    pub fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn record(&self, ctx: &EngineContext, granted: bool) {
        let previous = self.granted.swap(granted, Ordering::SeqCst);
        if previous != granted {
            info!(granted, "Overlay permission status changed");
            ctx.emit(EngineEvent::PermissionChanged { granted });
        }
    }
}

/// Startup check: query the backend and start the grant flow if needed
pub(crate) async fn check_permission(ctx: &EngineContext) -> bool {
    let granted = refresh_permission(ctx).await;
    if !granted {
        warn!("Overlay permission not granted, requesting it");
        let _ = ctx.host.request_permission().await;
    }
    granted
}

/// Re-poll the backend
pub(crate) async fn refresh_permission(ctx: &EngineContext) -> bool {
    let granted = ctx.host.permission_granted().await;
    ctx.permission.record(ctx, granted);
    granted
}

pub(crate) async fn request_permission(ctx: &EngineContext) -> bool {
    if refresh_permission(ctx).await {
        return true;
    }
    let _ = ctx.host.request_permission().await;
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;
    use focus_host_api::MockHost;
    use std::sync::Arc;

    #[tokio::test]
    async fn granted_at_startup_does_not_request() {
        let host = Arc::new(MockHost::new());
        let ctx = context(host.clone(), 60);

        assert!(check_permission(&ctx).await);
        assert!(ctx.permission.is_granted());
        assert_eq!(host.permission_requests(), 0);
    }

    #[tokio::test]
    async fn missing_permission_triggers_request_and_later_poll_sees_grant() {
        let host = Arc::new(MockHost::new());
        host.set_permission_granted(false);
        let ctx = context(host.clone(), 60);
        let mut events = ctx.subscribe();

        assert!(!check_permission(&ctx).await);
        assert!(!ctx.permission.is_granted());
        assert_eq!(host.permission_requests(), 1);

        host.set_permission_granted(true);
        assert!(refresh_permission(&ctx).await);
        assert!(ctx.permission.is_granted());
        assert_eq!(
            events.try_recv().ok(),
            Some(EngineEvent::PermissionChanged { granted: true })
        );
    }
}
