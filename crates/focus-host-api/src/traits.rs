//! Collaborator traits

use async_trait::async_trait;
use focus_api::{InstalledApp, NotificationConfig};
use focus_util::AppId;
use std::time::Duration;
use thiserror::Error;

use crate::Capability;

/// Errors from collaborator calls
#[derive(Debug, Error)]
pub enum HostError {
    /// The capability does not exist on the running platform
    #[error("{0} is unavailable on this host")]
    Unavailable(Capability),

    /// A single call failed
    #[error("{capability} call failed: {message}")]
    CallFailed {
        capability: Capability,
        message: String,
    },

    #[error("{0} call timed out after {1:?}")]
    Timeout(Capability, Duration),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    pub fn call_failed(capability: Capability, message: impl Into<String>) -> Self {
        Self::CallFailed {
            capability,
            message: message.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, HostError::Unavailable(_))
    }
}

pub type HostResult<T> = Result<T, HostError>;

/// Enumerates installed applications
#[async_trait]
pub trait AppInventory: Send + Sync {
    async fn list(&self) -> HostResult<Vec<InstalledApp>>;
}

/// Best-effort termination of a running application
///
/// Implementations may silently do nothing for protected processes.
#[async_trait]
pub trait ProcessTerminator: Send + Sync {
    async fn kill(&self, id: &AppId) -> HostResult<()>;
}

/// Reports the application currently in the foreground
#[async_trait]
pub trait ForegroundInspector: Send + Sync {
    async fn current(&self) -> HostResult<AppId>;
}

/// Full-screen blocking surface
///
/// Both operations are idempotent and must no-op when the overlay
/// permission has not been granted.
#[async_trait]
pub trait OverlayRenderer: Send + Sync {
    /// Returns whether the overlay is on screen afterwards
    async fn show(&self) -> HostResult<bool>;
    async fn hide(&self) -> HostResult<()>;
}

/// Backend for the special permission the overlay needs
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    async fn is_granted(&self) -> HostResult<bool>;

    /// Start the external grant flow; the outcome is only visible on a later poll
    async fn request_grant(&self) -> HostResult<()>;
}

/// Persistent notification keeping the host process visible
#[async_trait]
pub trait ForegroundNotifier: Send + Sync {
    async fn start(&self, config: &NotificationConfig) -> HostResult<()>;
    async fn stop(&self) -> HostResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_capability() {
        let err = HostError::call_failed(Capability::Terminator, "no such process");
        assert_eq!(err.to_string(), "process terminator call failed: no such process");

        let err = HostError::Unavailable(Capability::ForegroundInspector);
        assert!(err.is_unavailable());
        assert_eq!(err.to_string(), "foreground inspector is unavailable on this host");
    }
}
