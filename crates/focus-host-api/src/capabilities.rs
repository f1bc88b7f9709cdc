//! Host capabilities model

use serde::{Deserialize, Serialize};
use std::fmt;

/// One collaborator capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Inventory,
    Terminator,
    ForegroundInspector,
    OverlayRenderer,
    Permission,
    Notifier,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::Inventory,
        Capability::Terminator,
        Capability::ForegroundInspector,
        Capability::OverlayRenderer,
        Capability::Permission,
        Capability::Notifier,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Inventory => "app inventory",
            Capability::Terminator => "process terminator",
            Capability::ForegroundInspector => "foreground inspector",
            Capability::OverlayRenderer => "overlay renderer",
            Capability::Permission => "permission backend",
            Capability::Notifier => "foreground notifier",
        };
        f.write_str(name)
    }
}

/// Describes which collaborators a host can actually back
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    pub can_list_apps: bool,
    pub can_kill: bool,
    pub can_inspect_foreground: bool,
    pub can_render_overlay: bool,
    pub can_request_permission: bool,
    pub can_notify: bool,
}

impl HostCapabilities {
    /// Nothing available; every collaborator degrades to a no-op
    pub fn none() -> Self {
        Self::default()
    }

    pub fn full() -> Self {
        Self {
            can_list_apps: true,
            can_kill: true,
            can_inspect_foreground: true,
            can_render_overlay: true,
            can_request_permission: true,
            can_notify: true,
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Inventory => self.can_list_apps,
            Capability::Terminator => self.can_kill,
            Capability::ForegroundInspector => self.can_inspect_foreground,
            Capability::OverlayRenderer => self.can_render_overlay,
            Capability::Permission => self.can_request_permission,
            Capability::Notifier => self.can_notify,
        }
    }

    pub fn missing(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| !self.supports(*c))
            .collect()
    }
}
