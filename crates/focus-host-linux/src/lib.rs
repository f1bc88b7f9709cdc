//! Linux collaborators for focusd
//!
//! Provides:
//! - App inventory from XDG `.desktop` entries
//! - Best-effort termination by scanning `/proc` and sending SIGTERM
//! - Foreground app detection through the sway IPC tree
//! - A blocking overlay backed by a configurable fullscreen command
//! - A persistent desktop notification via `notify-send`
//! - Capability detection so missing tools degrade to no-ops

mod adapter;
mod command;
mod foreground;
mod inventory;
mod notifier;
mod overlay;
mod process;

pub use adapter::*;
pub use command::*;
pub use foreground::*;
pub use inventory::*;
pub use notifier::*;
pub use overlay::*;
pub use process::*;
