//! Collaborator trait interfaces for focusguard
//!
//! This crate defines the capability-based interface between the enforcement
//! engine and platform-specific implementations: app inventory, process
//! termination, foreground inspection, overlay rendering, the overlay
//! permission backend and the persistent notifier. It contains no platform
//! code itself.

mod capabilities;
mod mock;
mod traits;

pub use capabilities::*;
pub use mock::*;
pub use traits::*;
