//! Focus-enforcement engine for focusd
//!
//! This crate is the heart of focusd, containing:
//! - Planner state (weekly schedule + restriction set) with snapshot reads
//! - Session evaluation from schedule, wall clock and debug override
//! - The enforcement loop (terminate restricted apps, accrue focus minutes)
//! - The overlay supervisor (show/hide the blocking overlay)
//! - Debug override and overlay permission handling
//!
//! Platform effects go through the collaborator traits in `focus-host-api`;
//! persistence is left to the caller.

mod collaborators;
mod counter;
mod debug;
mod engine;
mod enforcement;
mod error;
mod events;
mod overlay;
mod permission;
mod session;
mod state;

#[cfg(test)]
mod test_support;

pub use collaborators::*;
pub use counter::*;
pub use debug::*;
pub use engine::*;
pub use enforcement::*;
pub use error::*;
pub use events::*;
pub use overlay::*;
pub use permission::*;
pub use session::*;
pub use state::*;
