//! Shared data model and IPC protocol types for focusguard
//!
//! This crate defines:
//! - The planner data model (weekly schedule, restriction set, installed apps)
//! - Commands (requests from clients) and responses
//! - Events (daemon -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
