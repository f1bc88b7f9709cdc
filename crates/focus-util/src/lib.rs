//! Shared utilities for focusguard
//!
//! This crate provides:
//! - ID types (AppId, ClientId)
//! - Wall-clock helpers and the weekday key used by the schedule grid
//! - Error types
//! - Default paths for socket, config, data, and log directories

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
