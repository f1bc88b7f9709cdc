//! Error types for focusguard

use thiserror::Error;

/// Errors from planner edits and schedule parsing
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("Hour out of range: {0} (expected 0-23)")]
    HourOutOfRange(u8),

    #[error("Invalid day: {0}")]
    InvalidDay(String),
}

pub type Result<T> = std::result::Result<T, FocusError>;
