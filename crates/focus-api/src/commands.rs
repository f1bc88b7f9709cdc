//! Command types for the focusd protocol

use focus_util::{AppId, DayKey};
use serde::{Deserialize, Serialize};

use crate::{API_VERSION, EngineStatus, InstalledApp};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    pub api_version: u32,
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub request_id: u64,
    pub api_version: u32,
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unsupported API version or malformed command
    InvalidRequest,
    /// Hour outside 0..=23
    InvalidSlot,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get current engine status and planner contents
    GetState,

    /// List the installed apps fetched at startup
    ListApps,

    /// Flip one hour slot of the weekly schedule
    ToggleSlot { day: DayKey, hour: u8 },

    /// Flip whether an app is restricted
    ToggleRestriction { app_id: AppId },

    /// Flip the manual debug override
    ToggleDebug,

    /// Re-run the overlay permission request flow
    RequestPermission,

    /// Subscribe to the event stream
    SubscribeEvents,

    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    State(EngineStatus),
    Apps { apps: Vec<InstalledApp> },
    SlotToggled { day: DayKey, hour: u8, scheduled: bool },
    RestrictionToggled { app_id: AppId, restricted: bool },
    DebugToggled { enabled: bool },
    PermissionStatus { granted: bool },
    Subscribed,
    Pong,
}
