use focus_util::FocusError;
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine loops are already running")]
    AlreadyRunning,

    #[error(transparent)]
    Planner(#[from] FocusError),
}

pub type EngineResult<T> = Result<T, EngineError>;
