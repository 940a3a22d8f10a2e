use std::path::PathBuf;

use thiserror::Error;

use crate::types::PlayerNumber;

/// Failures reported by a simulation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("scenario {0} not found")]
    ScenarioNotFound(String),
    #[error("scenario {path} is malformed: {reason}")]
    ScenarioMalformed { path: PathBuf, reason: String },
    #[error("scenario has no map named {0:?}")]
    UnknownMap(String),
    #[error("no player {0} in this episode")]
    UnknownPlayer(PlayerNumber),
    #[error("engine has not been launched")]
    NotLaunched,
    #[error("engine crashed: {0}")]
    Crashed(String),
}

impl EngineError {
    /// Whether the error points at a missing or malformed resource rather
    /// than at the engine process itself.
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            EngineError::ScenarioNotFound(_)
                | EngineError::ScenarioMalformed { .. }
                | EngineError::UnknownMap(_)
        )
    }
}
