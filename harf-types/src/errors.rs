use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// User-facing failures of room commands. `Storage` is the only variant
/// produced by infrastructure; everything else is a rule violation the
/// caller can act on without retrying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Error)]
#[ts(export)]
pub enum RoomError {
    #[error("room not found")]
    RoomNotFound,
    #[error("round not found")]
    RoundNotFound,
    #[error("player not found")]
    PlayerNotFound,
    #[error("session token is missing or expired")]
    InvalidSession,
    #[error("a round is already active in this room")]
    RoundAlreadyActive,
    #[error("only the host can start a round")]
    NotHost,
    #[error("answer already submitted for category {category}")]
    DuplicateAnswer { category: String },
    #[error("invalid submission: {reason}")]
    InvalidSubmission { reason: String },
    #[error("storage failure: {message}")]
    Storage { message: String },
}

impl RoomError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        RoomError::Storage {
            message: err.to_string(),
        }
    }
}
