//! engine::error
//!
//! Recoverable command failures.
//!
//! Every variant displays as the message a learner sees. None of them
//! change the repository: the engine hands back the state it was given.

use thiserror::Error;

use super::parse::ParseError;
use crate::core::state::StateError;
use crate::merge::conflict::ConflictError;

/// A command that could not run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    State(#[from] StateError),

    /// A git-level refusal that no single state mutator owns, such as a
    /// checkout that would overwrite local changes.
    #[error("{0}")]
    Precondition(String),

    #[error("error: {0}")]
    Conflict(#[from] ConflictError),
}

impl EngineError {
    pub fn precondition(message: impl Into<String>) -> Self {
        EngineError::Precondition(message.into())
    }
}
