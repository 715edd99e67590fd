//! Core model errors.

use thiserror::Error;

use crate::error::{Effect, Transience};

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),

    #[error("invalid run status: {0}")]
    InvalidStatus(String),

    #[error("invalid message source: {0}")]
    InvalidSource(String),

    #[error("invalid reference kind: {0}")]
    InvalidRefKind(String),
}

impl CoreError {
    /// Validation failures never succeed on retry with the same input.
    pub fn transience(&self) -> Transience {
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

/// Identifier validation failures, one variant per id family.
#[derive(Error, Debug)]
pub enum InvalidId {
    #[error("invalid user id {raw:?}: {reason}")]
    User { raw: String, reason: String },

    #[error("invalid run id {raw:?}: {reason}")]
    Run { raw: String, reason: String },

    #[error("invalid thread id {raw:?}: {reason}")]
    Thread { raw: String, reason: String },

    #[error("invalid trace id {raw:?}: {reason}")]
    Trace { raw: String, reason: String },

    #[error("invalid message id {raw:?}: {reason}")]
    Message { raw: String, reason: String },
}
