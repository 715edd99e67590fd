//! Object/ref store error types.

use thiserror::Error;

use crate::error::{Effect, Transience};

/// Errors from low-level object database and ref operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("failed to open repository at {0}: {1}")]
    OpenRepo(std::path::PathBuf, #[source] git2::Error),

    #[error("failed to write blob: {0}")]
    WriteBlob(#[source] git2::Error),

    #[error("failed to build tree: {0}")]
    BuildTree(#[source] git2::Error),

    #[error("failed to create commit: {0}")]
    Commit(#[source] git2::Error),

    #[error("failed to create tag {name}: {source}")]
    CreateTag {
        name: String,
        #[source]
        source: git2::Error,
    },

    #[error("ref {0} not found")]
    RefNotFound(String),

    #[error("compare-and-swap on {name} exhausted after {attempts} attempts")]
    CasExhausted { name: String, attempts: u32 },

    #[error("expected blob at {0} but found a different object type")]
    NotABlob(String),

    #[error("failed to append note on {target}: {source}")]
    Note {
        target: String,
        #[source]
        source: git2::Error,
    },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
}

impl StoreError {
    /// Whether retrying this operation may succeed.
    pub fn transience(&self) -> Transience {
        match self {
            StoreError::CasExhausted { .. } => Transience::Retryable,
            StoreError::Git(_) => Transience::Unknown,
            _ => Transience::Permanent,
        }
    }

    /// What we know about side effects when this error is returned.
    pub fn effect(&self) -> Effect {
        match self {
            // A lost CAS leaves dangling objects but never a visible ref move.
            StoreError::CasExhausted { .. } => Effect::None,
            StoreError::Git(_) | StoreError::Note { .. } => Effect::Unknown,
            _ => Effect::None,
        }
    }
}

/// Errors from record serialization and deserialization.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
