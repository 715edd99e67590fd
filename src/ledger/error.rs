//! Ledger service errors.

use thiserror::Error;

use crate::core::{CoreError, RunId, TraceId};
use crate::error::{Effect, Transience};
use crate::git::StoreError;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("run not found: {0}")]
    RunNotFound(RunId),

    #[error("trace not found: {0}")]
    TraceNotFound(TraceId),

    #[error("run {0} is closed; its event log is immutable")]
    RunClosed(RunId),

    #[error("primary history has no commits to anchor against")]
    NoPrimaryHead,

    #[error("anchor tag already exists for run {0}")]
    AnchorExists(RunId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl LedgerError {
    pub fn transience(&self) -> Transience {
        match self {
            LedgerError::Store(e) => e.transience(),
            _ => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            LedgerError::Store(e) => e.effect(),
            _ => Effect::None,
        }
    }
}
