//! Recorder errors.

use thiserror::Error;

use crate::error::{Effect, Transience};
use crate::ledger::LedgerError;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    #[error("a recording is already active")]
    AlreadyRecording,

    #[error("no recording is active")]
    NotRecording,

    #[error("recording worker terminated abnormally; buffered events lost")]
    WorkerLost,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl TraceError {
    pub fn transience(&self) -> Transience {
        match self {
            // Session-state rejections are synchronous and final.
            TraceError::AlreadyRecording | TraceError::NotRecording => Transience::Permanent,
            TraceError::WorkerLost => Transience::Permanent,
            TraceError::Ledger(e) => e.transience(),
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            TraceError::AlreadyRecording | TraceError::NotRecording => Effect::None,
            TraceError::WorkerLost => Effect::None,
            TraceError::Ledger(e) => e.effect(),
        }
    }
}
