//! Resolver errors.
//!
//! Absence is not an error here: `resolve` returns `Resolution::NotFound`
//! for an unknown entity. Errors are reserved for invalid input (a kind
//! outside the vocabulary passed directly to resolve) and storage failures.

use thiserror::Error;

use crate::chat::ChatError;
use crate::error::{Effect, Transience};
use crate::git::StoreError;
use crate::ledger::LedgerError;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("unknown reference kind: {0}")]
    UnknownKind(String),

    #[error("not a reference: {0}")]
    NotAReference(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl ResolveError {
    pub fn transience(&self) -> Transience {
        match self {
            ResolveError::UnknownKind(_) | ResolveError::NotAReference(_) => Transience::Permanent,
            ResolveError::Store(e) => e.transience(),
            ResolveError::Ledger(e) => e.transience(),
            ResolveError::Chat(e) => e.transience(),
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            ResolveError::UnknownKind(_) | ResolveError::NotAReference(_) => Effect::None,
            ResolveError::Store(e) => e.effect(),
            ResolveError::Ledger(e) => e.effect(),
            ResolveError::Chat(e) => e.effect(),
        }
    }
}
