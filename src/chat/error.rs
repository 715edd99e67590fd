//! Chat store errors.

use thiserror::Error;

use crate::core::{CoreError, RunId, ThreadId};
use crate::error::{Effect, Transience};
use crate::git::StoreError;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ChatError {
    #[error("thread not found: {0}")]
    ThreadNotFound(ThreadId),

    #[error("anchor run {0} does not exist")]
    DanglingAnchor(RunId),

    #[error("vault locked: no encryption key available")]
    VaultLocked,

    #[error("malformed encryption envelope: {0}")]
    MalformedEnvelope(String),

    #[error("decryption failed (wrong key or tampered ciphertext)")]
    DecryptFailed,

    #[error("message is not encrypted")]
    NotEncrypted,

    #[error("primary history has no commit to carry the project anchor")]
    NoAnchorTarget,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ChatError {
    pub fn transience(&self) -> Transience {
        match self {
            ChatError::Store(e) => e.transience(),
            // Unlocking the vault is an operator action, not a retry.
            _ => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            ChatError::Store(e) => e.effect(),
            _ => Effect::None,
        }
    }
}
