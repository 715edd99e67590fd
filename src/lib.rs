#![forbid(unsafe_code)]

pub mod api;
pub mod chat;
pub mod config;
pub mod core;
pub mod error;
pub mod git;
pub mod ledger;
pub mod resolve;
pub mod telemetry;
pub mod trace;

pub use api::OpsLedger;
pub use error::{Effect, Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export core types at crate root for convenience
pub use crate::core::{
    ChatMessage, EventInput, MessageDraft, MessageFlags, MessageId, MessageSource, OpEvent,
    RefKind, Reference, Run, RunAnchor, RunId, RunStatus, Thread, ThreadId, Trace, TraceId,
    UserId, WallClock,
};
