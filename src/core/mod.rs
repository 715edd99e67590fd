//! Core data model.
//!
//! Identity atoms, wall-clock time, and the record shapes shared by the
//! ledger, chat, and trace components. Nothing here touches git.

mod chat;
mod error;
mod event;
mod identity;
mod reference;
mod run;
mod time;
mod trace;

pub use chat::{ChatMessage, MessageDraft, MessageFlags, MessageSource, Thread};
pub use error::{CoreError, InvalidId};
pub use event::{EventInput, OpEvent};
pub use identity::{MessageId, RunId, ThreadId, TraceId, UserId};
pub use reference::{RefKind, Reference};
pub use run::{Run, RunAnchor, RunStatus};
pub use time::WallClock;
pub use trace::Trace;
