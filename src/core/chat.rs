//! Chat model: messages and threads.
//!
//! A message's `id` and `ts` are immutable once written. Encrypted messages
//! carry an opaque envelope in `text` and an empty `refs`; the plaintext is
//! recovered only through the vault.

use serde::{Deserialize, Serialize};

use super::error::CoreError;
use super::identity::{MessageId, RunId, ThreadId, TraceId, UserId};
use super::time::WallClock;

/// How a message came to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    Manual,
    Trace,
    System,
}

impl MessageSource {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageSource::Manual => "manual",
            MessageSource::Trace => "trace",
            MessageSource::System => "system",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "manual" => Ok(MessageSource::Manual),
            "trace" => Ok(MessageSource::Trace),
            "system" => Ok(MessageSource::System),
            other => Err(CoreError::InvalidSource(other.to_string())),
        }
    }
}

/// Rendering and storage gates.
///
/// `publish` only gates public rendering; unpublished messages are fully
/// stored and fully visible to the operator-facing view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFlags {
    pub publish: bool,
    pub encrypted: bool,
}

/// A stored chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub ts: WallClock,
    pub user: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    pub text: String,
    pub refs: Vec<String>,
    pub flags: MessageFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<TraceId>,
    pub source: MessageSource,
}

/// Caller-supplied message before the store assigns `id`/`ts`.
#[derive(Clone, Debug)]
pub struct MessageDraft {
    pub user: UserId,
    pub thread_id: Option<ThreadId>,
    pub text: String,
    pub refs: Vec<String>,
    pub flags: MessageFlags,
    pub trace_id: Option<TraceId>,
    pub source: MessageSource,
}

impl MessageDraft {
    pub fn new(user: UserId, text: impl Into<String>) -> Self {
        Self {
            user,
            thread_id: None,
            text: text.into(),
            refs: Vec::new(),
            flags: MessageFlags::default(),
            trace_id: None,
            source: MessageSource::Manual,
        }
    }

    pub fn in_thread(mut self, thread_id: ThreadId) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    pub fn with_refs(mut self, refs: Vec<String>) -> Self {
        self.refs = refs;
        self
    }

    pub fn encrypted(mut self) -> Self {
        self.flags.encrypted = true;
        self
    }

    pub fn published(mut self) -> Self {
        self.flags.publish = true;
        self
    }
}

/// An optional grouping of messages, optionally anchored to a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: ThreadId,
    pub title: String,
    pub created_at: WallClock,
    pub created_by: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_run: Option<RunId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_roundtrip() {
        for s in [
            MessageSource::Manual,
            MessageSource::Trace,
            MessageSource::System,
        ] {
            assert_eq!(MessageSource::parse(s.as_str()).unwrap(), s);
        }
        assert!(MessageSource::parse("bot").is_err());
    }

    #[test]
    fn draft_builders_set_flags() {
        let user = UserId::new("alice").unwrap();
        let d = MessageDraft::new(user, "hi").encrypted().published();
        assert!(d.flags.encrypted);
        assert!(d.flags.publish);
        assert!(d.thread_id.is_none());
    }
}
