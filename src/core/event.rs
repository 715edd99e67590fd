//! Operational event record.
//!
//! One shape serves both the run event log (`events.jsonl`) and buffered
//! trace events; the ledger and the recorder persist the same fields.

use serde::{Deserialize, Serialize};

use super::time::WallClock;

/// A single operational event: `{seq, ts, type, target, result, duration, detail?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpEvent {
    pub seq: u64,
    pub ts: WallClock,
    #[serde(rename = "type")]
    pub event_type: String,
    pub target: String,
    pub result: String,
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Caller-supplied event payload before the ledger/recorder assigns `seq`/`ts`.
#[derive(Clone, Debug)]
pub struct EventInput {
    pub event_type: String,
    pub target: String,
    pub result: String,
    pub duration: u64,
    pub detail: Option<String>,
}

impl EventInput {
    pub fn new(
        event_type: impl Into<String>,
        target: impl Into<String>,
        result: impl Into<String>,
        duration: u64,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            target: target.into(),
            result: result.into(),
            duration,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn stamp(self, seq: u64, ts: WallClock) -> OpEvent {
        OpEvent {
            seq,
            ts,
            event_type: self.event_type,
            target: self.target,
            result: self.result,
            duration: self.duration,
            detail: self.detail,
        }
    }
}
