//! Trace model.
//!
//! A trace is a faithful recording of a bounded window of operational events:
//! never reordered, never deduplicated. Once persisted it is immutable except
//! for the one-time promotion of `auto_summary` into a draft chat message.

use serde::{Deserialize, Serialize};

use super::event::OpEvent;
use super::identity::{TraceId, UserId};
use super::time::WallClock;

/// A stopped, persisted trace record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub trace_id: TraceId,
    pub name: String,
    pub classification: String,
    pub started_at: WallClock,
    pub ended_at: WallClock,
    pub user: UserId,
    /// Primary-history commit that was current when recording started.
    pub code_ref: String,
    pub events: Vec<OpEvent>,
    /// Cross-links into the external audit log, harvested from event text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audit_refs: Vec<String>,
    /// Deterministic template expansion over `events`; editable before publish.
    pub auto_summary: String,
}
