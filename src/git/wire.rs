//! Wire formats for git-persisted records.
//!
//! Single-record files (`run.json`, `traces/<id>.json`) are one JSON
//! document; logs (`events.jsonl`, chat notes) are JSONL, one record per
//! line. Log parsers skip malformed lines and count them instead of failing
//! the whole read; a single bad record must never take down a listing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::WireError;
use crate::core::{ChatMessage, OpEvent, Run, Thread, Trace};

/// A parsed log with a count of records that failed schema validation.
#[derive(Debug)]
pub struct ParsedLog<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

/// One line in the chat notes namespace: message or thread record.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatRecord {
    Message(ChatMessage),
    Thread(Thread),
}

pub fn serialize_run(run: &Run) -> Result<Vec<u8>, WireError> {
    let mut bytes = serde_json::to_vec_pretty(run)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn parse_run(bytes: &[u8]) -> Result<Run, WireError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn serialize_trace(trace: &Trace) -> Result<Vec<u8>, WireError> {
    let mut bytes = serde_json::to_vec_pretty(trace)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn parse_trace(bytes: &[u8]) -> Result<Trace, WireError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Serialize events as JSONL in the order given.
pub fn serialize_events(events: &[OpEvent]) -> Result<Vec<u8>, WireError> {
    serialize_lines(events)
}

/// Parse `events.jsonl`, skipping malformed lines.
pub fn parse_events(bytes: &[u8]) -> Result<ParsedLog<OpEvent>, WireError> {
    parse_lines(bytes)
}

/// Serialize one chat record as a single JSONL line (no trailing newline).
pub fn chat_record_line(record: &ChatRecord) -> Result<String, WireError> {
    Ok(serde_json::to_string(record)?)
}

/// Parse a chat note blob, skipping malformed lines.
pub fn parse_chat(bytes: &[u8]) -> Result<ParsedLog<ChatRecord>, WireError> {
    parse_lines(bytes)
}

fn serialize_lines<T: Serialize>(records: &[T]) -> Result<Vec<u8>, WireError> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out.into_bytes())
}

fn parse_lines<T: DeserializeOwned>(bytes: &[u8]) -> Result<ParsedLog<T>, WireError> {
    let content = String::from_utf8(bytes.to_vec())?;
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(err) => {
                skipped += 1;
                tracing::warn!(error = %err, "skipping malformed record");
            }
        }
    }

    Ok(ParsedLog { records, skipped })
}
