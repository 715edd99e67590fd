//! Identity atoms.
//!
//! UserId: operator self-identification
//! RunId: time-derived, lexicographically sortable
//! MessageId: monotonic-sortable within a process
//! ThreadId / TraceId: random handles

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::error::{CoreError, InvalidId};
use super::time::WallClock;

/// Lowercase alphanumeric alphabet for generated id suffixes.
const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn random_suffix(len: usize) -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..SUFFIX_ALPHABET.len());
            SUFFIX_ALPHABET[idx] as char
        })
        .collect()
}

/// Operator identifier - non-empty string, no further validation.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.is_empty() {
            Err(InvalidId::User {
                raw: s,
                reason: "empty".into(),
            }
            .into())
        } else {
            Ok(Self(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({:?})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run identifier - `<013-digit unix ms>-<4 char suffix>`.
///
/// The zero-padded millisecond prefix makes lexicographic order equal
/// chronological order; the random suffix breaks same-millisecond ties.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let Some((ms, suffix)) = s.split_once('-') else {
            return Err(InvalidId::Run {
                raw: s.to_string(),
                reason: "missing '-' separator".into(),
            }
            .into());
        };
        if ms.len() != 13 || !ms.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidId::Run {
                raw: s.to_string(),
                reason: "prefix must be 13 decimal digits".into(),
            }
            .into());
        }
        if suffix.is_empty() || !suffix.bytes().all(|b| SUFFIX_ALPHABET.contains(&b)) {
            return Err(InvalidId::Run {
                raw: s.to_string(),
                reason: "suffix must be lowercase alphanumeric".into(),
            }
            .into());
        }
        Ok(Self(s.to_string()))
    }

    pub(crate) fn generate(now: WallClock) -> Self {
        Self(format!("{:013}-{}", now.as_ms(), random_suffix(4)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunId({})", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message identifier - `<013-digit unix ms>-<06-digit seq>-<4 char suffix>`.
///
/// The process-wide counter keeps same-millisecond sends in submission order;
/// the random suffix separates independent processes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

static MESSAGE_SEQ: AtomicU64 = AtomicU64::new(0);

impl MessageId {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let ok = !s.is_empty()
            && s.bytes()
                .all(|b| b == b'-' || SUFFIX_ALPHABET.contains(&b));
        if ok {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidId::Message {
                raw: s.to_string(),
                reason: "must be lowercase alphanumeric with '-'".into(),
            }
            .into())
        }
    }

    pub(crate) fn generate(now: WallClock) -> Self {
        let seq = MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed) % 1_000_000;
        Self(format!("{:013}-{:06}-{}", now.as_ms(), seq, random_suffix(4)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread identifier - `th-<8 char suffix>`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let rest = s.strip_prefix("th-").ok_or_else(|| InvalidId::Thread {
            raw: s.to_string(),
            reason: "must start with 'th-'".into(),
        })?;
        if rest.is_empty() || !rest.bytes().all(|b| SUFFIX_ALPHABET.contains(&b)) {
            return Err(InvalidId::Thread {
                raw: s.to_string(),
                reason: "suffix must be lowercase alphanumeric".into(),
            }
            .into());
        }
        Ok(Self(s.to_string()))
    }

    pub(crate) fn generate() -> Self {
        Self(format!("th-{}", random_suffix(8)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadId({})", self.0)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trace identifier - `tr-<uuid>`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let rest = s.strip_prefix("tr-").ok_or_else(|| InvalidId::Trace {
            raw: s.to_string(),
            reason: "must start with 'tr-'".into(),
        })?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
        {
            return Err(InvalidId::Trace {
                raw: s.to_string(),
                reason: "suffix must be lowercase hex".into(),
            }
            .into());
        }
        Ok(Self(s.to_string()))
    }

    pub(crate) fn generate() -> Self {
        Self(format!("tr-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceId({})", self.0)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_sorts_chronologically() {
        let a = RunId::generate(WallClock(1_000));
        let b = RunId::generate(WallClock(2_000));
        assert!(a.as_str() < b.as_str());
    }

    #[test]
    fn run_id_parse_rejects_bad_shapes() {
        assert!(RunId::parse("0001724970000000-ab12").is_err()); // 16-digit prefix
        assert!(RunId::parse("0001724970000").is_err()); // no separator
        assert!(RunId::parse("0001724970000-AB").is_err()); // uppercase suffix
        assert!(RunId::parse("0001724970000-ab12").is_ok());
    }

    #[test]
    fn message_ids_are_monotonic_within_process() {
        let now = WallClock(42);
        let a = MessageId::generate(now);
        let b = MessageId::generate(now);
        assert!(a.as_str() < b.as_str());
    }

    #[test]
    fn thread_and_trace_ids_roundtrip() {
        let t = ThreadId::generate();
        assert_eq!(ThreadId::parse(t.as_str()).unwrap(), t);
        let tr = TraceId::generate();
        assert_eq!(TraceId::parse(tr.as_str()).unwrap(), tr);
    }

    #[test]
    fn user_id_rejects_empty() {
        assert!(UserId::new("").is_err());
        assert_eq!(UserId::new("alice").unwrap().as_str(), "alice");
    }
}
