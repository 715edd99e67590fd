//! Run model.
//!
//! A run is one recorded unit of operational work. Metadata is snapshotted
//! into `run.json` and into the anchor tag message at creation; the event
//! stream grows while the run is open; a closed run never changes again.

use serde::{Deserialize, Serialize};

use super::error::CoreError;
use super::identity::{RunId, UserId};
use super::time::WallClock;

/// Run lifecycle status.
///
/// `Running` is the open state; the other three are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Ok,
    Failed,
    Partial,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Ok => "ok",
            RunStatus::Failed => "failed",
            RunStatus::Partial => "partial",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "running" => Ok(RunStatus::Running),
            "ok" => Ok(RunStatus::Ok),
            "failed" => Ok(RunStatus::Failed),
            "partial" => Ok(RunStatus::Partial),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// Run metadata as persisted in `run.json` and the anchor tag message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    #[serde(rename = "type")]
    pub run_type: String,
    pub status: RunStatus,
    pub user: UserId,
    pub started_at: WallClock,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<WallClock>,
    /// Primary-history commit that was current when the run started.
    pub code_ref: String,
}

impl Run {
    pub fn open(
        run_id: RunId,
        run_type: impl Into<String>,
        user: UserId,
        started_at: WallClock,
        code_ref: impl Into<String>,
    ) -> Self {
        Self {
            run_id,
            run_type: run_type.into(),
            status: RunStatus::Running,
            user,
            started_at,
            ended_at: None,
            code_ref: code_ref.into(),
        }
    }
}

/// An anchor tag on the primary history, one per run, never mutated.
#[derive(Clone, Debug)]
pub struct RunAnchor {
    pub run: Run,
    /// Tag name under `refs/tags/`, derived from the run id.
    pub tag_name: String,
    /// Oid of the annotated tag object (hex).
    pub tag_oid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for s in [
            RunStatus::Running,
            RunStatus::Ok,
            RunStatus::Failed,
            RunStatus::Partial,
        ] {
            assert_eq!(RunStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(RunStatus::parse("done").is_err());
    }

    #[test]
    fn only_running_is_open() {
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Ok.is_terminal());
        assert!(RunStatus::Partial.is_terminal());
    }
}
