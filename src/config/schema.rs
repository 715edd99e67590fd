use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::git::RetryPolicy;

/// Ref namespaces used by the subsystem.
///
/// The ledger branch is orphan (no shared ancestry with the primary
/// history); anchors are one tag per run; chat rides a notes namespace.
/// All are ordinary refs and travel over the normal transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefNames {
    pub ledger_ref: String,
    pub run_tag_prefix: String,
    pub anchor_tag: String,
    pub notes_ref: String,
}

impl Default for RefNames {
    fn default() -> Self {
        Self {
            ledger_ref: "refs/heads/opslog/ledger".into(),
            run_tag_prefix: "opslog/run".into(),
            anchor_tag: "opslog/anchor".into(),
            notes_ref: "refs/notes/opslog/chat".into(),
        }
    }
}

/// CAS retry knobs; see `git::refs::RetryPolicy` for the semantics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay_ms,
            max_delay_ms: policy.max_delay_ms,
        }
    }
}

impl RetryConfig {
    pub fn policy(self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
        }
    }
}

/// Where the vault key lives. The key itself is never in config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Path to a base64-encoded 32-byte key file. `OPSLOG_VAULT_KEY` (base64
    /// key material) takes precedence when set.
    pub key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub stdout: bool,
    pub format: LogFormat,
    pub file: FileLoggingConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stdout: true,
            format: LogFormat::Compact,
            file: FileLoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub refs: RefNames,
    pub retry: RetryConfig,
    pub vault: VaultConfig,
    pub logging: LoggingConfig,
}
