use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::Config;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Repo-local config file, next to the working copy root.
pub fn repo_config_path(repo_root: &Path) -> PathBuf {
    repo_root.join("opslog.toml")
}

/// Load config for a repository.
///
/// Precedence: `OPSLOG_CONFIG` (explicit path) > `<repo>/opslog.toml` >
/// built-in defaults. A missing file is defaults, not an error.
pub fn load(repo_root: &Path) -> Result<Config, ConfigError> {
    let path = match std::env::var_os("OPSLOG_CONFIG") {
        Some(p) => PathBuf::from(p),
        None => repo_config_path(repo_root),
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
        path: path.clone(),
        message: e.to_string(),
    })?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config.refs.ledger_ref, "refs/heads/opslog/ledger");
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            repo_config_path(dir.path()),
            "[retry]\nmax_attempts = 9\n[logging]\nstdout = false\n",
        )
        .unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config.retry.max_attempts, 9);
        assert!(!config.logging.stdout);
        // Untouched sections keep their defaults.
        assert_eq!(config.refs.notes_ref, "refs/notes/opslog/chat");
    }
}
