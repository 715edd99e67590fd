//! Config loading.

mod load;
mod schema;

pub use load::{ConfigError, load, repo_config_path};
pub use schema::{
    Config, FileLoggingConfig, LogFormat, LoggingConfig, RefNames, RetryConfig, VaultConfig,
};
