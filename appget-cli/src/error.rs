//! CLI error type.

use appget::config::ConfigError;
use appget::logging::LoggingError;
use appget::transfer::TransferError;
use thiserror::Error;

/// Errors surfaced to the user by the `appget` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is incomplete.
    #[error("configuration error: {0}")]
    Config(String),

    /// Logging could not be initialized.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// A transfer or read failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Failed to clear the cache.
    #[error("failed to clear cache: {0}")]
    CacheClear(String),

    /// Failed to read cache statistics.
    #[error("failed to read cache statistics: {0}")]
    CacheStats(String),
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}
