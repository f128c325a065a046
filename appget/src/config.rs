//! Configuration for artifact transfers.
//!
//! Settings come from an INI file (by default
//! `~/.config/appget/config.ini` on Linux) and can be overridden in code with
//! the `with_*` builder methods.
//!
//! ```ini
//! [transfer]
//! cache_dir = /var/cache/appget
//! timeout_secs = 120
//! user_agent = appget/0.3
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::transfer::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

const TRANSFER_SECTION: &str = "transfer";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid INI.
    #[error("failed to parse config file: {0}")]
    Parse(String),

    /// A key holds a value of the wrong type.
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Settings used to build a transfer service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Root of the content-addressed artifact cache.
    pub cache_dir: PathBuf,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// User-Agent sent with HTTP requests.
    pub user_agent: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TransferConfig {
    /// Set the cache root.
    pub fn with_cache_dir(mut self, path: PathBuf) -> Self {
        self.cache_dir = path;
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the HTTP User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Default cache root: the platform cache directory, or the temp dir.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("appget")
}

/// Default location of the configuration file.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("appget").join("config.ini"))
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    /// `[transfer]` section.
    pub transfer: TransferConfig,
}

impl ConfigFile {
    /// Load from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents)
    }

    /// Parse INI text. Keys that are absent keep their defaults.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut transfer = TransferConfig::default();

        if let Some(section) = ini.section(Some(TRANSFER_SECTION)) {
            if let Some(dir) = section.get("cache_dir").map(str::trim).filter(|d| !d.is_empty()) {
                transfer.cache_dir = PathBuf::from(dir);
            }

            if let Some(raw) = section.get("timeout_secs") {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|&secs| secs > 0)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: format!("{}.timeout_secs", TRANSFER_SECTION),
                        value: raw.to_string(),
                    })?;
                transfer.timeout = Duration::from_secs(secs);
            }

            if let Some(agent) = section.get("user_agent").map(str::trim).filter(|a| !a.is_empty()) {
                transfer.user_agent = agent.to_string();
            }
        }

        Ok(Self { transfer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = TransferConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.cache_dir.ends_with("appget"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = TransferConfig::default()
            .with_cache_dir(PathBuf::from("/custom/cache"))
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("custom/1.0");

        assert_eq!(config.cache_dir, PathBuf::from("/custom/cache"));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "custom/1.0");
    }

    #[test]
    fn test_parse_full_section() {
        let config = ConfigFile::parse(
            "[transfer]\ncache_dir = /srv/appget\ntimeout_secs = 45\nuser_agent = test/2\n",
        )
        .unwrap();

        assert_eq!(config.transfer.cache_dir, PathBuf::from("/srv/appget"));
        assert_eq!(config.transfer.timeout, Duration::from_secs(45));
        assert_eq!(config.transfer.user_agent, "test/2");
    }

    #[test]
    fn test_parse_missing_keys_keep_defaults() {
        let config = ConfigFile::parse("[transfer]\ntimeout_secs = 10\n").unwrap();
        assert_eq!(config.transfer.timeout, Duration::from_secs(10));
        assert_eq!(config.transfer.user_agent, DEFAULT_USER_AGENT);

        let empty = ConfigFile::parse("").unwrap();
        assert_eq!(empty, ConfigFile::default());
    }

    #[test]
    fn test_parse_invalid_timeout() {
        let result = ConfigFile::parse("[transfer]\ntimeout_secs = soon\n");
        match result {
            Err(ConfigError::InvalidValue { key, value }) => {
                assert_eq!(key, "transfer.timeout_secs");
                assert_eq!(value, "soon");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_zero_timeout_rejected() {
        let result = ConfigFile::parse("[transfer]\ntimeout_secs = 0\n");
        match result {
            Err(ConfigError::InvalidValue { key, value }) => {
                assert_eq!(key, "transfer.timeout_secs");
                assert_eq!(value, "0");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[transfer]\ncache_dir = /tmp/appget-test\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.transfer.cache_dir, PathBuf::from("/tmp/appget-test"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = ConfigFile::load_from(Path::new("/nonexistent/config.ini"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
