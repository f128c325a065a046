//! Common helpers shared across CLI commands.

use std::path::{Path, PathBuf};

use appget::config::{ConfigFile, TransferConfig};

use crate::error::CliError;

/// Load the transfer configuration.
///
/// An explicit `--config` file must exist; otherwise the default location is
/// used when present. `--cache-dir` overrides the file.
pub fn load_config(
    config_path: Option<&Path>,
    cache_dir: Option<PathBuf>,
) -> Result<TransferConfig, CliError> {
    let file = match config_path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let mut config = file.transfer;
    if let Some(dir) = cache_dir {
        config = config.with_cache_dir(dir);
    }
    Ok(config)
}
