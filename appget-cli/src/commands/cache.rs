//! Cache management CLI commands.

use appget::config::TransferConfig;
use appget::transfer::{normalize_digest, TransferCache, TransferError};
use clap::Subcommand;
use indicatif::HumanBytes;

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show the folder an artifact with the given SHA-256 is cached in
    Path {
        /// Expected SHA-256 digest (hex)
        digest: String,
    },
    /// Remove every cached artifact
    Clear,
    /// Show cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(config: &TransferConfig, action: CacheAction) -> Result<(), CliError> {
    let cache = TransferCache::new(&config.cache_dir);

    match action {
        CacheAction::Path { digest } => {
            let digest = normalize_digest(Some(&digest))?
                .ok_or_else(|| TransferError::InvalidDigest(digest.clone()))?;
            println!("{}", cache.cache_folder(&digest).display());
            Ok(())
        }
        CacheAction::Clear => {
            println!("Clearing cache at: {}", cache.root().display());
            let removed = cache
                .clear()
                .map_err(|e| CliError::CacheClear(e.to_string()))?;
            println!(
                "Deleted {} files, freed {}",
                removed.files,
                HumanBytes(removed.bytes)
            );
            Ok(())
        }
        CacheAction::Stats => {
            println!("Cache: {}", cache.root().display());
            let stats = cache
                .stats()
                .map_err(|e| CliError::CacheStats(e.to_string()))?;
            println!("  Files: {}", stats.files);
            println!("  Size:  {}", HumanBytes(stats.bytes));
            Ok(())
        }
    }
}
