//! Content-addressed transfer cache.
//!
//! Verified artifacts live under `<root>/<digest>/<filename>`. The folder is a
//! function of the digest alone, so two sources that promise the same digest
//! share one slot: whichever transfer lands first is reused by every later
//! request.
//!
//! ```text
//! <root>/
//! ├── 9f86d081884c7d65.../
//! │   └── setup.exe
//! └── unverified/
//!     └── 3a7bd3e2360a3d29/      (SHA-256 prefix of the source address)
//!         └── tool.zip
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::checksum;
use super::error::{TransferError, TransferResult};

/// Folder holding artifacts fetched without an expected digest.
const UNVERIFIED_DIR: &str = "unverified";

/// Number of hex characters of the source hash used for unverified folders.
const UNVERIFIED_KEY_LEN: usize = 16;

/// Suffix for in-progress downloads.
const STAGING_SUFFIX: &str = ".partial";

/// Summary of the files stored in the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of artifact files.
    pub files: u64,
    /// Total size of all artifact files in bytes.
    pub bytes: u64,
}

/// Maps digests to cache folders and checks cached artifacts.
#[derive(Debug, Clone)]
pub struct TransferCache {
    root: PathBuf,
}

impl TransferCache {
    /// Create a cache rooted at the given directory.
    ///
    /// The directory is created lazily by the first transfer.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic folder for an expected digest.
    ///
    /// The digest should already be normalized (see
    /// [`checksum::normalize_digest`]); it is lowercased again so that callers
    /// passing mixed case still land in the same slot.
    pub fn cache_folder(&self, digest: &str) -> PathBuf {
        self.root.join(digest.to_ascii_lowercase())
    }

    /// Folder for a transfer that has no digest to key on.
    ///
    /// Keyed by a hash of the source address so unrelated unverified downloads
    /// sharing a filename never overwrite each other.
    pub fn unverified_folder(&self, location: &str) -> PathBuf {
        let hash = format!("{:x}", Sha256::digest(location.as_bytes()));
        self.root
            .join(UNVERIFIED_DIR)
            .join(&hash[..UNVERIFIED_KEY_LEN])
    }

    /// Whether the file at `path` already satisfies `digest`.
    ///
    /// Without a digest nothing is ever considered valid, so unverified
    /// artifacts are always fetched again.
    pub async fn is_valid(&self, path: &Path, digest: Option<&str>) -> bool {
        let Some(expected) = digest else {
            return false;
        };

        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return false,
        }

        match checksum::file_checksum(path).await {
            Ok(actual) if actual.eq_ignore_ascii_case(expected) => true,
            Ok(actual) => {
                debug!(
                    path = %path.display(),
                    expected,
                    actual = %actual,
                    "Cached file does not match expected digest"
                );
                false
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Unable to hash cached file");
                false
            }
        }
    }

    /// Count the artifacts currently stored in the cache.
    pub fn stats(&self) -> TransferResult<CacheStats> {
        let mut stats = CacheStats::default();
        if self.root.exists() {
            collect_stats(&self.root, &mut stats)?;
        }
        Ok(stats)
    }

    /// Remove every cached artifact.
    ///
    /// Returns what was removed.
    pub fn clear(&self) -> TransferResult<CacheStats> {
        let stats = self.stats()?;
        if self.root.exists() {
            fs::remove_dir_all(&self.root).map_err(|e| TransferError::WriteFailed {
                path: self.root.clone(),
                source: e,
            })?;
        }
        info!(
            root = %self.root.display(),
            files = stats.files,
            bytes = stats.bytes,
            "Cleared transfer cache"
        );
        Ok(stats)
    }
}

/// Staging path used while `destination` is being written.
///
/// Lives next to the destination so the final rename stays on one filesystem.
pub fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .unwrap_or_default()
        .to_string_lossy();
    destination.with_file_name(format!(".{}{}", name, STAGING_SUFFIX))
}

fn collect_stats(dir: &Path, stats: &mut CacheStats) -> TransferResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| TransferError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.is_dir() {
            collect_stats(&path, stats)?;
        } else if meta.is_file() && !is_staging_file(&path) {
            stats.files += 1;
            stats.bytes += meta.len();
        }
    }
    Ok(())
}

fn is_staging_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(STAGING_SUFFIX))
        .unwrap_or(false)
}
