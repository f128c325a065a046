//! SHA-256 checksum calculation and verification for transferred artifacts.
//!
//! Digests are computed by streaming the file through a fixed-size buffer, so
//! installers of any size can be verified without loading them into memory.
//! The async entry points run the hashing on tokio's blocking pool.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use super::error::{TransferError, TransferResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Normalize a caller-supplied digest.
///
/// Empty or whitespace-only digests mean "no verification" and yield `None`.
/// Anything else is lowercased and must consist of hex digits only.
pub fn normalize_digest(digest: Option<&str>) -> TransferResult<Option<String>> {
    let Some(raw) = digest.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };

    if !raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TransferError::InvalidDigest(raw.to_string()));
    }

    Ok(Some(raw.to_ascii_lowercase()))
}

/// Stream a file through SHA-256 and return the lowercase hex digest.
fn hash_file(path: &Path) -> TransferResult<String> {
    let read_err = |e| TransferError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let file = File::open(path).map_err(read_err)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(read_err)?;

    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 of a file, computed on the blocking pool.
pub async fn file_checksum(path: &Path) -> TransferResult<String> {
    let owned: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || hash_file(&owned))
        .await
        .map_err(|e| TransferError::Task(e.to_string()))?
}

/// Validate a file against an expected digest without blocking the runtime.
///
/// The comparison ignores ASCII case. A mismatch reports the checked file as
/// both location and filename; callers that know the source address
/// substitute it.
pub async fn validate_hash(path: &Path, expected: &str) -> TransferResult<()> {
    debug!(path = %path.display(), expected, "Validating checksum");

    let actual = file_checksum(path).await?;
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }

    Err(TransferError::ChecksumMismatch {
        location: path.display().to_string(),
        filename: path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string(),
        expected: expected.to_string(),
        actual,
    })
}
