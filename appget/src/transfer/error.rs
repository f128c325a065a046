//! Error types for artifact transfers.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Why a source address could not be matched to a transport client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    /// No registered client claims the address.
    NoClient,
    /// More than one registered client claims the address.
    Ambiguous(usize),
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoClient => write!(f, "Unknown Protocol"),
            Self::Ambiguous(count) => write!(f, "{} clients claim this protocol", count),
        }
    }
}

/// Errors that can occur while fetching an artifact.
#[derive(Debug, Error)]
pub enum TransferError {
    /// No transport client (or more than one) can handle the address.
    #[error("unable to handle download for: {location} - {reason}")]
    ProtocolNotSupported {
        location: String,
        reason: Unsupported,
    },

    /// Checksum verification failed.
    #[error("checksum mismatch for {filename} from {location}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        location: String,
        filename: String,
        expected: String,
        actual: String,
    },

    /// The expected digest is not a hex string.
    #[error("invalid digest '{0}': expected hexadecimal characters only")]
    InvalidDigest(String),

    /// The client reported a filename that is not a single path component.
    #[error("invalid file name '{name}' reported for {location}")]
    InvalidFileName { location: String, name: String },

    /// The address is claimed by a client but cannot be interpreted by it.
    #[error("invalid location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    /// The server answered with a non-success status.
    #[error("request to {location} failed with status {status}")]
    Http { location: String, status: u16 },

    /// The request could not be sent or its body could not be read.
    #[error("failed to download {location}: {reason}")]
    Request { location: String, reason: String },

    /// Network timeout.
    #[error("request to {location} timed out after {timeout_secs}s")]
    Timeout { location: String, timeout_secs: u64 },

    /// Failed to read a file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to store the content of a source on disk.
    #[error("failed to store {location} at {}: {source}", path.display())]
    StoreFailed {
        location: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The transfer was cancelled before it completed.
    #[error("transfer of {location} was cancelled")]
    Cancelled { location: String },

    /// A blocking worker task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),
}

impl TransferError {
    /// Returns true if this error is a protocol resolution failure.
    pub fn is_protocol_not_supported(&self) -> bool {
        matches!(self, Self::ProtocolNotSupported { .. })
    }

    /// Returns true if this error is a checksum mismatch.
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }

    /// Returns true if the transfer was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
