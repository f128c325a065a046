//! Installer artifact transfers.
//!
//! This module fetches artifacts named by a package manifest, verifies them
//! against an expected SHA-256 digest, and keeps verified artifacts in a
//! content-addressed cache so repeated installs skip the network entirely.
//!
//! # Architecture
//!
//! ```text
//! FileTransferService (orchestrator)
//!         │
//!         ├── ClientRegistry ── TransportClient (trait)
//!         │                         ├── LocalFileClient
//!         │                         └── HttpClient
//!         │
//!         ├── TransferCache (digest → folder, cache validity)
//!         │
//!         ├── checksum (streaming SHA-256)
//!         │
//!         ├── FlightLocks (one download per cache folder)
//!         │
//!         └── TransferEvents (Started / Progress / Completed)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use appget::config::TransferConfig;
//! use appget::transfer::{FileTransferService, TransferEvents};
//!
//! let (events, mut rx) = TransferEvents::channel();
//! let service = FileTransferService::from_config(&TransferConfig::default(), events)?;
//!
//! let path = service
//!     .transfer_file("https://example.com/setup.exe", Some("9f86d081884c7d65..."))
//!     .await?;
//! ```

mod cache;
mod checksum;
mod client;
mod error;
mod events;
mod flight;
mod service;

pub use cache::{staging_path, CacheStats, TransferCache};
pub use checksum::{file_checksum, normalize_digest, validate_hash};
pub use client::{
    validate_file_name, BoxFuture, ClientRegistry, HttpClient, LocalFileClient, ProgressCallback,
    TransportClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
pub use error::{TransferError, TransferResult, Unsupported};
pub use events::{ProgressUpdate, TransferEvent, TransferEvents};
pub use service::FileTransferService;
