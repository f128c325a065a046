//! AppGet - installer artifact transfers
//!
//! This library fetches the installers referenced by package manifests from
//! local paths or HTTP servers, verifies them against SHA-256 digests, and
//! reuses previously verified downloads from a content-addressed cache.

pub mod config;
pub mod logging;
pub mod transfer;

pub use config::{ConfigFile, TransferConfig};
pub use transfer::{FileTransferService, TransferError, TransferEvent, TransferEvents};
