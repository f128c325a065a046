//! Transport clients and protocol resolution.
//!
//! A [`TransportClient`] claims a subset of source addresses (by scheme or
//! shape) and knows how to name, download and read them. The
//! [`ClientRegistry`] picks the single client responsible for an address;
//! zero matches and multiple matches are both resolution failures, never
//! settled by registration order.
//!
//! # Dyn Compatibility
//!
//! Async methods return [`BoxFuture`] so that clients can be stored as
//! `Arc<dyn TransportClient>` in the registry.

mod http;
mod local;

use std::future::Future;
use std::path::{Component, Path};
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use super::error::{TransferError, TransferResult, Unsupported};

pub use http::{HttpClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use local::LocalFileClient;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Progress callback invoked by clients while writing.
///
/// # Arguments
///
/// * `bytes_transferred` - Bytes written so far
/// * `total_bytes` - Total expected bytes, if known
pub type ProgressCallback = Box<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// A backend able to fetch artifacts for some source addresses.
pub trait TransportClient: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether this client handles the address. Must be pure.
    fn can_handle(&self, location: &str) -> bool;

    /// Name the artifact will be stored under.
    ///
    /// May perform I/O (e.g. a HEAD request).
    fn file_name<'a>(&'a self, location: &'a str) -> BoxFuture<'a, TransferResult<String>>;

    /// Stream the artifact to `destination`.
    ///
    /// Creates missing parent directories and leaves a complete file on
    /// success. Returns the number of bytes written.
    fn transfer<'a>(
        &'a self,
        location: &'a str,
        destination: &'a Path,
        on_progress: ProgressCallback,
    ) -> BoxFuture<'a, TransferResult<u64>>;

    /// Read the artifact as text without touching the disk cache.
    fn read_string<'a>(&'a self, location: &'a str) -> BoxFuture<'a, TransferResult<String>>;
}

/// The set of transport clients available to the transfer service.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Vec<Arc<dyn TransportClient>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client to the registry.
    pub fn with_client(mut self, client: impl TransportClient + 'static) -> Self {
        self.clients.push(Arc::new(client));
        self
    }

    /// Add a shared client to the registry.
    pub fn with_shared_client(mut self, client: Arc<dyn TransportClient>) -> Self {
        self.clients.push(client);
        self
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Find the single client responsible for `location`.
    pub fn resolve(&self, location: &str) -> TransferResult<Arc<dyn TransportClient>> {
        let mut matches = self.clients.iter().filter(|c| c.can_handle(location));

        let reason = match (matches.next(), matches.next()) {
            (Some(client), None) => return Ok(Arc::clone(client)),
            (None, _) => Unsupported::NoClient,
            (Some(_), Some(_)) => Unsupported::Ambiguous(2 + matches.count()),
        };

        debug!(location, %reason, "Unable to handle protocol");
        Err(TransferError::ProtocolNotSupported {
            location: location.to_string(),
            reason,
        })
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.clients.iter().map(|c| c.name()))
            .finish()
    }
}

/// Check that a client-reported filename is a single plain path component.
///
/// The name is joined onto a cache folder, so separators, `..`, and absolute
/// paths are all rejected.
pub fn validate_file_name(location: &str, name: &str) -> TransferResult<()> {
    let invalid = || TransferError::InvalidFileName {
        location: location.to_string(),
        name: name.to_string(),
    };

    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(invalid());
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid()),
    }
}
