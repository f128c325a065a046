//! Transfer orchestration.
//!
//! [`FileTransferService`] turns "fetch this artifact" into a fixed pipeline:
//!
//! ```text
//! normalize digest → cache folder → Started
//!     → resolve client → file name → lock folder
//!     → cache hit? ──yes──────────────────────────────┐
//!         │ no                                        │
//!         └→ transfer to staging → validate → rename ─┴→ Completed
//! ```
//!
//! Cancellation is checked between stages and raced against every stage that
//! waits on I/O. A staging file left by a failed or cancelled download is
//! removed, so the destination path only ever holds a complete artifact.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cache::{staging_path, TransferCache};
use super::checksum;
use super::client::{
    validate_file_name, ClientRegistry, HttpClient, LocalFileClient, ProgressCallback,
    TransportClient,
};
use super::error::{TransferError, TransferResult};
use super::events::{ProgressUpdate, TransferEvent, TransferEvents};
use super::flight::FlightLocks;
use crate::config::TransferConfig;

/// Fetches, verifies and caches installer artifacts.
#[derive(Debug)]
pub struct FileTransferService {
    clients: ClientRegistry,
    cache: TransferCache,
    events: TransferEvents,
    flights: FlightLocks,
}

impl FileTransferService {
    /// Create a service from its collaborators.
    pub fn new(clients: ClientRegistry, cache: TransferCache, events: TransferEvents) -> Self {
        Self {
            clients,
            cache,
            events,
            flights: FlightLocks::new(),
        }
    }

    /// Create a service with the built-in local file and HTTP clients.
    pub fn from_config(config: &TransferConfig, events: TransferEvents) -> TransferResult<Self> {
        let http = HttpClient::with_settings(config.timeout, &config.user_agent)?;
        let clients = ClientRegistry::new()
            .with_client(LocalFileClient::new())
            .with_client(http);

        Ok(Self::new(
            clients,
            TransferCache::new(&config.cache_dir),
            events,
        ))
    }

    /// The cache this service stores artifacts in.
    pub fn cache(&self) -> &TransferCache {
        &self.cache
    }

    /// The registered transport clients.
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Fetch an artifact and return the path it was stored at.
    ///
    /// With a digest, an already cached artifact is reused and a fresh
    /// download must match it. Without one (or with an empty string) the
    /// artifact is always downloaded and never verified.
    pub async fn transfer_file(
        &self,
        location: &str,
        digest: Option<&str>,
    ) -> TransferResult<PathBuf> {
        self.transfer_file_with_cancel(location, digest, &CancellationToken::new())
            .await
    }

    /// Like [`transfer_file`](Self::transfer_file), aborting when `cancel`
    /// fires.
    pub async fn transfer_file_with_cancel(
        &self,
        location: &str,
        digest: Option<&str>,
        cancel: &CancellationToken,
    ) -> TransferResult<PathBuf> {
        let digest = checksum::normalize_digest(digest)?;
        let destination_folder = match digest.as_deref() {
            Some(digest) => self.cache.cache_folder(digest),
            None => self.cache.unverified_folder(location),
        };

        self.transfer_into(location, &destination_folder, digest.as_deref(), cancel)
            .await
    }

    /// Read an artifact as text. No caching, verification, or events.
    pub async fn read_content(&self, location: &str) -> TransferResult<String> {
        let client = self.resolve(location)?;
        client.read_string(location).await
    }

    fn resolve(&self, location: &str) -> TransferResult<Arc<dyn TransportClient>> {
        self.clients.resolve(location).map_err(|e| {
            warn!(location, error = %e, "No transport client for source");
            e
        })
    }

    async fn transfer_into(
        &self,
        location: &str,
        destination_folder: &Path,
        digest: Option<&str>,
        cancel: &CancellationToken,
    ) -> TransferResult<PathBuf> {
        self.events.publish(TransferEvent::Started {
            location: location.to_string(),
            destination_folder: destination_folder.to_path_buf(),
        });
        debug!(
            location,
            destination = %destination_folder.display(),
            "Transferring file"
        );

        let client = self.resolve(location)?;
        ensure_active(cancel, location)?;

        let file_name = cancellable(cancel, location, client.file_name(location)).await?;
        validate_file_name(location, &file_name)?;
        let destination = destination_folder.join(&file_name);

        let _flight = cancellable(cancel, location, async {
            Ok(self.flights.acquire(destination_folder).await)
        })
        .await?;

        if self.cache.is_valid(&destination, digest).await {
            info!(
                location,
                path = %destination.display(),
                "Skipping download. Using already downloaded file."
            );
        } else {
            ensure_active(cancel, location)?;
            self.download(client.as_ref(), location, &destination, digest, cancel)
                .await?;
        }

        self.events.publish(TransferEvent::Completed {
            location: location.to_string(),
            destination_folder: destination_folder.to_path_buf(),
        });

        Ok(destination)
    }

    async fn download(
        &self,
        client: &dyn TransportClient,
        location: &str,
        destination: &Path,
        digest: Option<&str>,
        cancel: &CancellationToken,
    ) -> TransferResult<()> {
        let staging = staging_path(destination);
        info!(location, client = client.name(), "Downloading installer");

        let result = self
            .download_staged(client, location, &staging, destination, digest, cancel)
            .await;

        if let Err(e) = &result {
            warn!(location, error = %e, "Transfer failed");
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = %staging.display(), error = %cleanup, "Unable to remove staging file");
                }
            }
        }

        result
    }

    async fn download_staged(
        &self,
        client: &dyn TransportClient,
        location: &str,
        staging: &Path,
        destination: &Path,
        digest: Option<&str>,
        cancel: &CancellationToken,
    ) -> TransferResult<()> {
        let bytes = cancellable(
            cancel,
            location,
            client.transfer(location, staging, self.progress_callback(location)),
        )
        .await?;
        debug!(location, bytes, path = %staging.display(), "Installer downloaded");

        match digest {
            None => debug!(location, "No hash provided. Skipping checksum validation"),
            Some(expected) => {
                cancellable(cancel, location, checksum::validate_hash(staging, expected))
                    .await
                    .map_err(|e| attribute_mismatch(e, location, destination))?;
            }
        }

        ensure_active(cancel, location)?;
        tokio::fs::rename(staging, destination)
            .await
            .map_err(|e| TransferError::StoreFailed {
                location: location.to_string(),
                path: destination.to_path_buf(),
                source: e,
            })?;

        debug!(location, path = %destination.display(), "Installer ready");
        Ok(())
    }

    fn progress_callback(&self, location: &str) -> ProgressCallback {
        let events = self.events.clone();
        let location = location.to_string();
        Box::new(move |bytes_transferred, total_bytes| {
            events.publish(TransferEvent::Progress(ProgressUpdate {
                location: location.clone(),
                bytes_transferred,
                total_bytes,
            }));
        })
    }
}

fn cancelled(location: &str) -> TransferError {
    TransferError::Cancelled {
        location: location.to_string(),
    }
}

fn ensure_active(cancel: &CancellationToken, location: &str) -> TransferResult<()> {
    if cancel.is_cancelled() {
        debug!(location, "Transfer cancelled");
        return Err(cancelled(location));
    }
    Ok(())
}

/// Run one pipeline stage, giving up as soon as `cancel` fires.
async fn cancellable<T>(
    cancel: &CancellationToken,
    location: &str,
    stage: impl Future<Output = TransferResult<T>>,
) -> TransferResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(location, "Transfer cancelled");
            Err(cancelled(location))
        }
        result = stage => result,
    }
}

/// Report checksum failures against the source address and artifact name
/// instead of the staging file.
fn attribute_mismatch(error: TransferError, location: &str, destination: &Path) -> TransferError {
    match error {
        TransferError::ChecksumMismatch {
            expected, actual, ..
        } => TransferError::ChecksumMismatch {
            location: location.to_string(),
            filename: destination
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            expected,
            actual,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_from_config_registers_builtin_clients() {
        let temp = TempDir::new().unwrap();
        let config = TransferConfig::default()
            .with_cache_dir(temp.path().to_path_buf())
            .with_timeout(Duration::from_secs(10));

        let service = FileTransferService::from_config(&config, TransferEvents::disabled()).unwrap();

        assert_eq!(service.clients().len(), 2);
        assert_eq!(service.cache().root(), temp.path());
        assert_eq!(service.clients().resolve("https://x/a.exe").unwrap().name(), "http");
        assert_eq!(
            service.clients().resolve("file:///tmp/a.exe").unwrap().name(),
            "local"
        );
    }

    #[test]
    fn test_attribute_mismatch_names_source_and_artifact() {
        let err = TransferError::ChecksumMismatch {
            location: "/cache/aa/.setup.exe.partial".to_string(),
            filename: ".setup.exe.partial".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };

        match attribute_mismatch(err, "http://mirror/setup.exe", Path::new("/cache/aa/setup.exe")) {
            TransferError::ChecksumMismatch {
                location, filename, ..
            } => {
                assert_eq!(location, "http://mirror/setup.exe");
                assert_eq!(filename, "setup.exe");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_attribute_mismatch_passes_other_errors_through() {
        let err = TransferError::Task("boom".to_string());
        assert!(matches!(
            attribute_mismatch(err, "http://x", Path::new("/cache/a")),
            TransferError::Task(_)
        ));
    }

    #[tokio::test]
    async fn test_cancellable_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = cancellable(&cancel, "http://x", async { Ok(1) }).await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_local_round_trip_through_service() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("tool.zip");
        std::fs::write(&source, b"hello world").unwrap();

        let config = TransferConfig::default().with_cache_dir(temp.path().join("cache"));
        let service = FileTransferService::from_config(&config, TransferEvents::disabled()).unwrap();

        let digest = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
        let path = service
            .transfer_file(source.to_str().unwrap(), Some(digest))
            .await
            .unwrap();

        assert_eq!(path, service.cache().cache_folder(digest).join("tool.zip"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
        assert!(!staging_path(&path).exists());
    }
}
