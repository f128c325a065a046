//! Transport client for local and network-share file paths.

use std::path::{Path, PathBuf};

use reqwest::Url;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};

use super::{BoxFuture, ProgressCallback, TransportClient};
use crate::transfer::error::{TransferError, TransferResult};

/// Buffer size for copying (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

const FILE_SCHEME: &str = "file://";

/// Copies artifacts addressed by `file://` URLs or absolute paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileClient;

impl LocalFileClient {
    /// Create a new local file client.
    pub fn new() -> Self {
        Self
    }

    /// Turn an address into a filesystem path.
    fn to_path(location: &str) -> TransferResult<PathBuf> {
        if !has_file_scheme(location) {
            return Ok(PathBuf::from(location));
        }

        let invalid = |reason: &str| TransferError::InvalidLocation {
            location: location.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(location).map_err(|e| invalid(&e.to_string()))?;
        url.to_file_path()
            .map_err(|_| invalid("not a local file URL"))
    }

    async fn copy_with_progress(
        location: &str,
        source: &Path,
        destination: &Path,
        on_progress: ProgressCallback,
    ) -> TransferResult<u64> {
        let read_err = |e| TransferError::ReadFailed {
            path: source.to_path_buf(),
            source: e,
        };
        let store_err = |path: &Path, e: std::io::Error| TransferError::StoreFailed {
            location: location.to_string(),
            path: path.to_path_buf(),
            source: e,
        };
        let write_err = |e| store_err(destination, e);

        let mut input = File::open(source).await.map_err(read_err)?;
        let total = input.metadata().await.map_err(read_err)?.len();

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| store_err(parent, e))?;
        }

        let mut writer = BufWriter::new(File::create(destination).await.map_err(write_err)?);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut copied = 0u64;

        loop {
            let bytes_read = input.read(&mut buffer).await.map_err(read_err)?;
            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .await
                .map_err(write_err)?;

            copied += bytes_read as u64;
            on_progress(copied, Some(total));
        }

        writer.flush().await.map_err(write_err)?;
        Ok(copied)
    }
}

fn has_file_scheme(location: &str) -> bool {
    location
        .get(..FILE_SCHEME.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(FILE_SCHEME))
}

impl TransportClient for LocalFileClient {
    fn name(&self) -> &'static str {
        "local"
    }

    fn can_handle(&self, location: &str) -> bool {
        if has_file_scheme(location) {
            return true;
        }
        !location.contains("://") && Path::new(location).is_absolute()
    }

    fn file_name<'a>(&'a self, location: &'a str) -> BoxFuture<'a, TransferResult<String>> {
        Box::pin(async move {
            let path = Self::to_path(location)?;
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| TransferError::InvalidLocation {
                    location: location.to_string(),
                    reason: "path has no file name".to_string(),
                })
        })
    }

    fn transfer<'a>(
        &'a self,
        location: &'a str,
        destination: &'a Path,
        on_progress: ProgressCallback,
    ) -> BoxFuture<'a, TransferResult<u64>> {
        Box::pin(async move {
            let source = Self::to_path(location)?;
            Self::copy_with_progress(location, &source, destination, on_progress).await
        })
    }

    fn read_string<'a>(&'a self, location: &'a str) -> BoxFuture<'a, TransferResult<String>> {
        Box::pin(async move {
            let path = Self::to_path(location)?;
            fs::read_to_string(&path)
                .await
                .map_err(|e| TransferError::ReadFailed { path, source: e })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn no_progress() -> ProgressCallback {
        Box::new(|_, _| {})
    }

    #[test]
    fn test_can_handle() {
        let client = LocalFileClient::new();

        assert!(client.can_handle("file:///tmp/setup.exe"));
        assert!(client.can_handle("FILE:///tmp/setup.exe"));
        #[cfg(unix)]
        assert!(client.can_handle("/tmp/setup.exe"));
        #[cfg(windows)]
        assert!(client.can_handle("C:\\Downloads\\setup.exe"));

        assert!(!client.can_handle("http://example.com/setup.exe"));
        assert!(!client.can_handle("ftp://example.com/setup.exe"));
        assert!(!client.can_handle("relative/setup.exe"));
        assert!(!client.can_handle(""));
    }

    #[tokio::test]
    async fn test_file_name_from_path_and_url() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("setup.exe");
        let url = Url::from_file_path(&path).unwrap();

        let client = LocalFileClient::new();
        assert_eq!(
            client.file_name(path.to_str().unwrap()).await.unwrap(),
            "setup.exe"
        );
        assert_eq!(client.file_name(url.as_str()).await.unwrap(), "setup.exe");
    }

    #[tokio::test]
    async fn test_transfer_copies_and_reports_progress() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.bin");
        let data = vec![7u8; BUFFER_SIZE * 2 + 100];
        std::fs::write(&source, &data).unwrap();

        let destination = temp.path().join("nested").join("dir").join("copy.bin");

        let calls = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicU64::new(0));
        let (calls_cb, last_cb) = (Arc::clone(&calls), Arc::clone(&last));
        let progress: ProgressCallback = Box::new(move |bytes, total| {
            assert_eq!(total, Some((BUFFER_SIZE * 2 + 100) as u64));
            calls_cb.fetch_add(1, Ordering::SeqCst);
            last_cb.store(bytes, Ordering::SeqCst);
        });

        let client = LocalFileClient::new();
        let copied = client
            .transfer(source.to_str().unwrap(), &destination, progress)
            .await
            .unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(std::fs::read(&destination).unwrap(), data);
        assert!(calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(last.load(Ordering::SeqCst), data.len() as u64);
    }

    #[tokio::test]
    async fn test_transfer_missing_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("missing.bin");
        let destination = temp.path().join("out.bin");

        let client = LocalFileClient::new();
        let result = client
            .transfer(source.to_str().unwrap(), &destination, no_progress())
            .await;

        assert!(matches!(result, Err(TransferError::ReadFailed { .. })));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_unwritable_destination_names_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.bin");
        std::fs::write(&source, b"payload").unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let destination = blocker.join("out.bin");

        let location = source.to_str().unwrap();
        let client = LocalFileClient::new();
        let result = client.transfer(location, &destination, no_progress()).await;

        match result {
            Err(err @ TransferError::StoreFailed { .. }) => {
                assert!(err.to_string().contains(location));
            }
            other => panic!("Expected StoreFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_string() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("manifest.yaml");
        std::fs::write(&source, "id: appget\n").unwrap();
        let url = Url::from_file_path(&source).unwrap();

        let client = LocalFileClient::new();
        assert_eq!(client.read_string(url.as_str()).await.unwrap(), "id: appget\n");
    }
}
