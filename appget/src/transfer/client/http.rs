//! HTTP(S) transport client built on reqwest.
//!
//! - File names come from a HEAD request (`Content-Disposition`, then the
//!   final URL after redirects), falling back to the requested URL
//! - Bodies are streamed chunk by chunk to disk with progress callbacks

use std::path::Path;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{Client, Response, Url};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::{BoxFuture, ProgressCallback, TransportClient};
use crate::transfer::error::{TransferError, TransferResult};

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = concat!("appget/", env!("CARGO_PKG_VERSION"));

/// Downloads artifacts over `http://` and `https://`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default settings.
    pub fn new() -> TransferResult<Self> {
        Self::with_settings(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with a custom timeout and User-Agent.
    pub fn with_settings(timeout: Duration, user_agent: &str) -> TransferResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransferError::Request {
                location: String::new(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, timeout })
    }

    /// Configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request_error(&self, location: &str, error: reqwest::Error) -> TransferError {
        if error.is_timeout() {
            TransferError::Timeout {
                location: location.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            TransferError::Request {
                location: location.to_string(),
                reason: error.to_string(),
            }
        }
    }

    async fn get(&self, location: &str) -> TransferResult<Response> {
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| self.request_error(location, e))?;

        if !response.status().is_success() {
            return Err(TransferError::Http {
                location: location.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }

    /// Ask the server what the artifact is called.
    ///
    /// Returns `None` if the HEAD request fails or names nothing useful.
    async fn head_file_name(&self, location: &str) -> Option<String> {
        let response = match self.client.head(location).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(location, status = %response.status(), "HEAD request rejected");
                return None;
            }
            Err(e) => {
                debug!(location, error = %e, "HEAD request failed");
                return None;
            }
        };

        response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(content_disposition_file_name)
            .or_else(|| url_file_name(response.url()))
    }
}

fn has_http_scheme(location: &str) -> bool {
    let lower = location
        .get(..8)
        .unwrap_or(location)
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Last non-empty path segment of a URL.
fn url_file_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(percent_decode)
}

/// Extract the file name from a `Content-Disposition` header value.
///
/// Prefers the RFC 5987 `filename*` parameter over plain `filename`.
fn content_disposition_file_name(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                // charset'language'encoded-value
                let encoded = value.rsplit('\'').next().unwrap_or(value);
                extended = Some(percent_decode(encoded));
            }
            "filename" => plain = Some(value.to_string()),
            _ => {}
        }
    }

    extended.or(plain).filter(|name| !name.is_empty())
}

fn percent_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

impl TransportClient for HttpClient {
    fn name(&self) -> &'static str {
        "http"
    }

    fn can_handle(&self, location: &str) -> bool {
        has_http_scheme(location)
    }

    fn file_name<'a>(&'a self, location: &'a str) -> BoxFuture<'a, TransferResult<String>> {
        Box::pin(async move {
            if let Some(name) = self.head_file_name(location).await {
                return Ok(name);
            }

            let url = Url::parse(location).map_err(|e| TransferError::InvalidLocation {
                location: location.to_string(),
                reason: e.to_string(),
            })?;

            url_file_name(&url).ok_or_else(|| TransferError::InvalidLocation {
                location: location.to_string(),
                reason: "URL has no file name".to_string(),
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
            let mut response = self.get(location).await?;
            let total = response.content_length();

            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| TransferError::StoreFailed {
                        location: location.to_string(),
                        path: parent.to_path_buf(),
                        source: e,
                    })?;
            }

            let write_err = |e| TransferError::StoreFailed {
                location: location.to_string(),
                path: destination.to_path_buf(),
                source: e,
            };

            let mut writer = BufWriter::new(File::create(destination).await.map_err(write_err)?);
            let mut downloaded = 0u64;

            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| self.request_error(location, e))?
            {
                writer.write_all(&chunk).await.map_err(write_err)?;
                downloaded += chunk.len() as u64;
                on_progress(downloaded, total);
            }

            writer.flush().await.map_err(write_err)?;
            Ok(downloaded)
        })
    }

    fn read_string<'a>(&'a self, location: &'a str) -> BoxFuture<'a, TransferResult<String>> {
        Box::pin(async move {
            self.get(location)
                .await?
                .text()
                .await
                .map_err(|e| self.request_error(location, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_http_client_default_timeout() {
        let client = HttpClient::new().unwrap();
        assert_eq!(client.timeout().as_secs(), DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_http_client_with_settings() {
        let client = HttpClient::with_settings(Duration::from_secs(60), "test-agent").unwrap();
        assert_eq!(client.timeout().as_secs(), 60);
    }

    #[test]
    fn test_can_handle() {
        let client = HttpClient::new().unwrap();

        assert!(client.can_handle("http://x/pkg.exe"));
        assert!(client.can_handle("https://x/pkg.exe"));
        assert!(client.can_handle("HTTPS://x/pkg.exe"));
        assert!(!client.can_handle("ftp://x/pkg"));
        assert!(!client.can_handle("file:///tmp/pkg"));
        assert!(!client.can_handle("/tmp/http://"));
        assert!(!client.can_handle("http"));
    }

    #[test]
    fn test_content_disposition_file_name() {
        assert_eq!(
            content_disposition_file_name("attachment; filename=\"setup.exe\""),
            Some("setup.exe".to_string())
        );
        assert_eq!(
            content_disposition_file_name("attachment; filename=setup.msi"),
            Some("setup.msi".to_string())
        );
        assert_eq!(
            content_disposition_file_name(
                "attachment; filename=\"fallback.exe\"; filename*=UTF-8''my%20setup.exe"
            ),
            Some("my setup.exe".to_string())
        );
        assert_eq!(content_disposition_file_name("inline"), None);
        assert_eq!(content_disposition_file_name("attachment; filename=\"\""), None);
    }

    #[test]
    fn test_url_file_name() {
        let url = Url::parse("https://example.com/releases/v1/tool%201.zip").unwrap();
        assert_eq!(url_file_name(&url), Some("tool 1.zip".to_string()));

        let url = Url::parse("https://example.com/releases/").unwrap();
        assert_eq!(url_file_name(&url), Some("releases".to_string()));

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(url_file_name(&url), None);
    }

    #[test]
    fn test_percent_decode_leaves_invalid_sequences() {
        assert_eq!(percent_decode("a%2"), "a%2");
        assert_eq!(percent_decode("a%zzb"), "a%zzb");
        assert_eq!(percent_decode("100%25"), "100%");
        assert_eq!(percent_decode("caf%C3%A9.msi"), "café.msi");
        assert_eq!(percent_decode("bad%FF.exe"), "bad\u{FFFD}.exe");
    }

    #[tokio::test]
    async fn test_file_name_prefers_content_disposition() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(HEAD).path("/download");
                then.status(200)
                    .header("content-disposition", "attachment; filename=\"setup.exe\"");
            })
            .await;

        let client = HttpClient::new().unwrap();
        let name = client.file_name(&server.url("/download")).await.unwrap();
        assert_eq!(name, "setup.exe");
    }

    #[tokio::test]
    async fn test_file_name_falls_back_to_url_when_head_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(HEAD).path("/files/pkg.exe");
                then.status(405);
            })
            .await;

        let client = HttpClient::new().unwrap();
        let name = client
            .file_name(&server.url("/files/pkg.exe"))
            .await
            .unwrap();
        assert_eq!(name, "pkg.exe");
    }

    #[tokio::test]
    async fn test_transfer_streams_body_to_disk() {
        let body = vec![42u8; 200_000];
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/pkg.exe");
                then.status(200).body(body.clone());
            })
            .await;

        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("abc").join("pkg.exe");

        let last = Arc::new(AtomicU64::new(0));
        let last_cb = Arc::clone(&last);
        let progress: ProgressCallback = Box::new(move |bytes, _total| {
            last_cb.store(bytes, Ordering::SeqCst);
        });

        let client = HttpClient::new().unwrap();
        let written = client
            .transfer(&server.url("/pkg.exe"), &destination, progress)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(written, body.len() as u64);
        assert_eq!(last.load(Ordering::SeqCst), body.len() as u64);
        assert_eq!(std::fs::read(&destination).unwrap(), body);
    }

    #[tokio::test]
    async fn test_transfer_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.exe");
                then.status(404);
            })
            .await;

        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("missing.exe");

        let client = HttpClient::new().unwrap();
        let result = client
            .transfer(&server.url("/missing.exe"), &destination, Box::new(|_, _| {}))
            .await;

        match result {
            Err(TransferError::Http { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected Http error, got {:?}", other),
        }
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_read_string() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/manifest.yaml");
                then.status(200).body("id: appget\n");
            })
            .await;

        let client = HttpClient::new().unwrap();
        let content = client
            .read_string(&server.url("/manifest.yaml"))
            .await
            .unwrap();
        assert_eq!(content, "id: appget\n");
    }
}
