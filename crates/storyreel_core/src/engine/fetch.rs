//! HTTP source fetching with per-request timeouts.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use thiserror::Error;
use tracing::debug;

/// Failures while fetching bytes from a source URL.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("fetching {url} exceeded {seconds}s")]
    TimedOut { url: String, seconds: u64 },
}

/// Fetches raw bytes from a URL, bounded by a timeout.
///
/// The compositor never talks to the network directly; everything goes
/// through this seam so tests can substitute canned responses.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// Production fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let request = async {
            let response = self.client.get(url).send().await.map_err(|err| {
                FetchError::Request {
                    url: url.to_string(),
                    message: err.to_string(),
                }
            })?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let mut bytes = Vec::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|err| FetchError::Request {
                    url: url.to_string(),
                    message: err.to_string(),
                })?;
                bytes.extend_from_slice(&chunk);
            }
            debug!("fetched {} bytes from {url}", bytes.len());
            Ok(bytes)
        };

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| FetchError::TimedOut {
                url: url.to_string(),
                seconds: timeout.as_secs(),
            })?
    }
}
