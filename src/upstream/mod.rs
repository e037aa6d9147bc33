//! Titlovi.com upstream client.
//!
//! - [`TitloviApi`]: one HTTP request per call, status mapping, wire types.
//! - [`TitloviClient`]: session-aware search and download with bounded
//!   retry; implements [`SubtitleSource`](crate::SubtitleSource).
//! - [`retry`]: the fixed-delay retry loop shared by both operations.

mod api;
mod client;
pub mod retry;

pub use api::TitloviApi;
pub use client::TitloviClient;
pub use retry::{Attempt, RetryConfig, with_retry};

use std::time::Duration;

/// Titlovi.com search API.
pub const DEFAULT_API_URL: &str = "https://kodi.titlovi.com/api/subtitles";

/// Titlovi.com archive download endpoint.
pub const DEFAULT_DOWNLOAD_URL: &str = "https://titlovi.com/download";

/// Endpoints, timeout and retry policy for the upstream.
///
/// ```rust
/// # use titlovi_gateway::{RetryConfig, UpstreamConfig};
/// # use std::time::Duration;
/// let config = UpstreamConfig::new()
///     .api_url("http://127.0.0.1:9000/api")
///     .retry(RetryConfig::new().max_attempts(2));
/// ```
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_url: String,
    pub download_url: String,
    /// Per-request timeout. Default: 30s.
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

impl UpstreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}
