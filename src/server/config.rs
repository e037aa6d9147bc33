//! Configuration loading for titlovid.
//!
//! Configuration is loaded from TOML with the following resolution order:
//! 1. `--config <path>` (CLI flag or `TITLOVI_CONFIG`)
//! 2. `~/.titlovi-gateway/config.toml` (user)
//! 3. `/etc/titlovi-gateway/config.toml` (system)
//!
//! With no file present, built-in defaults are used. Every field is
//! optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::cache::CacheConfig;
use crate::gateway::{DEFAULT_LANGUAGES, DEFAULT_LANGUAGE_SUFFIX, GatewayBuilder};
use crate::pipeline::{DEFAULT_FALLBACK_ENCODING, PipelineConfig};
use crate::ratelimit::RateLimitConfig;
use crate::types::SubtitleFormat;
use crate::upstream::{DEFAULT_API_URL, DEFAULT_DOWNLOAD_URL, RetryConfig, UpstreamConfig};
use crate::{GatewayError, Result};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub subtitles: SubtitlesSection,
}

/// Listener and externally visible address.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:8080).
    #[serde(default = "default_address")]
    pub address: String,
    /// Base URL players use to reach this server; download links are built
    /// from it (default: http://127.0.0.1:8080).
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            public_url: default_public_url(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_public_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

/// Titlovi.com endpoints and retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_download_url")]
    pub download_url: String,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            download_url: default_download_url(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_download_url() -> String {
    DEFAULT_DOWNLOAD_URL.to_string()
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_request_timeout() -> u64 {
    30
}

/// Response cache bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_entries")]
    pub max_entries: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    600
}

fn default_cache_entries() -> u64 {
    10_000
}

/// Per-client admission control.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSection {
    /// Requests per second each client earns (default: 5).
    #[serde(default = "default_rate")]
    pub rate: f64,
    #[serde(default = "default_burst")]
    pub burst: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            burst: default_burst(),
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_rate() -> f64 {
    5.0
}

fn default_burst() -> u32 {
    10
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_sweep_interval() -> u64 {
    60
}

/// What to query and how to serve it.
#[derive(Debug, Clone, Deserialize)]
pub struct SubtitlesSection {
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Appended to language tags as `lang|suffix`; empty disables it.
    #[serde(default = "default_language_suffix")]
    pub language_suffix: String,
    #[serde(default = "default_fallback_encoding")]
    pub fallback_encoding: String,
    /// `vtt` converts to WebVTT, `srt` serves the source file.
    #[serde(default = "default_format")]
    pub format: SubtitleFormat,
}

impl Default for SubtitlesSection {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            language_suffix: default_language_suffix(),
            fallback_encoding: default_fallback_encoding(),
            format: default_format(),
        }
    }
}

fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect()
}

fn default_language_suffix() -> String {
    DEFAULT_LANGUAGE_SUFFIX.to_string()
}

fn default_fallback_encoding() -> String {
    DEFAULT_FALLBACK_ENCODING.to_string()
}

fn default_format() -> SubtitleFormat {
    SubtitleFormat::WebVtt
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist. Without one, the first of the user and
    /// system files that exists is read, and defaults apply if neither does.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                info!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            GatewayError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(GatewayError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".titlovi-gateway").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/titlovi-gateway/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig::new()
            .api_url(&self.upstream.api_url)
            .download_url(&self.upstream.download_url)
            .timeout(Duration::from_secs(self.upstream.request_timeout_secs))
            .retry(
                RetryConfig::new()
                    .max_attempts(self.upstream.retry_attempts)
                    .delay(Duration::from_millis(self.upstream.retry_delay_ms)),
            )
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.cache.max_entries)
            .ttl(Duration::from_secs(self.cache.ttl_secs))
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig::new()
            .rate(self.rate_limit.rate)
            .burst(self.rate_limit.burst)
            .idle_timeout(Duration::from_secs(self.rate_limit.idle_timeout_secs))
            .sweep_interval(Duration::from_secs(self.rate_limit.sweep_interval_secs))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .fallback_encoding(&self.subtitles.fallback_encoding)
            .target_format(Some(self.subtitles.format))
    }

    /// Gateway builder with every section applied.
    pub fn gateway_builder(&self) -> GatewayBuilder {
        let suffix = Some(self.subtitles.language_suffix.clone()).filter(|s| !s.is_empty());
        GatewayBuilder::new()
            .upstream(self.upstream_config())
            .cache(self.cache_config())
            .pipeline(self.pipeline_config())
            .public_url(&self.server.public_url)
            .languages(self.subtitles.languages.iter().cloned())
            .language_suffix(suffix)
    }
}
