//! Cache-aside store for search results and subtitle files.
//!
//! # Keys
//!
//! - search results are keyed by the caller's video id, which already
//!   embeds season and episode (`tt0944947:1:2`);
//! - subtitle files are keyed by [`ResponseCache::subtitle_key`], the
//!   composite `{type}-{id}` of the download route.
//!
//! The two key-spaces are separate moka caches with their own value types.
//! Each is bounded by [`CacheConfig::max_entries`] independently of TTL, so
//! adversarial key diversity cannot grow memory without limit.
//!
//! # Expiry
//!
//! Entries expire after the TTL they were stored with. `set_*` uses the
//! configured default; `set_*_with_ttl` overrides it per entry.
//!
//! # Single-flight
//!
//! [`ResponseCache::search_or_fetch`] and [`ResponseCache::subtitle_or_fetch`]
//! coalesce concurrent misses for the same key into one computation. Late
//! arrivals await the in-flight result. A failed computation is returned to
//! every waiter and leaves nothing behind, so the next request tries again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::keyspace::KeySpace;
use crate::Result;
use crate::types::{Lookup, SubtitleFile, SubtitleItem};

/// Configuration for the response cache.
///
/// ```rust
/// # use titlovi_gateway::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(5_000)
///     .ttl(Duration::from_secs(300));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries per key-space. Default: 10,000.
    pub max_entries: u64,
    /// Default time-to-live. Default: 10 minutes.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// In-memory TTL cache with one typed key-space per response kind.
pub struct ResponseCache {
    search: KeySpace<Arc<Vec<SubtitleItem>>>,
    subtitles: KeySpace<SubtitleFile>,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            search: KeySpace::new("search", config.max_entries, config.ttl),
            subtitles: KeySpace::new("subtitle", config.max_entries, config.ttl),
        }
    }

    /// Key of a subtitle file in the subtitle key-space.
    pub fn subtitle_key(media_type: &str, media_id: &str) -> String {
        format!("{media_type}-{media_id}")
    }

    /// Default TTL applied by `set_*` and the `*_or_fetch` methods.
    pub fn ttl(&self) -> Duration {
        self.search.default_ttl()
    }

    // Search results

    pub async fn get_search(&self, key: &str) -> Option<Arc<Vec<SubtitleItem>>> {
        self.search.get(key).await
    }

    pub async fn set_search(&self, key: &str, items: Arc<Vec<SubtitleItem>>) {
        self.search.set(key, items, self.search.default_ttl()).await;
    }

    pub async fn set_search_with_ttl(&self, key: &str, items: Arc<Vec<SubtitleItem>>, ttl: Duration) {
        self.search.set(key, items, ttl).await;
    }

    /// Cached results for `key`, or the result of `fetch` stored under it.
    pub async fn search_or_fetch<F>(&self, key: &str, fetch: F) -> Result<Lookup<Arc<Vec<SubtitleItem>>>>
    where
        F: Future<Output = Result<Arc<Vec<SubtitleItem>>>>,
    {
        self.search.get_or_compute(key, fetch).await
    }

    // Subtitle files

    pub async fn get_subtitle(&self, key: &str) -> Option<SubtitleFile> {
        self.subtitles.get(key).await
    }

    pub async fn set_subtitle(&self, key: &str, file: SubtitleFile) {
        self.subtitles.set(key, file, self.subtitles.default_ttl()).await;
    }

    pub async fn set_subtitle_with_ttl(&self, key: &str, file: SubtitleFile, ttl: Duration) {
        self.subtitles.set(key, file, ttl).await;
    }

    /// Cached file for `key`, or the result of `fetch` stored under it.
    pub async fn subtitle_or_fetch<F>(&self, key: &str, fetch: F) -> Result<Lookup<SubtitleFile>>
    where
        F: Future<Output = Result<SubtitleFile>>,
    {
        self.subtitles.get_or_compute(key, fetch).await
    }

    /// Drop a key from both key-spaces.
    pub async fn invalidate(&self, key: &str) {
        self.search.invalidate(key).await;
        self.subtitles.invalidate(key).await;
    }

    /// Live entries across both key-spaces, after flushing pending
    /// maintenance.
    pub async fn entry_count(&self) -> u64 {
        self.search.entry_count().await + self.subtitles.entry_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 10_000);
        assert_eq!(config.ttl, Duration::from_secs(600));
    }

    #[test]
    fn subtitle_key_is_type_then_id() {
        assert_eq!(ResponseCache::subtitle_key("1", "42"), "1-42");
    }

    #[tokio::test]
    async fn key_spaces_do_not_collide() {
        let cache = ResponseCache::new(&CacheConfig::default());
        cache.set_search("1-42", Arc::new(Vec::new())).await;

        assert!(cache.get_subtitle("1-42").await.is_none());
        assert!(cache.get_search("1-42").await.is_some());
    }
}
