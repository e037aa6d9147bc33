//! One typed key-space of the response cache

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;

use crate::telemetry;
use crate::types::Lookup;
use crate::{GatewayError, Result};

/// A cached value with the TTL it was stored under.
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
}

/// Expire each entry after its own TTL, restarting the clock on overwrite.
struct PerEntryTtl;

impl<K, V> Expiry<K, Entry<V>> for PerEntryTtl {
    fn expire_after_create(&self, _key: &K, entry: &Entry<V>, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &K,
        entry: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

pub(super) struct KeySpace<V> {
    name: &'static str,
    default_ttl: Duration,
    cache: Cache<String, Entry<V>>,
}

impl<V> KeySpace<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(super) fn new(name: &'static str, max_entries: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .name(name)
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self {
            name,
            default_ttl,
            cache,
        }
    }

    pub(super) fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub(super) async fn get(&self, key: &str) -> Option<V> {
        match self.cache.get(key).await {
            Some(entry) => {
                self.record(true);
                Some(entry.value)
            }
            None => {
                self.record(false);
                None
            }
        }
    }

    pub(super) async fn set(&self, key: &str, value: V, ttl: Duration) {
        self.cache.insert(key.to_string(), Entry { value, ttl }).await;
    }

    /// Return the cached value or run `compute` once for all concurrent
    /// callers of `key`. Failures are handed to every waiter and not stored.
    pub(super) async fn get_or_compute<F>(&self, key: &str, compute: F) -> Result<Lookup<V>>
    where
        F: Future<Output = Result<V>>,
    {
        let ttl = self.default_ttl;
        let entry = self
            .cache
            .entry_by_ref(key)
            .or_try_insert_with(async move { compute.await.map(|value| Entry { value, ttl }) })
            .await
            .map_err(Arc::<GatewayError>::unwrap_or_clone)?;

        // Only the caller whose future ran sees a fresh entry; callers that
        // waited on it were served without touching the upstream.
        let fresh = entry.is_fresh();
        self.record(!fresh);
        let value = entry.into_value().value;
        Ok(if fresh {
            Lookup::miss(value)
        } else {
            Lookup::hit(value)
        })
    }

    pub(super) async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    pub(super) async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    fn record(&self, hit: bool) {
        if hit {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "keyspace" => self.name).increment(1);
        } else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "keyspace" => self.name).increment(1);
        }
    }
}
