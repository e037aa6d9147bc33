//! Per-client admission control.
//!
//! Every inbound request is charged against a `governor` limiter keyed by
//! the client's network address (GCRA, equivalent to a token bucket of
//! `burst` tokens refilled at `rate` per second). Buckets are created lazily
//! on first contact and removed by a background sweep once the client has
//! been idle for [`RateLimitConfig::idle_timeout`], so memory tracks recently
//! active clients rather than every client ever seen.
//!
//! The limiter guards the gateway itself. It is independent of the upstream
//! retry policy and runs before any other request processing.

mod bucket;
mod identity;

pub use identity::resolve_client_identity;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use governor::Quota;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use self::bucket::{ClientBucket, TokioClock};
use crate::telemetry;
use crate::{GatewayError, Result};

type BucketMap = HashMap<String, Arc<ClientBucket>>;

/// Token bucket parameters and eviction cadence.
///
/// ```rust
/// # use titlovi_gateway::RateLimitConfig;
/// # use std::time::Duration;
/// let config = RateLimitConfig::new()
///     .rate(2.0)
///     .burst(3)
///     .idle_timeout(Duration::from_secs(300));
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Tokens added per second. Default: 5.
    pub rate: f64,
    /// Bucket capacity. Default: 10.
    pub burst: u32,
    /// A client unseen for this long loses its bucket. Default: 10 minutes.
    pub idle_timeout: Duration,
    /// How often the eviction sweep runs. Default: 60s.
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: 5.0,
            burst: 10,
            idle_timeout: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate(mut self, per_second: f64) -> Self {
        self.rate = per_second;
        self
    }

    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(GatewayError::Configuration(format!(
                "rate limit rate must be positive, got {}",
                self.rate
            )));
        }
        if self.burst == 0 {
            return Err(GatewayError::Configuration(
                "rate limit burst must be at least 1".into(),
            ));
        }
        if bucket::quota(self.rate, self.burst).is_none() {
            return Err(GatewayError::Configuration(format!(
                "rate limit of {}/s is out of range",
                self.rate
            )));
        }
        if self.sweep_interval.is_zero() {
            return Err(GatewayError::Configuration(
                "rate limit sweep interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Keyed token-bucket rate limiter with idle eviction.
pub struct RateLimiter {
    config: RateLimitConfig,
    quota: Quota,
    clock: TokioClock,
    buckets: Arc<RwLock<BucketMap>>,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Create a limiter. The eviction sweep is not running until
    /// [`start_eviction`](Self::start_eviction) is called.
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        config.validate()?;
        let quota = bucket::quota(config.rate, config.burst).ok_or_else(|| {
            GatewayError::Configuration(format!("rate limit of {}/s is out of range", config.rate))
        })?;
        Ok(Self {
            config,
            quota,
            clock: TokioClock::new(),
            buckets: Arc::new(RwLock::new(HashMap::new())),
            shutdown: CancellationToken::new(),
            sweeper: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Charge one request to `identity`. Returns `false` when the client's
    /// bucket is empty.
    pub fn admit(&self, identity: &str) -> bool {
        let now = Instant::now();
        let bucket = self.bucket_for(identity, now);
        let allowed = bucket.try_acquire(now);
        if !allowed {
            metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
            debug!(client = identity, "rate limited");
        }
        allowed
    }

    /// Like [`admit`](Self::admit), as a `Result` for `?` call sites.
    pub fn check(&self, identity: &str) -> Result<()> {
        if self.admit(identity) {
            Ok(())
        } else {
            Err(GatewayError::RateLimited)
        }
    }

    /// Remove buckets idle for longer than the configured timeout.
    ///
    /// Returns the number of buckets removed. Called by the background sweep;
    /// exposed for callers that manage their own schedule.
    pub fn evict_idle(&self) -> usize {
        evict_idle(&self.buckets, self.config.idle_timeout, Instant::now())
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.buckets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the periodic eviction sweep on the current tokio runtime.
    ///
    /// Idempotent: a second call while the sweep runs does nothing.
    pub fn start_eviction(&self) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() || self.shutdown.is_cancelled() {
            return;
        }

        let buckets = self.buckets.clone();
        let token = self.shutdown.clone();
        let idle_timeout = self.config.idle_timeout;
        let interval = self.config.sweep_interval;

        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        evict_idle(&buckets, idle_timeout, Instant::now());
                    }
                }
            }
            debug!("rate limiter sweep stopped");
        }));
        info!(
            interval_secs = interval.as_secs_f64(),
            idle_timeout_secs = idle_timeout.as_secs_f64(),
            "rate limiter sweep started"
        );
    }

    /// Stop the eviction sweep and wait for it to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "rate limiter sweep task failed");
            }
        }
    }

    fn bucket_for(&self, identity: &str, now: Instant) -> Arc<ClientBucket> {
        if let Some(bucket) = self.buckets.read().get(identity) {
            return bucket.clone();
        }
        self.buckets
            .write()
            .entry(identity.to_string())
            .or_insert_with(|| Arc::new(ClientBucket::new(self.quota, &self.clock, now)))
            .clone()
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn evict_idle(buckets: &RwLock<BucketMap>, idle_timeout: Duration, now: Instant) -> usize {
    let idle: Vec<String> = buckets
        .read()
        .iter()
        .filter(|(_, bucket)| bucket.idle_for(now) > idle_timeout)
        .map(|(identity, _)| identity.clone())
        .collect();
    if idle.is_empty() {
        return 0;
    }

    // Re-check under the write lock: a client may have come back in between.
    let mut map = buckets.write();
    let mut removed = 0;
    for identity in idle {
        let still_idle = map
            .get(&identity)
            .is_some_and(|bucket| bucket.idle_for(now) > idle_timeout);
        if still_idle {
            map.remove(&identity);
            removed += 1;
        }
    }
    drop(map);

    metrics::counter!(telemetry::RATE_LIMITER_EVICTIONS_TOTAL).increment(removed as u64);
    debug!(removed, "evicted idle rate limiter buckets");
    removed
}
