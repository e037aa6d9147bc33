//! Limiter state for one client

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::Clock;
use governor::middleware::NoOpMiddleware;
use governor::nanos::Nanos;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use parking_lot::Mutex;
use tokio::time::Instant;

/// governor clock backed by tokio's clock, so a paused runtime drives refill.
#[derive(Debug, Clone)]
pub(super) struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub(super) fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    type Instant = Nanos;

    fn now(&self) -> Nanos {
        Nanos::from(self.origin.elapsed())
    }
}

/// `rate` permits per second, up to `burst` at once. `None` when the
/// parameters cannot be expressed as a quota.
pub(super) fn quota(rate: f64, burst: u32) -> Option<Quota> {
    let burst = NonZeroU32::new(burst)?;
    let period = Duration::try_from_secs_f64(rate.recip()).ok()?;
    Quota::with_period(period).map(|quota| quota.allow_burst(burst))
}

/// A GCRA limiter plus the time of the client's last request.
pub(super) struct ClientBucket {
    limiter: RateLimiter<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<Nanos>>,
    last_seen: Mutex<Instant>,
}

impl ClientBucket {
    /// A bucket that starts with the full burst available.
    pub(super) fn new(quota: Quota, clock: &TokioClock, now: Instant) -> Self {
        Self {
            limiter: RateLimiter::direct_with_clock(quota, clock),
            last_seen: Mutex::new(now),
        }
    }

    pub(super) fn try_acquire(&self, now: Instant) -> bool {
        *self.last_seen.lock() = now;
        self.limiter.check().is_ok()
    }

    pub(super) fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_seen.lock())
    }
}
