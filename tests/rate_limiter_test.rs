//! Token bucket admission and idle eviction.
//!
//! Time is paused so refill and sweep timing are exact.

use std::time::Duration;

use titlovi_gateway::{GatewayError, RateLimitConfig, RateLimiter};

const CLIENT: &str = "203.0.113.7";

#[tokio::test(start_paused = true)]
async fn burst_then_refill() {
    let limiter = RateLimiter::new(RateLimitConfig::new().rate(2.0).burst(3)).unwrap();

    assert!(limiter.admit(CLIENT));
    assert!(limiter.admit(CLIENT));
    assert!(limiter.admit(CLIENT));
    assert!(!limiter.admit(CLIENT));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(limiter.admit(CLIENT));
}

#[tokio::test(start_paused = true)]
async fn refill_is_capped_at_burst() {
    let limiter = RateLimiter::new(RateLimitConfig::new().rate(2.0).burst(3)).unwrap();
    assert!(limiter.admit(CLIENT));

    tokio::time::advance(Duration::from_secs(60)).await;

    let admitted = (0..10).filter(|_| limiter.admit(CLIENT)).count();
    assert_eq!(admitted, 3);
}

#[tokio::test(start_paused = true)]
async fn clients_have_independent_buckets() {
    let limiter = RateLimiter::new(RateLimitConfig::new().rate(1.0).burst(1)).unwrap();

    assert!(limiter.admit("198.51.100.1"));
    assert!(!limiter.admit("198.51.100.1"));
    assert!(limiter.admit("198.51.100.2"));
    assert_eq!(limiter.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn check_reports_rate_limited() {
    let limiter = RateLimiter::new(RateLimitConfig::new().rate(1.0).burst(1)).unwrap();
    limiter.check(CLIENT).unwrap();
    assert_eq!(limiter.check(CLIENT), Err(GatewayError::RateLimited));
}

#[tokio::test(start_paused = true)]
async fn manual_eviction_removes_only_idle_clients() {
    let limiter = RateLimiter::new(
        RateLimitConfig::new().idle_timeout(Duration::from_secs(10)),
    )
    .unwrap();

    limiter.admit("198.51.100.1");
    tokio::time::advance(Duration::from_secs(8)).await;
    limiter.admit("198.51.100.2");
    tokio::time::advance(Duration::from_secs(5)).await;

    assert_eq!(limiter.evict_idle(), 1);
    assert_eq!(limiter.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn sweep_evicts_idle_clients() {
    let limiter = RateLimiter::new(
        RateLimitConfig::new()
            .idle_timeout(Duration::from_secs(10))
            .sweep_interval(Duration::from_secs(5)),
    )
    .unwrap();
    limiter.start_eviction();

    limiter.admit("198.51.100.1");
    tokio::time::sleep(Duration::from_secs(8)).await;
    limiter.admit("198.51.100.2");

    // Sweeps at 10s and 15s; only the first client has been idle long enough.
    tokio::time::sleep(Duration::from_secs(8)).await;
    assert_eq!(limiter.len(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(limiter.is_empty());

    limiter.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn evicted_client_starts_with_full_bucket() {
    let limiter = RateLimiter::new(
        RateLimitConfig::new()
            .rate(0.01)
            .burst(2)
            .idle_timeout(Duration::from_secs(10)),
    )
    .unwrap();

    assert!(limiter.admit(CLIENT));
    assert!(limiter.admit(CLIENT));
    assert!(!limiter.admit(CLIENT));

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(limiter.evict_idle(), 1);
    assert!(limiter.admit(CLIENT));
    assert!(limiter.admit(CLIENT));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_sweep() {
    let limiter = RateLimiter::new(
        RateLimitConfig::new()
            .idle_timeout(Duration::from_secs(1))
            .sweep_interval(Duration::from_secs(1)),
    )
    .unwrap();
    limiter.start_eviction();
    limiter.shutdown().await;

    limiter.admit(CLIENT);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(limiter.len(), 1);

    // Restarting after shutdown is a no-op.
    limiter.start_eviction();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(limiter.len(), 1);
}

#[test]
fn rates_without_a_representable_period_are_rejected() {
    for rate in [1e-30, f64::INFINITY, -1.0] {
        let err = RateLimiter::new(RateLimitConfig::new().rate(rate)).err().unwrap();
        assert!(matches!(err, GatewayError::Configuration(_)), "{rate}: {err}");
    }
}
