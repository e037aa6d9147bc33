//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus); without
//! a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `titlovi_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `operation`: upstream operation ("login", "search", "download")
//! - `status`: "ok" or "error" ("unauthorized" for upstream 401s)
//! - `keyspace`: response cache key-space ("search" | "subtitle")

/// Upstream HTTP attempts, one per request actually sent.
///
/// Labels: `operation`, `status` ("ok" | "unauthorized" | "error"). A
/// rejected session token is counted as "unauthorized", apart from
/// transport and server failures.
pub const UPSTREAM_REQUESTS_TOTAL: &str = "titlovi_upstream_requests_total";

/// Retry attempts (not counting the initial request).
///
/// Labels: `operation`.
pub const RETRIES_TOTAL: &str = "titlovi_retries_total";

/// Upstream login calls made by the session manager.
///
/// Labels: `status` ("ok" | "error").
pub const LOGINS_TOTAL: &str = "titlovi_logins_total";

/// Response cache hits.
///
/// Labels: `keyspace`.
pub const CACHE_HITS_TOTAL: &str = "titlovi_cache_hits_total";

/// Response cache misses (each one runs the compute path once per key).
///
/// Labels: `keyspace`.
pub const CACHE_MISSES_TOTAL: &str = "titlovi_cache_misses_total";

/// Requests rejected by the per-client rate limiter.
pub const RATE_LIMITED_TOTAL: &str = "titlovi_rate_limited_total";

/// Idle client buckets removed by the eviction sweep.
pub const RATE_LIMITER_EVICTIONS_TOTAL: &str = "titlovi_rate_limiter_evictions_total";
