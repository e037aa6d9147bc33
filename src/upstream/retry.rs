//! Bounded retry with a fixed inter-attempt delay.
//!
//! The upstream index is a small service; failures are usually momentary
//! (a restart, a dropped connection), so the gateway retries a fixed number
//! of times with a constant pause instead of backing off exponentially.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::telemetry;
use crate::{GatewayError, Result};

/// Configuration for retry behaviour on transient errors.
///
/// ```rust
/// # use titlovi_gateway::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Pause between attempts. Default: 500ms.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single attempt, no retry.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(GatewayError::Configuration(
                "retry max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Position of one call within the retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// Zero-based attempt index.
    pub index: u32,
    pub max_attempts: u32,
}

impl Attempt {
    /// No retry follows this attempt, whatever it returns.
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.max_attempts
    }
}

/// Execute an async operation with bounded retry.
///
/// Transient errors (see [`GatewayError::is_transient`]) are retried up to
/// `config.max_attempts` with `config.delay` between attempts; the last
/// transient error is returned once the budget is spent. Permanent errors
/// are returned immediately. `f` is told which attempt it is running.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: &str, f: F) -> Result<T>
where
    F: Fn(Attempt) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts {
        if attempt > 0 {
            metrics::counter!(telemetry::RETRIES_TOTAL, "operation" => operation.to_owned())
                .increment(1);
        }
        let current = Attempt {
            index: attempt,
            max_attempts: config.max_attempts,
        };
        match f(current).await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < config.max_attempts {
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = config.delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(config.delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        GatewayError::Configuration("retry budget allows no attempts".into())
    }))
}
