//! Retry policy for persistence calls.
//!
//! A save or load that fails with a network error, a 5xx or a 429 is tried
//! again after a backoff delay. A 429 waits for the server's Retry-After,
//! clamped so one rate-limited video cannot stall the sync worker.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::time::Duration;

use tracing::{info_span, warn, Instrument};

use shotline_models::VideoId;

use crate::error::{SyncError, SyncResult};
use crate::metrics::record_retry;

// =============================================================================
// Configuration
// =============================================================================

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff before the first retry (in milliseconds)
    pub base_delay_ms: u64,
    /// Backoff ceiling (in milliseconds)
    pub max_delay_ms: u64,
    /// Longest Retry-After a 429 may impose (in milliseconds)
    pub max_retry_after_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
            max_retry_after_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let env_u64 = |key: &str, default: u64| {
            std::env::var(key)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };

        Self {
            max_retries: std::env::var("CONTINUITY_SYNC_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            base_delay_ms: env_u64("CONTINUITY_SYNC_RETRY_BASE_MS", defaults.base_delay_ms),
            max_delay_ms: env_u64("CONTINUITY_SYNC_RETRY_MAX_MS", defaults.max_delay_ms),
            max_retry_after_ms: env_u64(
                "CONTINUITY_SYNC_MAX_RETRY_AFTER_MS",
                defaults.max_retry_after_ms,
            ),
        }
    }
}

/// The persistence call being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistCall {
    Save,
    Load,
}

impl PersistCall {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistCall::Save => "save",
            PersistCall::Load => "load",
        }
    }
}

// =============================================================================
// Backoff
// =============================================================================

/// Delay schedule for one persistence call.
#[derive(Debug)]
pub struct Backoff<'a> {
    config: &'a RetryConfig,
    retries: u32,
}

impl<'a> Backoff<'a> {
    pub fn new(config: &'a RetryConfig) -> Self {
        Self { config, retries: 0 }
    }

    /// Retries taken so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay before trying again after `err`, or `None` if the error is
    /// final or the retry budget is spent.
    pub fn next_delay(&mut self, err: &SyncError) -> Option<Duration> {
        if !err.is_retryable() || self.retries >= self.config.max_retries {
            return None;
        }

        let delay_ms = match err.retry_after_ms() {
            Some(after) => after.min(self.config.max_retry_after_ms),
            None => self.backoff_ms(),
        };
        self.retries += 1;
        Some(Duration::from_millis(delay_ms))
    }

    /// Doubling ceiling per retry; the delay is drawn from its upper half.
    fn backoff_ms(&self) -> u64 {
        let ceiling = self
            .config
            .base_delay_ms
            .saturating_mul(1u64.checked_shl(self.retries).unwrap_or(u64::MAX))
            .min(self.config.max_delay_ms);

        let half = ceiling / 2;
        let spread = ceiling - half;
        let jitter = if spread == 0 {
            0
        } else {
            RandomState::new().build_hasher().finish() % (spread + 1)
        };
        half + jitter
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Run a save or load for `video_id`, retrying transient failures.
///
/// Errors that are not retryable, and the last error once the budget is
/// spent, are returned as they are.
pub async fn retry_persistence<T, F, Fut>(
    config: &RetryConfig,
    call: PersistCall,
    video_id: &VideoId,
    op: F,
) -> SyncResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = SyncResult<T>>,
{
    let mut backoff = Backoff::new(config);

    loop {
        let attempt = backoff.retries() + 1;
        let span = info_span!(
            "continuity_persist",
            call = call.as_str(),
            video_id = %video_id,
            attempt
        );

        let err = match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        let Some(delay) = backoff.next_delay(&err) else {
            return Err(err);
        };

        warn!(
            call = call.as_str(),
            video_id = %video_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Continuity persistence failed, retrying"
        );
        record_retry(call.as_str());
        tokio::time::sleep(delay).await;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 50,
            max_retry_after_ms: 200,
        }
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay_ms, 100);
        assert_eq!(config.max_delay_ms, 5000);
        assert_eq!(config.max_retry_after_ms, 30_000);
    }

    #[test]
    fn test_retry_after_is_honoured_up_to_cap() {
        let config = fast_config();
        let mut backoff = Backoff::new(&config);

        assert_eq!(
            backoff.next_delay(&SyncError::RateLimited(150)),
            Some(Duration::from_millis(150))
        );
        // An hour-long Retry-After is clamped
        assert_eq!(
            backoff.next_delay(&SyncError::RateLimited(3_600_000)),
            Some(Duration::from_millis(200))
        );
    }

    #[test]
    fn test_backoff_stays_within_ceiling() {
        let config = RetryConfig {
            max_retries: 64,
            base_delay_ms: 1000,
            max_delay_ms: 2000,
            max_retry_after_ms: 30_000,
        };
        let mut backoff = Backoff::new(&config);
        let err = SyncError::ServerError(503, "unavailable".into());

        let first = backoff.next_delay(&err).unwrap().as_millis();
        assert!((500..=1000).contains(&first));
        for _ in 0..40 {
            let delay = backoff.next_delay(&err).unwrap().as_millis();
            assert!((1000..=2000).contains(&delay));
        }
    }

    #[test]
    fn test_budget_and_final_errors_stop_backoff() {
        let config = fast_config();
        let mut backoff = Backoff::new(&config);
        let server = SyncError::ServerError(500, "boom".into());

        assert!(backoff.next_delay(&SyncError::from_http_status(400, "bad")).is_none());
        for _ in 0..3 {
            assert!(backoff.next_delay(&server).is_some());
        }
        assert!(backoff.next_delay(&server).is_none());
        assert_eq!(backoff.retries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = &AtomicU32::new(0);
        let result = retry_persistence(&fast_config(), PersistCall::Save, &"v1".into(), || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(SyncError::ServerError(503, "unavailable".into()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_with_last_error() {
        let calls = &AtomicU32::new(0);
        let result: SyncResult<()> =
            retry_persistence(&fast_config(), PersistCall::Load, &"v1".into(), || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(SyncError::ServerError(500 + n as u16, "boom".into()))
            })
            .await;

        assert!(matches!(result, Err(SyncError::ServerError(503, _))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_save_waits_capped_retry_after() {
        let calls = &AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let result = retry_persistence(&fast_config(), PersistCall::Save, &"v1".into(), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SyncError::RateLimited(3_600_000))
            } else {
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(200));
        assert!(waited < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let calls = &AtomicU32::new(0);
        let result: SyncResult<()> =
            retry_persistence(&fast_config(), PersistCall::Save, &"v1".into(), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SyncError::from_http_status(400, "bad request"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
