//! Retry policy for outbound platform calls.
//!
//! Wraps a single send attempt and recovers locally from two transient
//! failure classes:
//!
//! - **Rate limiting** — error code 429, or a description mentioning
//!   "too many requests" / "retry later". The server-instructed delay is
//!   parsed out of the description (`retry after <n>`), clamped to
//!   [`MAX_WAIT`], slept through (plus one extra second — the platform
//!   under-reports by one), and the call retried up to the policy's bound.
//!   When no delay is parseable the wait falls back to exponential backoff.
//! - **Reply target gone** — error code 400 with "reply message not found".
//!   Retried exactly once with the reply reference omitted, never recursively.
//!
//! Every other error propagates unmodified; this policy is purely additive
//! retry, never error translation.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::integration::api::{ApiError, ApiResult};

/// Upper bound on a single rate-limit wait.
pub const MAX_WAIT: Duration = Duration::from_secs(600);

/// Bounded retry for one outbound send.
///
/// The closure receives `omit_reply: bool`; it must issue the send without a
/// reply reference when that is `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of rate-limit retries before the error surfaces.
    pub max_retries: u32,
}

impl RetryPolicy {
    /// Policy for generic sends (documents, stickers, media groups, actions).
    pub const GENERIC: Self = Self { max_retries: 10 };

    /// Policy for text, photo and forward sends, which tolerate more retries.
    pub const PRIORITY: Self = Self { max_retries: 20 };

    /// Runs `op` until it succeeds, a retry bound is exhausted, or a
    /// non-transient error occurs.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> ApiResult<T>
    where
        F: FnMut(bool) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut omit_reply = false;
        let mut rate_limited_tries: u32 = 0;
        loop {
            match op(omit_reply).await {
                Ok(value) => return Ok(value),
                Err(err) if is_rate_limited(&err) => {
                    if rate_limited_tries >= self.max_retries {
                        return Err(err);
                    }
                    let wait = match server_wait(&err) {
                        Some(secs) => {
                            let clamped = secs.min(MAX_WAIT.as_secs());
                            if clamped < secs {
                                warn!(instructed = secs, "clamping rate-limit wait to maximum");
                            }
                            // The platform consistently wants one second more
                            // than it asks for.
                            Duration::from_secs(clamped + 1)
                        }
                        None => backoff_delay(rate_limited_tries),
                    };
                    warn!(
                        wait_secs = wait.as_secs(),
                        attempt = rate_limited_tries + 1,
                        "rate limited, sleeping before retry"
                    );
                    tokio::time::sleep(wait).await;
                    rate_limited_tries += 1;
                }
                Err(err) if !omit_reply && is_reply_target_missing(&err) => {
                    debug!("reply target no longer exists, retrying without reply reference");
                    omit_reply = true;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Exponential backoff delay for the n-th rate-limit retry without a
/// server-specified wait.
fn backoff_delay(attempt: u32) -> Duration {
    let secs = 1u64 << attempt.min(16);
    Duration::from_secs(secs.min(MAX_WAIT.as_secs()))
}

/// Whether an error is a rate-limit response.
pub fn is_rate_limited(error: &ApiError) -> bool {
    match error {
        ApiError::Server {
            error_code,
            description,
        } => {
            let description = description.to_ascii_lowercase();
            *error_code == 429
                || description.contains("too many requests")
                || description.contains("retry later")
        }
        _ => false,
    }
}

/// The server-instructed wait in seconds, parsed from the error description.
pub fn server_wait(error: &ApiError) -> Option<u64> {
    static RETRY_AFTER: OnceLock<Regex> = OnceLock::new();
    let re = RETRY_AFTER.get_or_init(|| Regex::new(r"(?i)retry after (\d+)").expect("valid regex"));

    let ApiError::Server { description, .. } = error else {
        return None;
    };
    re.captures(description)?.get(1)?.as_str().parse().ok()
}

/// Whether an error reports the reply target gone.
pub fn is_reply_target_missing(error: &ApiError) -> bool {
    match error {
        ApiError::Server {
            error_code,
            description,
        } => *error_code == 400 && description.to_ascii_lowercase().contains("reply message not found"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn rate_limit_error() -> ApiError {
        ApiError::server(429, "Too Many Requests: retry after 5")
    }

    #[test]
    fn classification() {
        assert!(is_rate_limited(&rate_limit_error()));
        assert!(is_rate_limited(&ApiError::server(400, "Flood: retry later")));
        assert!(!is_rate_limited(&ApiError::server(400, "Bad Request: chat not found")));
        assert!(!is_rate_limited(&ApiError::Transport("conn reset".into())));

        assert_eq!(server_wait(&rate_limit_error()), Some(5));
        assert_eq!(server_wait(&ApiError::server(429, "Too Many Requests")), None);

        assert!(is_reply_target_missing(&ApiError::server(
            400,
            "Bad Request: reply message not found"
        )));
        assert!(!is_reply_target_missing(&ApiError::server(
            429,
            "reply message not found"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_instructed_wait_plus_one_then_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);

        let started = Instant::now();
        let result = RetryPolicy::GENERIC
            .run(|_| {
                let calls = Arc::clone(&calls2);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(rate_limit_error())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn instructed_wait_is_clamped() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);

        let started = Instant::now();
        let _ = RetryPolicy::GENERIC
            .run(|_| {
                let calls = Arc::clone(&calls2);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ApiError::server(429, "Too Many Requests: retry after 4000"))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(started.elapsed(), Duration::from_secs(601));
    }

    #[tokio::test(start_paused = true)]
    async fn eleventh_rate_limit_propagates_on_generic_policy() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);

        let result: ApiResult<()> = RetryPolicy::GENERIC
            .run(|_| {
                let calls = Arc::clone(&calls2);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(rate_limit_error())
                }
            })
            .await;

        assert!(matches!(result, Err(ApiError::Server { error_code: 429, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn unparseable_wait_uses_exponential_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);

        let started = Instant::now();
        let result = RetryPolicy::GENERIC
            .run(|_| {
                let calls = Arc::clone(&calls2);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                        Err(ApiError::server(429, "Too Many Requests"))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        // 1 + 2 + 4 seconds of backoff.
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn reply_target_missing_retries_once_without_reply() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);

        let result = RetryPolicy::PRIORITY
            .run(|omit_reply| {
                let calls = Arc::clone(&calls2);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if omit_reply {
                        Ok("sent without reply")
                    } else {
                        Err(ApiError::server(400, "Bad Request: reply message not found"))
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "sent without reply");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reply_target_missing_twice_propagates() {
        let result: ApiResult<()> = RetryPolicy::GENERIC
            .run(|_| async { Err(ApiError::server(400, "Bad Request: reply message not found")) })
            .await;
        assert!(matches!(result, Err(ApiError::Server { error_code: 400, .. })));
    }

    #[tokio::test]
    async fn other_errors_propagate_unmodified() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = Arc::clone(&calls);

        let result: ApiResult<()> = RetryPolicy::GENERIC
            .run(|_| {
                let calls = Arc::clone(&calls2);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::server(403, "Forbidden: bot was blocked by the user"))
                }
            })
            .await;

        assert!(matches!(result, Err(ApiError::Server { error_code: 403, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
