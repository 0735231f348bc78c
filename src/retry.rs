//! Caller-side retry with exponential backoff.
//!
//! Providers perform exactly one round trip per call. This module decides
//! whether to try again: only errors that report
//! [`is_retryable`](medrag_core::RagError::is_retryable) are retried, after 1s, 2s, 4s,
//! ... capped at 32s.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::warn;

use medrag_core::embedding::EmbeddingProvider;
use medrag_core::error::Result;

/// 429 and 5xx are transient; every other non-success status is not.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Never retry.
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Scale every delay to `base`. Used by tests.
    pub fn with_base_delay(mut self, base: Duration) -> Self {
        self.base_delay = base;
        self
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << (attempt.saturating_sub(1)).min(5))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retries are exhausted. The last error is returned.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay(attempt);
                    warn!(
                        operation = what,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Wraps an [`EmbeddingProvider`] so every call goes through a
/// [`RetryPolicy`]. Ingestion uses it so a transient failure does not
/// abort a long run.
pub struct RetryingEmbedder<'a> {
    inner: &'a dyn EmbeddingProvider,
    policy: RetryPolicy,
}

impl<'a> RetryingEmbedder<'a> {
    pub fn new(inner: &'a dyn EmbeddingProvider, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl EmbeddingProvider for RetryingEmbedder<'_> {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dims(&self) -> usize {
        self.inner.dims()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.policy.run("embed", || self.inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.policy
            .run("embed_batch", || self.inner.embed_batch(texts))
            .await
    }
}

/// Map a failed HTTP round trip to a provider error.
pub fn classify_transport(provider: &str, e: &reqwest::Error) -> (String, bool) {
    if e.is_timeout() {
        (format!("{} request timed out", provider), true)
    } else if e.is_connect() {
        (format!("{} connection failed: {}", provider, e), true)
    } else if e.is_decode() {
        (format!("{} returned an unreadable response: {}", provider, e), false)
    } else {
        (format!("{} request failed: {}", provider, e), true)
    }
}

/// Build a provider or generation error from a non-success status.
pub fn status_error(provider: &str, status: StatusCode, body: &str) -> (String, bool) {
    let mut body = body.trim().to_string();
    if body.len() > 300 {
        let cut = (0..=300).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        body.truncate(cut);
    }
    (
        format!("{} API error {}: {}", provider, status, body),
        is_retryable_status(status),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrag_core::error::RagError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::new(10);
        let secs: Vec<u64> = (1..=8).map(|a| policy.delay(a).as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 32, 32, 32]);
    }

    #[test]
    fn test_status_classification() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = &AtomicU32::new(0);
        let result = fast(3)
            .run("op", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RagError::generation("503", true))
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = fast(5)
            .run("op", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RagError::provider("401 Unauthorized", false))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = fast(2)
            .run("op", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RagError::provider("429", true))
            })
            .await;
        assert!(result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
