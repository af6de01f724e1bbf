//! Timeouts and bounded retries around hosted collaborators.
//!
//! Embedding and moderation calls are idempotent, so they are retried with
//! exponential backoff when the failure looks transient. The chat model call
//! is wrapped in a timeout only: a timed-out completion is reported, never
//! repeated.

use async_trait::async_trait;
use docent_core::error::ProviderError;
use docent_core::moderation::{ModerationVerdict, Moderator};
use docent_core::provider::{Provider, ProviderRequest, ProviderResponse};
use docent_core::{Embedder, Embedding};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;

/// How a wrapped call is bounded.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Total attempts, including the first. `0` is treated as `1`.
    pub attempts: u32,
    /// Delay before the second attempt; doubles for every further attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, attempts: u32) -> Self {
        Self { timeout, attempts, base_delay: Duration::from_millis(500) }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * EXPONENTIAL_BACKOFF_BASE.pow(attempt.saturating_sub(1))
    }

    /// Backoff after a failed attempt, stretched to the provider's `Retry-After`.
    fn delay_after(&self, attempt: u32, error: &ProviderError) -> Duration {
        let backoff = self.delay_before(attempt);
        match error {
            ProviderError::RateLimited { retry_after_secs } => {
                backoff.max(Duration::from_secs(*retry_after_secs))
            }
            _ => backoff,
        }
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let attempts = self.attempts.max(1);
        let mut last_error = ProviderError::Timeout(format!("{what}: no attempt made"));

        for attempt in 1..=attempts {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "{what} timed out after {}ms",
                    self.timeout.as_millis()
                ))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    warn!(what, attempt, attempts, error = %e, "Transient failure");
                    last_error = e;
                }
                Err(e) => {
                    warn!(what, error = %e, "Non-retryable failure");
                    return Err(e);
                }
            }

            if attempt < attempts {
                let delay = self.delay_after(attempt, &last_error);
                debug!(what, ?delay, "Waiting before retry");
                tokio::time::sleep(delay).await;
            }
        }

        error!(what, attempts, "All retry attempts failed");
        Err(last_error)
    }
}

/// Embedder wrapper applying a [`RetryPolicy`].
pub struct RetryingEmbedder {
    inner: Arc<dyn Embedder>,
    policy: RetryPolicy,
}

impl RetryingEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Embedder for RetryingEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.policy.run("embedding", || self.inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        self.policy.run("batch embedding", || self.inner.embed_batch(texts)).await
    }
}

/// Moderator wrapper applying a [`RetryPolicy`].
pub struct RetryingModerator {
    inner: Arc<dyn Moderator>,
    policy: RetryPolicy,
}

impl RetryingModerator {
    pub fn new(inner: Arc<dyn Moderator>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Moderator for RetryingModerator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, ProviderError> {
        self.policy.run("moderation", || self.inner.moderate(text)).await
    }
}

/// Provider wrapper with a hard deadline and no retry.
pub struct TimeoutProvider {
    inner: Arc<dyn Provider>,
    timeout: Duration,
}

impl TimeoutProvider {
    pub fn new(inner: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Provider for TimeoutProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    provider = %self.inner.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Completion timed out"
                );
                Err(ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    self.inner.name(),
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// Moderator used when moderation is disabled: lets everything through.
pub struct PassthroughModerator;

#[async_trait]
impl Moderator for PassthroughModerator {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn moderate(&self, _text: &str) -> Result<ModerationVerdict, ProviderError> {
        Ok(ModerationVerdict::allowed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_core::message::Message;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the scripted errors, then succeeds.
    struct FlakyEmbedder {
        failures: std::sync::Mutex<Vec<ProviderError>>,
        calls: AtomicU32,
    }

    impl FlakyEmbedder {
        fn new(failures: Vec<ProviderError>) -> Self {
            Self { failures: std::sync::Mutex::new(failures), calls: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn embed(&self, _text: &str) -> Result<Embedding, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.failures.lock().unwrap().pop();
            match next {
                Some(e) => Err(e),
                None => Ok(vec![1.0, 0.0]),
            }
        }
    }

    /// Times out once per scripted failure, then allows.
    struct FlakyModerator {
        failures: std::sync::Mutex<Vec<ProviderError>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Moderator for FlakyModerator {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn moderate(&self, _text: &str) -> Result<ModerationVerdict, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.failures.lock().unwrap().pop();
            match next {
                Some(e) => Err(e),
                None => Ok(ModerationVerdict::allowed()),
            }
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl Provider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _r: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(ProviderResponse {
                message: Message::assistant("late"),
                finish_reason: None,
                usage: None,
                model: "slow".into(),
            })
        }
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(5), attempts).with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy::new(Duration::from_secs(1), 4);
        assert_eq!(p.delay_before(1), Duration::from_millis(500));
        assert_eq!(p.delay_before(2), Duration::from_millis(1000));
        assert_eq!(p.delay_before(3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let inner = Arc::new(FlakyEmbedder::new(vec![
            ProviderError::Network("reset".into()),
            ProviderError::ApiError { status_code: 503, message: "busy".into() },
        ]));
        let embedder = RetryingEmbedder::new(inner.clone(), fast_policy(3));

        let v = embedder.embed("q").await.unwrap();
        assert_eq!(v, vec![1.0, 0.0]);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let inner = Arc::new(FlakyEmbedder::new(vec![
            ProviderError::Network("1".into()),
            ProviderError::Network("2".into()),
            ProviderError::Network("3".into()),
        ]));
        let embedder = RetryingEmbedder::new(inner.clone(), fast_policy(2));

        let err = embedder.embed("q").await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let inner = Arc::new(FlakyEmbedder::new(vec![ProviderError::ApiError {
            status_code: 400,
            message: "bad input".into(),
        }]));
        let embedder = RetryingEmbedder::new(inner.clone(), fast_policy(3));

        assert!(embedder.embed("q").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rate_limit_stretches_backoff() {
        let p = RetryPolicy::new(Duration::from_secs(1), 3);
        let limited = ProviderError::RateLimited { retry_after_secs: 20 };
        assert_eq!(p.delay_after(1, &limited), Duration::from_secs(20));
        // A shorter hint never shortens the backoff.
        let brief = ProviderError::RateLimited { retry_after_secs: 0 };
        assert_eq!(p.delay_after(2, &brief), Duration::from_millis(1000));
        let network = ProviderError::Network("reset".into());
        assert_eq!(p.delay_after(1, &network), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_retry_waits_for_retry_after() {
        let inner = Arc::new(FlakyEmbedder::new(vec![ProviderError::RateLimited {
            retry_after_secs: 30,
        }]));
        let embedder = RetryingEmbedder::new(inner.clone(), fast_policy(2));

        let started = tokio::time::Instant::now();
        embedder.embed("q").await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn flaky_moderation_is_retried() {
        let inner = Arc::new(FlakyModerator {
            failures: std::sync::Mutex::new(vec![ProviderError::Timeout("slow".into())]),
            calls: AtomicU32::new(0),
        });
        let moderator = RetryingModerator::new(inner.clone(), fast_policy(3));

        let verdict = moderator.moderate("hello").await.unwrap();
        assert!(!verdict.flagged);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn moderation_auth_failure_is_not_retried() {
        let inner = Arc::new(FlakyModerator {
            failures: std::sync::Mutex::new(vec![ProviderError::AuthenticationFailed(
                "bad key".into(),
            )]),
            calls: AtomicU32::new(0),
        });
        let moderator = RetryingModerator::new(inner.clone(), fast_policy(3));

        let err = moderator.moderate("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_timeout_is_fatal() {
        let provider = TimeoutProvider::new(Arc::new(SlowProvider), Duration::from_secs(1));
        let err = provider
            .complete(ProviderRequest {
                model: "m".into(),
                messages: vec![],
                temperature: 0.0,
                max_tokens: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[tokio::test]
    async fn passthrough_allows_everything() {
        let verdict = PassthroughModerator.moderate("anything").await.unwrap();
        assert!(!verdict.flagged);
    }
}
