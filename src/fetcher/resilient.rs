//! Retrying fetcher implementation
//!
//! Wraps a single-attempt `Transport` with:
//! - Identity rotation per attempt
//! - Randomized politeness delay before every request
//! - Challenge (CAPTCHA / rate-limit) detection with a long cooldown
//! - Flat backoff after non-200 statuses and transport errors

use crate::fetcher::{
    AttemptFailure, BackoffPolicy, Document, FetchFailure, Fetcher, IdentityPool, RawPage,
    Transport, TransportError,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by every fetch issued through one fetcher
#[derive(Debug, Default)]
pub struct FetchStats {
    requests: AtomicU64,
    challenges: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
}

/// A point-in-time copy of `FetchStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStatsSnapshot {
    /// Requests sent to the transport
    pub requests: u64,
    /// Challenge pages seen (each one triggered a cooldown)
    pub challenges: u64,
    /// Attempts that were followed by another attempt
    pub retries: u64,
    /// Logical fetches that gave up
    pub failures: u64,
}

impl FetchStats {
    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            challenges: self.challenges.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Fetcher that retries a transport according to a `BackoffPolicy`
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 200, normal page | Return document |
/// | HTTP 200, challenge page | Cooldown, next attempt |
/// | Non-200 status | Flat backoff, next attempt |
/// | Timeout / connection error | Flat backoff, next attempt |
/// | Attempts exhausted | `FetchFailure` |
///
/// No pause follows the final attempt.
pub struct ResilientFetcher<T> {
    transport: T,
    policy: BackoffPolicy,
    identities: IdentityPool,
    stats: FetchStats,
}

impl<T: Transport> ResilientFetcher<T> {
    pub fn new(transport: T, policy: BackoffPolicy, identities: IdentityPool) -> Self {
        Self {
            transport,
            policy,
            identities,
            stats: FetchStats::default(),
        }
    }

    async fn attempt(&self, url: &str) -> Result<RawPage, TransportError> {
        let user_agent = self.identities.next();
        pause(self.policy.politeness.sample()).await;

        self.stats.requests.fetch_add(1, Ordering::Relaxed);
        match tokio::time::timeout(
            self.policy.request_timeout,
            self.transport.get(url, user_agent),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

#[async_trait]
impl<T: Transport> Fetcher for ResilientFetcher<T> {
    async fn fetch(&self, url: &str) -> Result<Document, FetchFailure> {
        let max_attempts = self.policy.max_attempts;
        let mut last_cause = AttemptFailure::Transport(TransportError::Other(
            "no attempt made".to_string(),
        ));

        for attempt in 1..=max_attempts {
            let (cause, backoff) = match self.attempt(url).await {
                Ok(page) if page.status == 200 => {
                    let document = Document::new(page.final_url, page.body);
                    if !document.is_challenge() {
                        return Ok(document);
                    }

                    self.stats.challenges.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        "Challenge page at {} ({}), attempt {}/{}",
                        url,
                        self.transport.name(),
                        attempt,
                        max_attempts
                    );
                    (AttemptFailure::Challenge, self.policy.challenge_cooldown)
                }
                Ok(page) => {
                    tracing::warn!(
                        "Received status {} for {}, attempt {}/{}",
                        page.status,
                        url,
                        attempt,
                        max_attempts
                    );
                    (AttemptFailure::Status(page.status), self.policy.retry_delay)
                }
                Err(e) => {
                    tracing::warn!(
                        "Error fetching {}, attempt {}/{}: {}",
                        url,
                        attempt,
                        max_attempts,
                        e
                    );
                    (AttemptFailure::Transport(e), self.policy.retry_delay)
                }
            };

            last_cause = cause;
            if attempt < max_attempts {
                self.stats.retries.fetch_add(1, Ordering::Relaxed);
                pause(backoff).await;
            }
        }

        self.stats.failures.fetch_add(1, Ordering::Relaxed);
        Err(FetchFailure {
            url: url.to_string(),
            attempts: max_attempts,
            last_cause,
        })
    }

    fn stats(&self) -> FetchStatsSnapshot {
        self.stats.snapshot()
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rotation;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed script of responses and records the identities used
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<RawPage, TransportError>>>,
        seen_agents: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<RawPage, TransportError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                seen_agents: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, url: &str, user_agent: &str) -> Result<RawPage, TransportError> {
            self.seen_agents.lock().unwrap().push(user_agent.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(page(url, 404, "")))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn page(url: &str, status: u16, body: &str) -> RawPage {
        RawPage {
            status,
            final_url: url.to_string(),
            body: body.to_string(),
        }
    }

    const CHALLENGE: &str = "<html><body>Prove you are human: CAPTCHA</body></html>";
    const LISTING: &str = "<html><body><h1>Listing</h1></body></html>";

    fn fetcher(script: Vec<Result<RawPage, TransportError>>) -> ResilientFetcher<ScriptedTransport> {
        ResilientFetcher::new(
            ScriptedTransport::new(script),
            BackoffPolicy::immediate(3),
            IdentityPool::new(
                vec!["ua-1".to_string(), "ua-2".to_string()],
                Rotation::Cyclic,
            ),
        )
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let url = "https://example.com/a";
        let fetcher = fetcher(vec![Ok(page(url, 200, LISTING))]);

        let doc = fetcher.fetch(url).await.unwrap();
        assert_eq!(doc.url(), url);
        assert_eq!(fetcher.stats().requests, 1);
        assert_eq!(fetcher.stats().retries, 0);
    }

    #[tokio::test]
    async fn test_two_challenges_then_success() {
        let url = "https://example.com/a";
        let fetcher = fetcher(vec![
            Ok(page(url, 200, CHALLENGE)),
            Ok(page(url, 200, CHALLENGE)),
            Ok(page(url, 200, LISTING)),
        ]);

        let doc = fetcher.fetch(url).await.unwrap();
        assert!(doc.body().contains("Listing"));

        let stats = fetcher.stats();
        assert_eq!(stats.challenges, 2);
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.failures, 0);
    }

    #[tokio::test]
    async fn test_challenges_consume_attempt_budget() {
        let url = "https://example.com/a";
        let fetcher = fetcher(vec![
            Ok(page(url, 200, CHALLENGE)),
            Ok(page(url, 200, CHALLENGE)),
            Ok(page(url, 200, CHALLENGE)),
            Ok(page(url, 200, LISTING)),
        ]);

        let failure = fetcher.fetch(url).await.unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert!(matches!(failure.last_cause, AttemptFailure::Challenge));
        assert_eq!(fetcher.stats().requests, 3);
    }

    #[tokio::test]
    async fn test_status_and_transport_errors_are_retried() {
        let url = "https://example.com/a";
        let fetcher = fetcher(vec![
            Ok(page(url, 503, "")),
            Err(TransportError::Connect("refused".to_string())),
            Ok(page(url, 200, LISTING)),
        ]);

        assert!(fetcher.fetch(url).await.is_ok());
        assert_eq!(fetcher.stats().retries, 2);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_report_last_cause() {
        let url = "https://example.com/a";
        let fetcher = fetcher(vec![
            Err(TransportError::Timeout),
            Ok(page(url, 500, "")),
            Ok(page(url, 429, "")),
        ]);

        let failure = fetcher.fetch(url).await.unwrap_err();
        assert!(matches!(failure.last_cause, AttemptFailure::Status(429)));
        assert_eq!(fetcher.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_identity_rotates_per_attempt() {
        let url = "https://example.com/a";
        let fetcher = fetcher(vec![
            Ok(page(url, 500, "")),
            Ok(page(url, 200, LISTING)),
        ]);

        fetcher.fetch(url).await.unwrap();
        let seen = fetcher.transport.seen_agents.lock().unwrap().clone();
        assert_eq!(seen, vec!["ua-1".to_string(), "ua-2".to_string()]);
    }

    /// A transport that never answers, to exercise the request timeout
    struct HangingTransport;

    #[async_trait]
    impl Transport for HangingTransport {
        async fn get(&self, _url: &str, _user_agent: &str) -> Result<RawPage, TransportError> {
            std::future::pending().await
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    #[tokio::test]
    async fn test_request_timeout_counts_as_failure() {
        let mut policy = BackoffPolicy::immediate(2);
        policy.request_timeout = Duration::from_millis(20);
        let fetcher = ResilientFetcher::new(
            HangingTransport,
            policy,
            IdentityPool::new(vec!["ua".to_string()], Rotation::Cyclic),
        );

        let failure = fetcher.fetch("https://example.com/slow").await.unwrap_err();
        assert_eq!(failure.attempts, 2);
        assert!(matches!(
            failure.last_cause,
            AttemptFailure::Transport(TransportError::Timeout)
        ));
    }

    fn timed_fetcher(
        script: Vec<Result<RawPage, TransportError>>,
    ) -> ResilientFetcher<ScriptedTransport> {
        let policy = BackoffPolicy {
            retry_delay: Duration::from_secs(10),
            challenge_cooldown: Duration::from_secs(60),
            ..BackoffPolicy::immediate(3)
        };
        ResilientFetcher::new(
            ScriptedTransport::new(script),
            policy,
            IdentityPool::new(vec!["ua-1".to_string()], Rotation::Cyclic),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_challenges_wait_for_cooldown() {
        let url = "https://example.com/a";
        let fetcher = timed_fetcher(vec![
            Ok(page(url, 200, CHALLENGE)),
            Ok(page(url, 200, CHALLENGE)),
            Ok(page(url, 200, LISTING)),
        ]);

        let start = tokio::time::Instant::now();
        fetcher.fetch(url).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_statuses_use_flat_backoff_without_final_pause() {
        let url = "https://example.com/a";
        let fetcher = timed_fetcher(vec![
            Ok(page(url, 503, "")),
            Ok(page(url, 503, "")),
            Ok(page(url, 503, "")),
        ]);

        let start = tokio::time::Instant::now();
        assert!(fetcher.fetch(url).await.is_err());
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_then_challenge_mixes_delays() {
        let url = "https://example.com/a";
        let fetcher = timed_fetcher(vec![
            Err(TransportError::Connect("refused".to_string())),
            Ok(page(url, 200, CHALLENGE)),
            Ok(page(url, 200, LISTING)),
        ]);

        let start = tokio::time::Instant::now();
        fetcher.fetch(url).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(70));
    }
}
