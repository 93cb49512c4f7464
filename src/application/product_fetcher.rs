//! Product fetching with retry and endpoint alternation
//!
//! Each lookup is a bounded number of attempts against one endpoint. With
//! `prefer_detail` that endpoint is always the detail endpoint; otherwise
//! consecutive calls alternate between the two endpoints to spread load.
//! Only transient failures are retried: a missing or unparseable product
//! is a definitive answer.

use crate::domain::ProductRecord;
use crate::infrastructure::config::MonitorConfig;
use crate::infrastructure::fetch_error::FetchError;
use crate::infrastructure::product_source::{Endpoint, ProductSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Endpoint used by the previous alternating call
#[derive(Debug)]
pub struct EndpointCursor {
    last_was_detail: AtomicBool,
}

impl EndpointCursor {
    /// Cursor whose next call uses the endpoint other than `last`
    pub fn new(last: Endpoint) -> Self {
        Self {
            last_was_detail: AtomicBool::new(last == Endpoint::Detail),
        }
    }

    pub fn random() -> Self {
        Self::new(if fastrand::bool() {
            Endpoint::Detail
        } else {
            Endpoint::QuickView
        })
    }

    /// Flip the cursor and return the endpoint not used last time.
    /// Concurrent callers may interleave; each call still flips exactly once.
    pub fn advance(&self) -> Endpoint {
        let last_was_detail = self.last_was_detail.fetch_xor(true, Ordering::Relaxed);
        if last_was_detail {
            Endpoint::QuickView
        } else {
            Endpoint::Detail
        }
    }
}

/// Attempt budget and pause between attempts
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Upper bound of the random pause between attempts
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            attempts: config.retry.max(1),
            max_backoff: config.retry_backoff(),
        }
    }

    fn backoff(&self) -> Duration {
        let max_ms = u64::try_from(self.max_backoff.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(fastrand::u64(0..=max_ms))
    }
}

/// Result of [`ProductFetcher::alternate_fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(ProductRecord),
    /// The storefront has no such product
    NotFound,
    /// Every attempt failed transiently
    Exhausted { attempts: u32 },
}

impl FetchOutcome {
    /// The record, if one was obtained. Not found and exhausted look the same here.
    pub fn into_record(self) -> Option<ProductRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::NotFound | Self::Exhausted { .. } => None,
        }
    }
}

pub struct ProductFetcher {
    source: Arc<dyn ProductSource>,
    cursor: EndpointCursor,
    policy: RetryPolicy,
}

impl ProductFetcher {
    pub fn new(source: Arc<dyn ProductSource>, policy: RetryPolicy) -> Self {
        Self::with_cursor(source, policy, EndpointCursor::random())
    }

    pub fn with_cursor(source: Arc<dyn ProductSource>, policy: RetryPolicy, cursor: EndpointCursor) -> Self {
        Self {
            source,
            cursor,
            policy,
        }
    }

    /// One request to the detail endpoint
    pub async fn fetch_detail(&self, pid: &str) -> Result<ProductRecord, FetchError> {
        self.source.fetch(Endpoint::Detail, pid).await
    }

    /// One request to the quick-view endpoint
    pub async fn fetch_quick_view(&self, pid: &str) -> Result<ProductRecord, FetchError> {
        self.source.fetch(Endpoint::QuickView, pid).await
    }

    async fn fetch_once(&self, endpoint: Endpoint, pid: &str) -> Result<ProductRecord, FetchError> {
        match endpoint {
            Endpoint::Detail => self.fetch_detail(pid).await,
            Endpoint::QuickView => self.fetch_quick_view(pid).await,
        }
    }

    pub async fn alternate_fetch(&self, pid: &str, prefer_detail: bool) -> FetchOutcome {
        let endpoint = if prefer_detail {
            Endpoint::Detail
        } else {
            self.cursor.advance()
        };

        let attempts = self.policy.attempts;
        for attempt in 1..=attempts {
            match self.fetch_once(endpoint, pid).await {
                Ok(record) => {
                    debug!("Fetched {} from {} on attempt {}", pid, endpoint, attempt);
                    return FetchOutcome::Found(record);
                }
                Err(FetchError::NotFound { status }) => {
                    debug!("{} not found on {} (HTTP {})", pid, endpoint, status);
                    return FetchOutcome::NotFound;
                }
                Err(FetchError::Unparseable(e)) => {
                    warn!("⚠️ {} returned no product for {}: {}", endpoint, pid, e);
                    return FetchOutcome::NotFound;
                }
                Err(FetchError::Transient(reason)) => {
                    if attempt < attempts {
                        info!("🔄 Retrying pid {} ({}/{}): {}", pid, attempt + 1, attempts, reason);
                        let pause = self.policy.backoff();
                        if !pause.is_zero() {
                            tokio::time::sleep(pause).await;
                        }
                    }
                }
            }
        }

        debug!("Giving up on {} after {} attempts", pid, attempts);
        FetchOutcome::Exhausted { attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::ScriptedSource;
    use crate::infrastructure::parsing_error::ParsingError;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn created() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            max_backoff: Duration::ZERO,
        }
    }

    fn fetcher(source: &Arc<ScriptedSource>, attempts: u32, last: Endpoint) -> ProductFetcher {
        ProductFetcher::with_cursor(source.clone(), policy(attempts), EndpointCursor::new(last))
    }

    #[rstest]
    #[case(Endpoint::Detail)]
    #[case(Endpoint::QuickView)]
    #[tokio::test]
    async fn consecutive_calls_alternate_endpoints(#[case] last: Endpoint) {
        let source = Arc::new(ScriptedSource::catalog(created()));
        let fetcher = fetcher(&source, 3, last);

        fetcher.alternate_fetch("J001000", false).await;
        fetcher.alternate_fetch("J001001", false).await;
        fetcher.alternate_fetch("J001002", false).await;

        let endpoints = source.endpoints();
        assert_eq!(endpoints[0], last.other());
        assert_ne!(endpoints[0], endpoints[1]);
        assert_ne!(endpoints[1], endpoints[2]);
    }

    #[tokio::test]
    async fn records_follow_the_endpoint_used() {
        let source = Arc::new(ScriptedSource::catalog(created()));
        let fetcher = fetcher(&source, 1, Endpoint::Detail);

        let quick = fetcher.alternate_fetch("J001000", false).await.into_record().unwrap();
        let detail = fetcher.alternate_fetch("J001000", false).await.into_record().unwrap();

        assert!(!quick.sourced_from_detail_endpoint());
        assert!(detail.sourced_from_detail_endpoint());
    }

    #[tokio::test]
    async fn prefer_detail_always_uses_detail_endpoint() {
        let source = Arc::new(ScriptedSource::catalog(created()));
        let fetcher = fetcher(&source, 3, Endpoint::QuickView);

        for _ in 0..3 {
            fetcher.alternate_fetch("J001000", true).await;
        }

        assert!(source.endpoints().iter().all(|e| *e == Endpoint::Detail));
    }

    #[tokio::test]
    async fn transient_failures_exhaust_the_attempt_budget() {
        let source = Arc::new(ScriptedSource::new(|_, _| {
            Err(FetchError::Transient("connection reset".to_string()))
        }));
        let fetcher = fetcher(&source, 4, Endpoint::Detail);

        let outcome = fetcher.alternate_fetch("J001000", false).await;

        assert_eq!(outcome, FetchOutcome::Exhausted { attempts: 4 });
        assert_eq!(source.call_count(), 4);
        // retries stay on the endpoint chosen for the call
        assert!(source.endpoints().iter().all(|e| *e == Endpoint::QuickView));
    }

    #[rstest]
    #[case(FetchError::NotFound { status: 404 })]
    #[case(FetchError::Unparseable(ParsingError::required_field_missing("renderedTemplate", "Product-ShowQuickView")))]
    #[tokio::test]
    async fn definitive_answers_cost_one_attempt(#[case] error: FetchError) {
        let source = Arc::new(ScriptedSource::new(move |_, _| Err(error.clone())));
        let fetcher = fetcher(&source, 5, Endpoint::Detail);

        let outcome = fetcher.alternate_fetch("J001000", false).await;

        assert_eq!(outcome, FetchOutcome::NotFound);
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let failures = std::sync::atomic::AtomicUsize::new(0);
        let source = Arc::new(ScriptedSource::new(move |_, pid| {
            if failures.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(FetchError::Transient("timeout".to_string()))
            } else {
                Ok(crate::domain::product::fixtures::detail_record(pid, created()))
            }
        }));
        let fetcher = fetcher(&source, 3, Endpoint::QuickView);

        let record = fetcher.alternate_fetch("J001000", true).await.into_record();

        assert!(record.is_some());
        assert_eq!(source.call_count(), 3);
    }

    #[test]
    fn exhausted_and_not_found_carry_no_record() {
        assert!(FetchOutcome::NotFound.into_record().is_none());
        assert!(FetchOutcome::Exhausted { attempts: 3 }.into_record().is_none());
    }

    #[test]
    fn backoff_stays_within_bound() {
        let policy = RetryPolicy {
            attempts: 3,
            max_backoff: Duration::from_millis(40),
        };
        for _ in 0..50 {
            assert!(policy.backoff() <= Duration::from_millis(40));
        }
        assert_eq!(RetryPolicy { attempts: 1, max_backoff: Duration::ZERO }.backoff(), Duration::ZERO);
    }
}
