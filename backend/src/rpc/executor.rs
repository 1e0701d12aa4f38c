use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::registry::{EndpointHandle, EndpointRegistry};
use crate::errors::{AggregateError, EndpointError, EndpointFailure};

/// Runs idempotent read operations against the registry with health-ordered failover.
///
/// Endpoints are tried strictly one after another in score order, computed once per
/// call. The first success wins; every attempt is recorded in the registry. Writes
/// must not go through here.
#[derive(Clone)]
pub struct ResilientExecutor {
    registry: Arc<EndpointRegistry>,
    attempt_timeout: Duration,
    overall_deadline: Duration,
}

impl ResilientExecutor {
    /// The overall deadline defaults to `attempt_timeout × endpoint count`.
    pub fn new(registry: Arc<EndpointRegistry>, attempt_timeout: Duration) -> Self {
        let overall_deadline = attempt_timeout.saturating_mul(registry.len() as u32);
        Self {
            registry,
            attempt_timeout,
            overall_deadline,
        }
    }

    pub fn with_overall_deadline(mut self, deadline: Duration) -> Self {
        self.overall_deadline = deadline;
        self
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub fn overall_deadline(&self) -> Duration {
        self.overall_deadline
    }

    #[instrument(skip(self, op), fields(chain_id = self.registry.chain_id()))]
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T, AggregateError>
    where
        F: Fn(EndpointHandle) -> Fut,
        Fut: Future<Output = Result<T, EndpointError>>,
    {
        let order = self.registry.ranked();
        let deadline = tokio::time::Instant::now() + self.overall_deadline;
        let mut failures = Vec::with_capacity(order.len());
        let mut cut_short = false;

        for (attempt, handle) in order.into_iter().enumerate() {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                warn!(
                    "⏱️ Failover deadline of {:?} reached after {} attempt(s)",
                    self.overall_deadline, attempt
                );
                return Err(AggregateError { failures, deadline_exceeded: true });
            }

            let endpoint = handle.endpoint.clone();
            let attempt_deadline = std::cmp::min(now + self.attempt_timeout, deadline);
            let started = Instant::now();

            let outcome = match tokio::time::timeout_at(attempt_deadline, op(handle)).await {
                Ok(result) => result,
                Err(_) => {
                    cut_short = attempt_deadline == deadline;
                    Err(EndpointError::Timeout(started.elapsed()))
                }
            };
            let elapsed = started.elapsed();

            match outcome {
                Ok(value) => {
                    self.registry.record_outcome(&endpoint, true, elapsed);
                    if attempt > 0 {
                        info!("✅ {} succeeded after {} failed attempt(s)", endpoint.url, attempt);
                    } else {
                        debug!("{} succeeded in {:?}", endpoint.url, elapsed);
                    }
                    return Ok(value);
                }
                Err(error) => {
                    self.registry.record_outcome(&endpoint, false, elapsed);
                    warn!("❌ {} failed in {:?}: {}", endpoint.url, elapsed, error);
                    failures.push(EndpointFailure { url: endpoint.url, error });
                }
            }
        }

        if cut_short {
            warn!("⏱️ Failover deadline of {:?} cut the last attempt short", self.overall_deadline);
        }
        Err(AggregateError { failures, deadline_exceeded: cut_short })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::testing::registry_of;
    use crate::types::Endpoint;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn executor(urls: &[&str], timeout: Duration) -> ResilientExecutor {
        ResilientExecutor::new(Arc::new(registry_of(urls)), timeout)
    }

    #[tokio::test]
    async fn test_first_success_touches_one_endpoint() {
        let executor = executor(&["https://a", "https://b", "https://c"], Duration::from_secs(1));
        let calls = AtomicUsize::new(0);

        let value = executor
            .execute(|handle| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, EndpointError>(handle.endpoint.url) }
            })
            .await
            .unwrap();

        assert_eq!(value, "https://a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let snapshot = executor.registry().snapshot();
        assert_eq!(snapshot.iter().map(|s| s.success_count + s.error_count).sum::<u64>(), 1);
        assert_eq!(snapshot[0].success_count, 1);
    }

    #[tokio::test]
    async fn test_all_failures_aggregated_in_attempt_order() {
        let executor = executor(&["https://a", "https://b", "https://c"], Duration::from_secs(1));

        let err = executor
            .execute(|handle| async move {
                Err::<(), _>(EndpointError::Connection(format!("{} down", handle.endpoint.url)))
            })
            .await
            .unwrap_err();

        assert_eq!(err.len(), 3);
        assert!(!err.deadline_exceeded);
        assert_eq!(err.urls(), vec!["https://a", "https://b", "https://c"]);
        for snapshot in executor.registry().snapshot() {
            assert_eq!(snapshot.error_count, 1);
            assert_eq!(snapshot.success_count, 0);
        }
    }

    #[tokio::test]
    async fn test_failover_to_next_endpoint() {
        let executor = executor(&["https://a", "https://b", "https://c"], Duration::from_secs(1));

        let value = executor
            .execute(|handle| async move {
                match handle.endpoint.url.as_str() {
                    "https://c" => Ok(42u64),
                    _ => Err(EndpointError::RateLimited("slow down".into())),
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        let stats = |url: &str| executor.registry().stats(&Endpoint::new(url, 56)).unwrap();
        assert_eq!(stats("https://a").error_count, 1);
        assert_eq!(stats("https://b").error_count, 1);
        assert_eq!(stats("https://c").success_count, 1);

        // the endpoint that just worked now leads the next failover order
        assert_eq!(executor.registry().best().endpoint.url, "https://c");
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out_and_fails_over() {
        let executor = executor(&["https://slow", "https://fast"], Duration::from_millis(50));

        let value = executor
            .execute(|handle| async move {
                if handle.endpoint.url == "https://slow" {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok::<_, EndpointError>(handle.endpoint.url)
            })
            .await
            .unwrap();

        assert_eq!(value, "https://fast");
        let slow = executor.registry().stats(&Endpoint::new("https://slow", 56)).unwrap();
        assert_eq!(slow.error_count, 1);
    }

    #[tokio::test]
    async fn test_overall_deadline_stops_failover() {
        let executor = executor(&["https://a", "https://b", "https://c"], Duration::from_millis(200))
            .with_overall_deadline(Duration::from_millis(40));

        let err = executor
            .execute(|_| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<(), EndpointError>(())
            })
            .await
            .unwrap_err();

        assert!(err.deadline_exceeded);
        assert_eq!(err.len(), 1);
        assert!(matches!(err.failures[0].error, EndpointError::Timeout(_)));
        let untouched = executor.registry().stats(&Endpoint::new("https://c", 56)).unwrap();
        assert_eq!(untouched.attempts(), 0);
    }

    #[tokio::test]
    async fn test_deadline_cutting_last_attempt_is_reported() {
        let executor = executor(&["https://a", "https://b"], Duration::from_millis(200))
            .with_overall_deadline(Duration::from_millis(100));

        let err = executor
            .execute(|handle| async move {
                if handle.endpoint.url == "https://a" {
                    return Err(EndpointError::Connection("refused".into()));
                }
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<(), EndpointError>(())
            })
            .await
            .unwrap_err();

        assert_eq!(err.urls(), vec!["https://a", "https://b"]);
        assert!(matches!(err.failures[1].error, EndpointError::Timeout(_)));
        assert!(err.deadline_exceeded);
    }

    #[test]
    fn test_default_overall_deadline_scales_with_endpoints() {
        let executor = executor(&["https://a", "https://b", "https://c"], Duration::from_secs(4));
        assert_eq!(executor.overall_deadline(), Duration::from_secs(12));
    }
}
