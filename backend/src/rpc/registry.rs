use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::client::{AlloyChainClient, ChainClient};
use crate::errors::ConfigError;
use crate::types::Endpoint;

/// Rolling health statistics for one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointStats {
    pub success_count: u64,
    pub error_count: u64,
    pub last_used: Instant,
    pub last_used_at: DateTime<Utc>,
    pub average_response_time_ms: f64,
}

impl EndpointStats {
    fn new(now: Instant, wall_clock: DateTime<Utc>) -> Self {
        Self {
            success_count: 0,
            error_count: 0,
            last_used: now,
            last_used_at: wall_clock,
            average_response_time_ms: 0.0,
        }
    }

    pub fn attempts(&self) -> u64 {
        self.success_count + self.error_count
    }

    /// Defined as 0 for an endpoint with no attempts yet.
    pub fn success_rate(&self) -> f64 {
        let attempts = self.attempts();
        if attempts == 0 {
            return 0.0;
        }
        self.success_count as f64 / attempts as f64
    }

    /// `success_rate * 100 + seconds idle`. Idle time lets a failed endpoint earn its way back.
    pub fn score_at(&self, now: Instant) -> f64 {
        let idle = now.saturating_duration_since(self.last_used).as_secs_f64();
        self.success_rate() * 100.0 + idle
    }

    fn record(&mut self, success: bool, elapsed: Duration) {
        let sample_ms = elapsed.as_secs_f64() * 1000.0;
        self.average_response_time_ms = if self.attempts() == 0 {
            sample_ms
        } else {
            (self.average_response_time_ms + sample_ms) / 2.0
        };

        if success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
        self.last_used = Instant::now();
        self.last_used_at = Utc::now();
    }
}

/// Read-only diagnostic view of one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointSnapshot {
    pub url: String,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    #[serde(rename = "successCount")]
    pub success_count: u64,
    #[serde(rename = "errorCount")]
    pub error_count: u64,
    #[serde(rename = "successRate")]
    pub success_rate: f64,
    #[serde(rename = "lastUsedAt")]
    pub last_used_at: DateTime<Utc>,
    #[serde(rename = "averageResponseTimeMs")]
    pub average_response_time_ms: f64,
    pub score: f64,
}

/// Endpoint plus the client handle used to reach it.
#[derive(Clone)]
pub struct EndpointHandle {
    pub endpoint: Endpoint,
    pub client: Arc<dyn ChainClient>,
}

struct RegisteredEndpoint {
    endpoint: Endpoint,
    client: Arc<dyn ChainClient>,
    stats: Mutex<EndpointStats>,
}

/// Fixed set of endpoints for one chain with per-endpoint health stats.
///
/// Populated once at construction. Each endpoint's stats sit behind their own
/// mutex, so concurrent callers never lose updates and never lock across endpoints.
pub struct EndpointRegistry {
    chain_id: u64,
    endpoints: Vec<RegisteredEndpoint>,
}

impl EndpointRegistry {
    /// Register endpoints, building one alloy HTTP client per endpoint.
    pub fn connect(endpoints: Vec<Endpoint>) -> Result<Self, ConfigError> {
        let mut with_clients = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let client: Arc<dyn ChainClient> = Arc::new(AlloyChainClient::connect(&endpoint.url)?);
            with_clients.push((endpoint, client));
        }
        Self::with_clients(with_clients)
    }

    /// Register endpoints with caller-supplied client handles.
    pub fn with_clients(endpoints: Vec<(Endpoint, Arc<dyn ChainClient>)>) -> Result<Self, ConfigError> {
        let chain_id = endpoints.first().map(|(e, _)| e.chain_id).ok_or(ConfigError::NoEndpoints)?;

        let now = Instant::now();
        let wall_clock = Utc::now();
        let mut seen = HashSet::new();
        let mut registered = Vec::with_capacity(endpoints.len());

        for (endpoint, client) in endpoints {
            if endpoint.chain_id != chain_id {
                return Err(ConfigError::ChainMismatch {
                    url: endpoint.url,
                    expected: chain_id,
                    found: endpoint.chain_id,
                });
            }
            if !seen.insert(endpoint.clone()) {
                return Err(ConfigError::DuplicateEndpoint(endpoint.url));
            }
            registered.push(RegisteredEndpoint {
                endpoint,
                client,
                stats: Mutex::new(EndpointStats::new(now, wall_clock)),
            });
        }

        info!("✅ Endpoint registry initialized with {} endpoints for chain {}", registered.len(), chain_id);
        Ok(Self { chain_id, endpoints: registered })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.iter().map(|e| e.endpoint.clone()).collect()
    }

    /// Update one endpoint's stats after an attempt. Unknown endpoints are ignored.
    pub fn record_outcome(&self, endpoint: &Endpoint, success: bool, elapsed: Duration) {
        let Some(entry) = self.endpoints.iter().find(|e| &e.endpoint == endpoint) else {
            debug!("Ignoring outcome for unregistered endpoint {}", endpoint);
            return;
        };
        lock_stats(&entry.stats).record(success, elapsed);
    }

    /// Highest-scoring endpoint right now.
    pub fn best(&self) -> EndpointHandle {
        let ranked = self.ranked_at(Instant::now());
        // with_clients guarantees at least one endpoint
        let idx = ranked[0];
        self.handle(idx)
    }

    /// Failover order: all endpoints by descending score, ties in registration order.
    pub fn ranked(&self) -> Vec<EndpointHandle> {
        self.ranked_at(Instant::now())
            .into_iter()
            .map(|idx| self.handle(idx))
            .collect()
    }

    /// Indices in failover order, scored against `now`.
    pub fn ranked_at(&self, now: Instant) -> Vec<usize> {
        let mut scored: Vec<(usize, f64)> = self
            .endpoints
            .iter()
            .enumerate()
            .map(|(idx, e)| (idx, lock_stats(&e.stats).score_at(now)))
            .collect();

        // stable sort keeps registration order on ties
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(idx, _)| idx).collect()
    }

    pub fn stats(&self, endpoint: &Endpoint) -> Option<EndpointStats> {
        self.endpoints
            .iter()
            .find(|e| &e.endpoint == endpoint)
            .map(|e| lock_stats(&e.stats).clone())
    }

    /// Copy of all stats in registration order, for diagnostics.
    pub fn snapshot(&self) -> Vec<EndpointSnapshot> {
        let now = Instant::now();
        self.endpoints
            .iter()
            .map(|e| {
                let stats = lock_stats(&e.stats).clone();
                EndpointSnapshot {
                    url: e.endpoint.url.clone(),
                    chain_id: e.endpoint.chain_id,
                    success_count: stats.success_count,
                    error_count: stats.error_count,
                    success_rate: stats.success_rate(),
                    last_used_at: stats.last_used_at,
                    average_response_time_ms: stats.average_response_time_ms,
                    score: stats.score_at(now),
                }
            })
            .collect()
    }

    fn handle(&self, idx: usize) -> EndpointHandle {
        let entry = &self.endpoints[idx];
        EndpointHandle {
            endpoint: entry.endpoint.clone(),
            client: Arc::clone(&entry.client),
        }
    }
}

// Stats stay consistent even if a holder panicked, so recover from poisoning.
fn lock_stats(stats: &Mutex<EndpointStats>) -> MutexGuard<'_, EndpointStats> {
    stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
