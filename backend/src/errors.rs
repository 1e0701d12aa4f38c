use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Bad caller input. Raised before any network activity and never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Identical tokens: {0}")]
    IdenticalTokens(String),
    #[error("Invalid transaction payload: {0}")]
    InvalidPayload(String),
}

/// Non-fatal: the identifier could not be canonicalised and was passed through as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not normalize token identifier {identifier:?}: {reason}")]
pub struct NormalizationWarning {
    pub identifier: String,
    pub reason: String,
}

/// Failure of a single endpoint attempt, classified once at the chain-call boundary.
///
/// Absorbed by the executor; only ever escapes inside an [`AggregateError`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EndpointError {
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Execution reverted: {0}")]
    Reverted(String),
    #[error("Invalid response from endpoint: {0}")]
    InvalidResponse(String),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// One failed attempt inside a failover loop.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointFailure {
    pub url: String,
    pub error: EndpointError,
}

/// Every attempted endpoint failed. Terminal for that call.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct AggregateError {
    pub failures: Vec<EndpointFailure>,
    pub deadline_exceeded: bool,
}

impl AggregateError {
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn urls(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.url.as_str()).collect()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "All {} endpoint attempt(s) failed", self.failures.len())?;
        if self.deadline_exceeded {
            write!(f, " (failover deadline exceeded)")?;
        }
        for failure in &self.failures {
            write!(f, "; {}: {}", failure.url, failure.error)?;
        }
        Ok(())
    }
}

/// All quote sources exhausted, or the request was rejected up front.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Price unavailable: {0}")]
    Exhausted(#[from] AggregateError),
    #[error("Price unavailable: router returned no output for {0}")]
    NoLiquidity(String),
}

/// Missing or invalid static configuration. Fatal, never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unsupported chain: {0}")]
    UnknownChain(u64),
    #[error("No RPC endpoints configured")]
    NoEndpoints,
    #[error("Duplicate endpoint: {0}")]
    DuplicateEndpoint(String),
    #[error("Endpoint {url} is for chain {found}, expected {expected}")]
    ChainMismatch { url: String, expected: u64, found: u64 },
    #[error("Invalid RPC URL {0}: {1}")]
    InvalidUrl(String, String),
    #[error("Invalid address for {0}: {1}")]
    InvalidAddress(&'static str, String),
    #[error("Invalid configuration value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("Failed to read configuration: {0}")]
    Io(String),
}

/// Off-chain price index failure. Swallowed by the aggregator, which falls through to the router.
#[derive(Error, Debug)]
pub enum PriceIndexError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected HTTP status {0}")]
    Status(u16),
    #[error("Price index timeout")]
    Timeout,
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),
}

/// Transaction submission failure. Surfaced directly, there is no failover for writes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Submission to {url} failed: {error}")]
    Endpoint { url: String, error: EndpointError },
}
