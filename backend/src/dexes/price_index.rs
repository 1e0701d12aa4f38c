use async_trait::async_trait;
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::errors::PriceIndexError;

/// Upper bound on any single price index request.
pub const MAX_INDEX_TIMEOUT: Duration = Duration::from_secs(5);

/// Off-chain source of pool reserves keyed by token pair.
#[async_trait]
pub trait PriceIndexSource: Send + Sync {
    async fn fetch_dataset(&self) -> Result<PairDataset, PriceIndexError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairRecord {
    pub base_address: String,
    pub quote_address: String,
    pub base_reserve: Decimal,
    pub quote_reserve: Decimal,
}

#[derive(Debug, Deserialize)]
struct PairsResponse {
    data: HashMap<String, PairRecord>,
}

/// Reserves oriented for a trade from `token_in` to `token_out`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairReserves {
    pub reserve_in: Decimal,
    pub reserve_out: Decimal,
}

/// Pair-keyed reserve dataset. Keys are `<addrA>_<addrB>`, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct PairDataset {
    pairs: HashMap<String, PairRecord>,
}

impl PairDataset {
    pub fn from_json(body: &str) -> Result<Self, PriceIndexError> {
        let response: PairsResponse =
            serde_json::from_str(body).map_err(|e| PriceIndexError::InvalidDataset(e.to_string()))?;
        Ok(Self::from_records(response.data))
    }

    fn from_records(records: HashMap<String, PairRecord>) -> Self {
        let pairs = records
            .into_iter()
            .map(|(key, record)| (key.to_lowercase(), record))
            .collect();
        Self { pairs }
    }

    pub fn with_pair(mut self, base: &str, quote: &str, base_reserve: Decimal, quote_reserve: Decimal) -> Self {
        self.pairs.insert(
            pair_key(base, quote),
            PairRecord {
                base_address: base.to_string(),
                quote_address: quote.to_string(),
                base_reserve,
                quote_reserve,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Reserves for the pair under either key ordering. Empty pools count as missing.
    pub fn lookup(&self, token_in: &str, token_out: &str) -> Option<PairReserves> {
        let reserves = if let Some(record) = self.pairs.get(&pair_key(token_in, token_out)) {
            PairReserves {
                reserve_in: record.base_reserve,
                reserve_out: record.quote_reserve,
            }
        } else {
            let record = self.pairs.get(&pair_key(token_out, token_in))?;
            PairReserves {
                reserve_in: record.quote_reserve,
                reserve_out: record.base_reserve,
            }
        };

        if reserves.reserve_in <= Decimal::ZERO || reserves.reserve_out <= Decimal::ZERO {
            return None;
        }
        Some(reserves)
    }
}

fn pair_key(a: &str, b: &str) -> String {
    format!("{}_{}", a, b).to_lowercase()
}

/// Price index served over HTTP as a JSON pair dataset.
#[derive(Debug, Clone)]
pub struct HttpPriceIndex {
    http_client: HttpClient,
    url: String,
}

impl HttpPriceIndex {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PriceIndexError> {
        let http_client = HttpClient::builder()
            .timeout(timeout.min(MAX_INDEX_TIMEOUT))
            .user_agent("SwapGuard/1.0")
            .build()?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PriceIndexSource for HttpPriceIndex {
    async fn fetch_dataset(&self) -> Result<PairDataset, PriceIndexError> {
        let response = self.http_client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                PriceIndexError::Timeout
            } else {
                PriceIndexError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceIndexError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let dataset = PairDataset::from_json(&body)?;
        debug!("Fetched {} pairs from {}", dataset.len(), self.url);
        Ok(dataset)
    }
}
