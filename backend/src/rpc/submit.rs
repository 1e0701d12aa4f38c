use alloy::primitives::TxHash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

use super::registry::EndpointRegistry;
use crate::errors::{EndpointError, SubmitError, ValidationError};
use crate::types::{TransactionParameters, TxType};

const EIP1559_TX_TYPE: u8 = 0x02;
const RLP_LIST_OFFSET: u8 = 0xc0;

/// Sends signed transactions to the best endpoint exactly once.
///
/// Resubmitting a state-mutating call without idempotency keys is unsafe, so a
/// failure is returned to the caller as-is instead of failing over.
#[derive(Clone)]
pub struct TransactionSubmitter {
    registry: Arc<EndpointRegistry>,
    timeout: Duration,
}

impl TransactionSubmitter {
    pub fn new(registry: Arc<EndpointRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    #[instrument(skip(self, raw), fields(len = raw.len()))]
    pub async fn submit(&self, raw: &[u8], params: &TransactionParameters) -> Result<TxHash, SubmitError> {
        let envelope = envelope_type(raw)?;
        if envelope != params.tx_type() {
            return Err(ValidationError::InvalidPayload(format!(
                "{:?} transaction does not match the {:?} pricing required by chain {}",
                envelope,
                params.tx_type(),
                self.registry.chain_id()
            ))
            .into());
        }

        let handle = self.registry.best();
        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.timeout, handle.client.send_raw_transaction(raw)).await {
            Ok(result) => result,
            Err(_) => Err(EndpointError::Timeout(started.elapsed())),
        };
        let elapsed = started.elapsed();

        match outcome {
            Ok(tx_hash) => {
                self.registry.record_outcome(&handle.endpoint, true, elapsed);
                info!("📤 Transaction {} submitted via {}", tx_hash, handle.endpoint.url);
                Ok(tx_hash)
            }
            Err(err) => {
                self.registry.record_outcome(&handle.endpoint, false, elapsed);
                error!("❌ Submission via {} failed: {}", handle.endpoint.url, err);
                Err(SubmitError::Endpoint {
                    url: handle.endpoint.url,
                    error: err,
                })
            }
        }
    }
}

/// Envelope type of a signed, RLP/EIP-2718 encoded transaction.
pub fn envelope_type(raw: &[u8]) -> Result<TxType, ValidationError> {
    match raw.first() {
        None => Err(ValidationError::InvalidPayload("empty transaction".into())),
        Some(&byte) if byte >= RLP_LIST_OFFSET => Ok(TxType::Legacy),
        Some(&EIP1559_TX_TYPE) => Ok(TxType::FeeMarket),
        Some(&byte) => Err(ValidationError::InvalidPayload(format!(
            "unsupported transaction envelope type 0x{:02x}",
            byte
        ))),
    }
}
