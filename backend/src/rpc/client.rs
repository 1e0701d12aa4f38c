use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::{Client, Http};
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use tracing::debug;

use crate::errors::{ConfigError, EndpointError};

// JSON-RPC codes that nodes use for throttling and reverts
const RATE_LIMIT_CODES: &[i64] = &[429, -32005, -32029];
const REVERT_CODE: i64 = 3;

/// Chain call primitive, one instance per registered endpoint.
///
/// Implementations return failures already classified into [`EndpointError`], so
/// nothing downstream ever inspects raw error text.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Read-only `eth_call` against the latest block.
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, EndpointError>;

    async fn block_number(&self) -> Result<u64, EndpointError>;

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, EndpointError>;
}

/// [`ChainClient`] over an alloy HTTP provider.
#[derive(Clone)]
pub struct AlloyChainClient {
    provider: RootProvider<Http<Client>>,
}

impl AlloyChainClient {
    pub fn connect(rpc_url: &str) -> Result<Self, ConfigError> {
        let parsed_url = rpc_url
            .parse()
            .map_err(|e| ConfigError::InvalidUrl(rpc_url.to_string(), format!("{}", e)))?;

        let provider = ProviderBuilder::new().on_http(parsed_url);
        Ok(Self { provider })
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, EndpointError> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(calldata.into())
            .value(U256::ZERO);

        self.provider
            .call(&tx)
            .await
            .map_err(classify_transport_error)
    }

    async fn block_number(&self) -> Result<u64, EndpointError> {
        self.provider
            .get_block_number()
            .await
            .map_err(classify_transport_error)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, EndpointError> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(classify_transport_error)?;
        Ok(*pending.tx_hash())
    }
}

/// Map an alloy transport error onto the endpoint error taxonomy.
pub fn classify_transport_error(err: RpcError<TransportErrorKind>) -> EndpointError {
    debug!("Classifying RPC failure: {:?}", err);
    match err {
        RpcError::ErrorResp(payload) => classify_rpc_code(payload.code, &payload.message),
        RpcError::Transport(kind) => {
            let text = kind.to_string();
            if text.contains("429") {
                EndpointError::RateLimited(text)
            } else {
                EndpointError::Connection(text)
            }
        }
        RpcError::NullResp => EndpointError::InvalidResponse("null response".into()),
        RpcError::DeserError { err, .. } => EndpointError::InvalidResponse(err.to_string()),
        other => EndpointError::Connection(other.to_string()),
    }
}

/// Classify a JSON-RPC error object by code, with the message used only for the generic `-32000` family.
pub fn classify_rpc_code(code: i64, message: &str) -> EndpointError {
    let lowered = message.to_lowercase();
    if RATE_LIMIT_CODES.contains(&code) || lowered.contains("rate limit") || lowered.contains("too many requests") {
        return EndpointError::RateLimited(message.to_string());
    }
    if code == REVERT_CODE || lowered.contains("execution reverted") {
        return EndpointError::Reverted(message.to_string());
    }
    EndpointError::Rpc {
        code,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rate_limit() {
        assert!(matches!(classify_rpc_code(-32005, "limit exceeded"), EndpointError::RateLimited(_)));
        assert!(matches!(classify_rpc_code(-32000, "Too Many Requests"), EndpointError::RateLimited(_)));
    }

    #[test]
    fn test_classify_revert() {
        assert!(matches!(classify_rpc_code(3, "execution reverted: PancakeLibrary: INSUFFICIENT_LIQUIDITY"), EndpointError::Reverted(_)));
        assert!(matches!(classify_rpc_code(-32000, "execution reverted"), EndpointError::Reverted(_)));
    }

    #[test]
    fn test_classify_generic_rpc_error() {
        assert_eq!(
            classify_rpc_code(-32601, "method not found"),
            EndpointError::Rpc { code: -32601, message: "method not found".to_string() }
        );
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        assert!(matches!(AlloyChainClient::connect("not a url"), Err(ConfigError::InvalidUrl(..))));
        assert!(AlloyChainClient::connect("https://bsc-dataseed.binance.org").is_ok());
    }
}
