use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::client::ChainClient;
use super::registry::EndpointRegistry;
use crate::errors::EndpointError;
use crate::types::Endpoint;

/// Scripted chain client for unit tests.
pub(crate) struct MockChainClient {
    reply: Result<Vec<U256>, EndpointError>,
    stall_after: Option<(usize, Duration)>,
    calls: AtomicUsize,
    submissions: AtomicUsize,
}

impl MockChainClient {
    /// Every `eth_call` answers with an ABI-encoded `uint256[]`.
    pub(crate) fn amounts_out(raw: Vec<U256>) -> Self {
        Self {
            reply: Ok(raw),
            stall_after: None,
            calls: AtomicUsize::new(0),
            submissions: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(error: EndpointError) -> Self {
        Self {
            reply: Err(error),
            stall_after: None,
            calls: AtomicUsize::new(0),
            submissions: AtomicUsize::new(0),
        }
    }

    /// `eth_call`s after the first `answered` sleep for `delay` before replying.
    pub(crate) fn stalling_after(mut self, answered: usize, delay: Duration) -> Self {
        self.stall_after = Some((answered, delay));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn call(&self, _to: Address, _calldata: Bytes) -> Result<Bytes, EndpointError> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((answered, delay)) = self.stall_after {
            if previous >= answered {
                tokio::time::sleep(delay).await;
            }
        }
        self.reply.clone().map(|amounts| Bytes::from(amounts.abi_encode()))
    }

    async fn block_number(&self) -> Result<u64, EndpointError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map(|_| 1)
    }

    async fn send_raw_transaction(&self, _raw: &[u8]) -> Result<TxHash, EndpointError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map(|_| TxHash::repeat_byte(0x11))
    }
}

/// Registry over healthy mock clients on chain 56.
pub(crate) fn registry_of(urls: &[&str]) -> EndpointRegistry {
    let endpoints = urls
        .iter()
        .map(|url| {
            let client: Arc<dyn ChainClient> = Arc::new(MockChainClient::amounts_out(vec![]));
            (Endpoint::new(*url, 56), client)
        })
        .collect();
    EndpointRegistry::with_clients(endpoints).expect("valid test registry")
}

/// Registry over the given clients, keeping typed handles for call-count assertions.
pub(crate) fn registry_with(clients: Vec<(&str, Arc<MockChainClient>)>) -> EndpointRegistry {
    let endpoints = clients
        .into_iter()
        .map(|(url, client)| (Endpoint::new(url, 56), client as Arc<dyn ChainClient>))
        .collect();
    EndpointRegistry::with_clients(endpoints).expect("valid test registry")
}
