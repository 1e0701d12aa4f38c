use std::collections::HashMap;

use crate::errors::ConfigError;
use crate::types::{GasPricing, TransactionParameters};

const GWEI: u128 = 1_000_000_000;

/// Conservative gas limit used for every write unless a policy overrides it.
pub const DEFAULT_GAS_LIMIT: u64 = 500_000;

/// Router swap through a single pair.
pub const SWAP_GAS_DIRECT: u64 = 150_000;
/// Each extra pool hop on the route.
pub const SWAP_GAS_PER_EXTRA_HOP: u64 = 70_000;

/// Chain-specific write parameters. Pure lookup, no I/O.
pub trait TransactionPolicy: Send + Sync {
    fn params_for(&self, chain_id: u64) -> Result<TransactionParameters, ConfigError>;
}

/// Table of constant parameters per chain.
///
/// BNB Smart Chain has no fee market, so it gets a flat legacy gas price; assuming
/// EIP-1559 semantics there makes submissions fail.
#[derive(Debug, Clone)]
pub struct StaticGasPolicy {
    chains: HashMap<u64, TransactionParameters>,
}

impl StaticGasPolicy {
    pub fn empty() -> Self {
        Self { chains: HashMap::new() }
    }

    pub fn with_chain(mut self, chain_id: u64, params: TransactionParameters) -> Self {
        self.chains.insert(chain_id, params);
        self
    }

    pub fn legacy(gas_price_gwei: u128) -> TransactionParameters {
        TransactionParameters {
            pricing: GasPricing::Legacy { gas_price: gas_price_gwei * GWEI },
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    /// Fee-market pair given as (max fee, priority fee), in wei.
    pub fn fee_market(max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> TransactionParameters {
        TransactionParameters {
            pricing: GasPricing::FeeMarket {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            },
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    pub fn supported_chains(&self) -> Vec<u64> {
        let mut chains: Vec<u64> = self.chains.keys().copied().collect();
        chains.sort_unstable();
        chains
    }
}

impl Default for StaticGasPolicy {
    fn default() -> Self {
        Self::empty()
            .with_chain(56, Self::legacy(5)) // BNB Smart Chain
            .with_chain(97, Self::legacy(5)) // BSC testnet
            .with_chain(1, Self::fee_market(40 * GWEI, 2 * GWEI)) // Ethereum
            .with_chain(137, Self::fee_market(200 * GWEI, 30 * GWEI)) // Polygon
            .with_chain(42161, Self::fee_market(GWEI / 10, GWEI / 100)) // Arbitrum
            .with_chain(8453, Self::fee_market(GWEI / 10, GWEI / 1000)) // Base
            .with_chain(10, Self::fee_market(GWEI / 10, GWEI / 1000)) // Optimism
    }
}

impl TransactionPolicy for StaticGasPolicy {
    fn params_for(&self, chain_id: u64) -> Result<TransactionParameters, ConfigError> {
        self.chains
            .get(&chain_id)
            .copied()
            .ok_or(ConfigError::UnknownChain(chain_id))
    }
}

/// Gas units a router swap along a path of `path_len` tokens is expected to use.
pub fn swap_gas_estimate(path_len: usize) -> u64 {
    let extra_hops = path_len.saturating_sub(2) as u64;
    SWAP_GAS_DIRECT + extra_hops * SWAP_GAS_PER_EXTRA_HOP
}
