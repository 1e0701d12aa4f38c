use alloy::primitives::Address;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::dexes::price_index::MAX_INDEX_TIMEOUT;
use crate::errors::ConfigError;
use crate::routing::PathBuilder;
use crate::types::Endpoint;

const ENV_PREFIX: &str = "SWAPGUARD_";

/// Static client configuration, fixed at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,
    pub router_address: String,
    pub wrapped_native_address: String,
    /// Intermediate asset for routed paths. Usually the wrapped native token.
    pub base_token_address: String,
    pub native_symbol: String,
    pub attempt_timeout_ms: u64,
    /// Defaults to `attempt_timeout_ms × endpoint count` when unset.
    pub overall_deadline_ms: Option<u64>,
    pub submit_timeout_ms: u64,
    pub price_index_url: Option<String>,
    pub index_timeout_ms: u64,
    pub bind_address: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chain_id: 56,
            rpc_urls: vec![
                "https://bsc-dataseed.binance.org".to_string(),
                "https://bsc.publicnode.com".to_string(),
                "https://rpc.ankr.com/bsc".to_string(),
                "https://bsc.drpc.org".to_string(),
                "https://bsc.llamarpc.com".to_string(),
            ],
            // PancakeSwap V2 router
            router_address: "0x10ED43C718714eb63d5aA57B78B54704E256024E".to_string(),
            wrapped_native_address: "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c".to_string(),
            base_token_address: "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c".to_string(),
            native_symbol: "BNB".to_string(),
            attempt_timeout_ms: 4_000,
            overall_deadline_ms: None,
            submit_timeout_ms: 10_000,
            price_index_url: None,
            index_timeout_ms: 5_000,
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        info!("Loading client configuration from: {}", path);

        if !Path::new(path).exists() {
            warn!("Configuration file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {}", path, e)))?;
        let config: ClientConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Io(format!("{}: {}", path, e)))?;

        info!("Client configuration loaded successfully");
        Ok(config)
    }

    pub fn load_from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply `SWAPGUARD_*` overrides read through `lookup`. Unparsable numbers are ignored with a warning.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty());
        let number = |name: &str| {
            var(name).and_then(|value| match value.trim().parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!("Ignoring {}{}={:?}: not a number", ENV_PREFIX, name, value);
                    None
                }
            })
        };

        if let Some(chain_id) = number("CHAIN_ID") {
            self.chain_id = chain_id;
        }
        if let Some(urls) = var("RPC_URLS") {
            self.rpc_urls = urls
                .split(',')
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .collect();
            info!("Loaded {} RPC endpoint(s) from environment", self.rpc_urls.len());
        }
        if let Some(router) = var("ROUTER_ADDRESS") {
            self.router_address = router;
        }
        if let Some(wrapped) = var("WRAPPED_NATIVE") {
            self.wrapped_native_address = wrapped;
        }
        if let Some(base) = var("BASE_TOKEN") {
            self.base_token_address = base;
        }
        if let Some(symbol) = var("NATIVE_SYMBOL") {
            self.native_symbol = symbol;
        }
        if let Some(ms) = number("ATTEMPT_TIMEOUT_MS") {
            self.attempt_timeout_ms = ms;
        }
        if let Some(ms) = number("OVERALL_DEADLINE_MS") {
            self.overall_deadline_ms = Some(ms);
        }
        if let Some(ms) = number("SUBMIT_TIMEOUT_MS") {
            self.submit_timeout_ms = ms;
        }
        if let Some(url) = var("PRICE_INDEX_URL") {
            self.price_index_url = Some(url);
        }
        if let Some(ms) = number("INDEX_TIMEOUT_MS") {
            self.index_timeout_ms = ms;
        }
        if let Some(addr) = var("BIND_ADDRESS") {
            self.bind_address = addr;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_urls.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }

        let mut seen = HashSet::new();
        for url in &self.rpc_urls {
            Url::parse(url).map_err(|e| ConfigError::InvalidUrl(url.clone(), e.to_string()))?;
            if !seen.insert(url.as_str()) {
                return Err(ConfigError::DuplicateEndpoint(url.clone()));
            }
        }

        if let Some(url) = &self.price_index_url {
            Url::parse(url).map_err(|e| ConfigError::InvalidUrl(url.clone(), e.to_string()))?;
        }

        self.router()?;
        self.path_builder()?;

        for (name, value) in [
            ("attempt_timeout_ms", self.attempt_timeout_ms),
            ("submit_timeout_ms", self.submit_timeout_ms),
            ("index_timeout_ms", self.index_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue(name, "must be greater than zero".into()));
            }
        }
        if self.overall_deadline_ms == Some(0) {
            return Err(ConfigError::InvalidValue("overall_deadline_ms", "must be greater than zero".into()));
        }

        Ok(())
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.rpc_urls
            .iter()
            .map(|url| Endpoint::new(url.clone(), self.chain_id))
            .collect()
    }

    pub fn router(&self) -> Result<Address, ConfigError> {
        parse_address("router_address", &self.router_address)
    }

    pub fn path_builder(&self) -> Result<PathBuilder, ConfigError> {
        let wrapped_native = parse_address("wrapped_native_address", &self.wrapped_native_address)?;
        let base = parse_address("base_token_address", &self.base_token_address)?;
        Ok(PathBuilder::new(wrapped_native, base, self.native_symbol.clone()))
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn overall_deadline(&self) -> Option<Duration> {
        self.overall_deadline_ms.map(Duration::from_millis)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    /// Index request timeout, clamped to five seconds.
    pub fn index_timeout(&self) -> Duration {
        Duration::from_millis(self.index_timeout_ms).min(MAX_INDEX_TIMEOUT)
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim()).map_err(|_| ConfigError::InvalidAddress(field, value.to_string()))
}
