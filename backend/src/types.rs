use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ValidationError;

pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// One configured RPC access point. Identity is `(url, chain_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, chain_id: u64) -> Self {
        Self { url: url.into(), chain_id }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (chain {})", self.url, self.chain_id)
    }
}

/// Token as supplied by the caller: a contract address or the native-asset sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    pub identifier: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    DEFAULT_TOKEN_DECIMALS
}

impl TokenRef {
    pub fn new(identifier: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            identifier: identifier.into(),
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Token with unknown metadata; decimals default to 18.
    pub fn address(identifier: impl Into<String>) -> Self {
        Self::new(identifier, "", DEFAULT_TOKEN_DECIMALS)
    }
}

/// Ordered token identifiers, either a direct pair or a route through the base asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradingPath(Vec<String>);

impl TradingPath {
    pub fn direct(token_in: String, token_out: String) -> Self {
        Self(vec![token_in, token_out])
    }

    pub fn via(token_in: String, base: String, token_out: String) -> Self {
        Self(vec![token_in, base, token_out])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn hops(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuoteSource {
    PriceIndex,
    Router,
}

/// Normalized quote returned to the business layer. Never cached here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "amountOut")]
    pub amount_out: String,
    #[serde(rename = "priceImpactPct")]
    pub price_impact_pct: f64,
    pub route: TradingPath,
    #[serde(rename = "gasEstimate")]
    pub gas_estimate: String,
    pub source: QuoteSource,
}

impl Quote {
    pub fn amount_out_decimal(&self) -> Result<Decimal, ValidationError> {
        self.amount_out
            .parse::<Decimal>()
            .map_err(|e| ValidationError::InvalidAmount(format!("{}: {}", self.amount_out, e)))
    }

    /// Minimum received after applying slippage tolerance in basis points.
    pub fn minimum_received(&self, slippage_bps: u16) -> Result<Decimal, ValidationError> {
        let amount_out = self.amount_out_decimal()?;
        if slippage_bps >= 10_000 {
            return Ok(Decimal::ZERO); // 100%+ slippage = no minimum
        }
        let factor = Decimal::from(10_000 - slippage_bps) / Decimal::from(10_000);
        Ok((amount_out * factor).normalize())
    }
}

/// Clamp a price impact percentage into `[0, 50]`. NaN collapses to 0.
pub fn clamp_price_impact(pct: f64) -> f64 {
    if pct.is_nan() {
        return 0.0;
    }
    pct.clamp(0.0, 50.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxType {
    Legacy,
    FeeMarket,
}

/// Gas pricing for a write. Legacy chains take a flat gas price, fee-market chains a fee pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GasPricing {
    Legacy {
        #[serde(rename = "gasPrice")]
        gas_price: u128,
    },
    FeeMarket {
        #[serde(rename = "maxFeePerGas")]
        max_fee_per_gas: u128,
        #[serde(rename = "maxPriorityFeePerGas")]
        max_priority_fee_per_gas: u128,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionParameters {
    pub pricing: GasPricing,
    #[serde(rename = "gasLimit")]
    pub gas_limit: u64,
}

impl TransactionParameters {
    pub fn tx_type(&self) -> TxType {
        match self.pricing {
            GasPricing::Legacy { .. } => TxType::Legacy,
            GasPricing::FeeMarket { .. } => TxType::FeeMarket,
        }
    }

    /// Flat gas price for legacy chains, `None` on fee-market chains.
    pub fn gas_price(&self) -> Option<u128> {
        match self.pricing {
            GasPricing::Legacy { gas_price } => Some(gas_price),
            GasPricing::FeeMarket { .. } => None,
        }
    }
}
