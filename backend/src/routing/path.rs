use alloy::primitives::Address;
use std::str::FromStr;
use tracing::warn;

use crate::errors::{NormalizationWarning, ValidationError};
use crate::types::TradingPath;

/// Address conventionally used for the chain's native asset.
pub const NATIVE_SENTINEL: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

/// Result of [`PathBuilder::normalize`]. The identifier is always usable as a string;
/// `warning` is set when it was passed through unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub identifier: String,
    pub warning: Option<NormalizationWarning>,
}

/// Maps token identifiers onto router paths through a single base liquidity asset.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    wrapped_native: Address,
    base: Address,
    native_symbol: String,
}

impl PathBuilder {
    pub fn new(wrapped_native: Address, base: Address, native_symbol: impl Into<String>) -> Self {
        Self {
            wrapped_native,
            base,
            native_symbol: native_symbol.into(),
        }
    }

    pub fn is_native(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        identifier.eq_ignore_ascii_case(NATIVE_SENTINEL)
            || identifier.eq_ignore_ascii_case(&self.native_symbol)
            || Address::from_str(identifier).map(|a| a == Address::ZERO).unwrap_or(false)
    }

    /// Canonical (checksummed) identifier. Native sentinels become the wrapped-native contract.
    pub fn normalize(&self, identifier: &str) -> Normalized {
        if self.is_native(identifier) {
            return Normalized {
                identifier: self.wrapped_native.to_checksum(None),
                warning: None,
            };
        }

        match Address::from_str(identifier.trim()) {
            Ok(address) => Normalized {
                identifier: address.to_checksum(None),
                warning: None,
            },
            Err(e) => {
                let warning = NormalizationWarning {
                    identifier: identifier.to_string(),
                    reason: e.to_string(),
                };
                warn!("⚠️ {}", warning);
                Normalized {
                    identifier: identifier.to_string(),
                    warning: Some(warning),
                }
            }
        }
    }

    /// Direct pair when either leg is native or already the base asset, otherwise routed via the base.
    pub fn build_path(&self, token_in: &str, token_out: &str) -> TradingPath {
        let direct = self.is_native(token_in) || self.is_native(token_out);
        let token_in = self.normalize(token_in).identifier;
        let token_out = self.normalize(token_out).identifier;

        let base = self.base.to_checksum(None);
        if direct || token_in.eq_ignore_ascii_case(&base) || token_out.eq_ignore_ascii_case(&base) {
            TradingPath::direct(token_in, token_out)
        } else {
            TradingPath::via(token_in, base, token_out)
        }
    }

    /// Router-ready addresses for a built path.
    pub fn path_addresses(path: &TradingPath) -> Result<Vec<Address>, ValidationError> {
        path.tokens()
            .iter()
            .map(|token| {
                Address::from_str(token).map_err(|_| ValidationError::InvalidToken(token.clone()))
            })
            .collect()
    }
}
