use alloy::primitives::U256;
use rust_decimal::Decimal;

use crate::errors::ValidationError;

// 10^77 is the largest power of ten that fits in a U256
const MAX_DECIMALS: u8 = 77;

/// Amount conversions between human-readable decimals and raw token units
pub struct DexUtils;

impl DexUtils {
    /// Parse amount string to U256 with proper decimal handling - NO FLOATING POINT
    pub fn parse_amount_safe(amount: &str, decimals: u8) -> Result<U256, ValidationError> {
        if amount.is_empty() {
            return Err(ValidationError::InvalidAmount("Empty amount".into()));
        }
        if decimals > MAX_DECIMALS {
            return Err(ValidationError::InvalidAmount(format!("Unsupported decimals: {}", decimals)));
        }

        let parts: Vec<&str> = amount.split('.').collect();
        if parts.len() > 2 {
            return Err(ValidationError::InvalidAmount("Multiple decimal points".into()));
        }

        let whole_part = if parts[0].is_empty() {
            U256::ZERO
        } else {
            U256::from_str_radix(parts[0], 10)
                .map_err(|e| ValidationError::InvalidAmount(format!("Invalid whole number: {}", e)))?
        };

        let decimal_part = match parts.get(1) {
            Some(decimal_str) if !decimal_str.is_empty() => {
                if decimal_str.len() > decimals as usize {
                    return Err(ValidationError::InvalidAmount("Too many decimal places".into()));
                }
                // Pad with zeros to match decimals
                let padded = format!("{:0<width$}", decimal_str, width = decimals as usize);
                U256::from_str_radix(&padded, 10)
                    .map_err(|e| ValidationError::InvalidAmount(format!("Invalid decimal part: {}", e)))?
            }
            _ => U256::ZERO,
        };

        let multiplier = U256::from(10).pow(U256::from(decimals));
        whole_part
            .checked_mul(multiplier)
            .and_then(|wei| wei.checked_add(decimal_part))
            .ok_or_else(|| ValidationError::InvalidAmount("Amount overflows uint256".into()))
    }

    /// Raw units for a non-negative decimal amount.
    pub fn decimal_to_raw(amount: Decimal, decimals: u8) -> Result<U256, ValidationError> {
        if amount.is_sign_negative() {
            return Err(ValidationError::InvalidAmount(format!("Negative amount: {}", amount)));
        }
        Self::parse_amount_safe(&amount.normalize().to_string(), decimals)
    }

    /// Format U256 amount to human-readable string with proper decimal handling
    pub fn format_amount_safe(amount: U256, decimals: u8) -> String {
        if decimals > MAX_DECIMALS {
            return "0".to_string();
        }

        let divisor = U256::from(10).pow(U256::from(decimals));
        let whole = amount / divisor;
        let remainder = amount % divisor;

        if remainder.is_zero() {
            return whole.to_string();
        }

        let remainder_str = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
        let trimmed = remainder_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }

    /// One whole token in raw units.
    pub fn one_unit(decimals: u8) -> U256 {
        U256::from(10).pow(U256::from(decimals.min(MAX_DECIMALS)))
    }
}
