use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::types::clamp_price_impact;

/// Constant-product output `amountIn * reserveOut / (reserveIn + amountIn)`, fee-less.
///
/// `None` for non-positive inputs or on overflow.
pub fn reserve_amount_out(amount_in: Decimal, reserve_in: Decimal, reserve_out: Decimal) -> Option<Decimal> {
    if amount_in <= Decimal::ZERO || reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
        return None;
    }
    let numerator = amount_in.checked_mul(reserve_out)?;
    let denominator = reserve_in.checked_add(amount_in)?;
    let amount_out = numerator.checked_div(denominator)?;
    (amount_out >= Decimal::ZERO).then_some(amount_out)
}

/// Share of the pool a trade consumes, in percent: `amountIn / (reserveIn + amountIn) * 100`.
pub fn reserve_price_impact(amount_in: Decimal, reserve_in: Decimal) -> f64 {
    let denominator = reserve_in + amount_in;
    if denominator <= Decimal::ZERO {
        return 0.0;
    }
    let impact = (amount_in / denominator * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0);
    clamp_price_impact(impact)
}

/// Deviation of the executed rate from a reference rate: `|expected - actual| / expected * 100`.
pub fn rate_price_impact(expected_rate: f64, actual_rate: f64) -> f64 {
    if !expected_rate.is_finite() || !actual_rate.is_finite() || expected_rate <= 0.0 {
        return 0.0;
    }
    clamp_price_impact((expected_rate - actual_rate).abs() / expected_rate * 100.0)
}

/// Human-unit exchange rate `amount_out / amount_in`, from decimal strings.
pub fn exchange_rate(amount_in: &str, amount_out: &str) -> Option<f64> {
    let amount_in: f64 = amount_in.parse().ok()?;
    let amount_out: f64 = amount_out.parse().ok()?;
    if amount_in <= 0.0 || !amount_out.is_finite() {
        return None;
    }
    Some(amount_out / amount_in)
}

pub fn categorize_impact(price_impact: f64) -> &'static str {
    match price_impact {
        x if x < 0.1 => "Minimal",
        x if x < 1.0 => "Low",
        x if x < 3.0 => "Medium",
        x if x < 5.0 => "High",
        _ => "Very High",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reserve_math_to_six_places() {
        let out = reserve_amount_out(dec!(10), dec!(1000), dec!(2000)).unwrap();
        assert_eq!(out.round_dp(6), dec!(19.801980));
    }

    #[test]
    fn test_reserve_math_rejects_empty_pool() {
        assert!(reserve_amount_out(dec!(10), dec!(0), dec!(2000)).is_none());
        assert!(reserve_amount_out(dec!(0), dec!(1000), dec!(2000)).is_none());
    }

    #[test]
    fn test_reserve_price_impact() {
        let impact = reserve_price_impact(dec!(10), dec!(1000));
        assert!((impact - 0.990099).abs() < 1e-5);

        // Draining most of the pool is clamped
        assert_eq!(reserve_price_impact(dec!(1000000), dec!(1)), 50.0);
    }

    #[test]
    fn test_rate_price_impact() {
        assert!((rate_price_impact(2.0, 1.98) - 1.0).abs() < 1e-9);
        assert_eq!(rate_price_impact(0.0, 1.0), 0.0);
        assert_eq!(rate_price_impact(f64::NAN, 1.0), 0.0);
        assert_eq!(rate_price_impact(1.0, 0.0), 50.0);
    }

    #[test]
    fn test_exchange_rate() {
        assert_eq!(exchange_rate("4", "2"), Some(0.5));
        assert_eq!(exchange_rate("0", "1"), None);
        assert_eq!(exchange_rate("abc", "1"), None);
    }

    #[test]
    fn test_impact_categorization() {
        assert_eq!(categorize_impact(0.05), "Minimal");
        assert_eq!(categorize_impact(0.5), "Low");
        assert_eq!(categorize_impact(2.0), "Medium");
        assert_eq!(categorize_impact(4.0), "High");
        assert_eq!(categorize_impact(10.0), "Very High");
    }
}
