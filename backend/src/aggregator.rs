use alloy::primitives::{Address, U256};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::dexes::price_index::{PriceIndexSource, MAX_INDEX_TIMEOUT};
use crate::dexes::router::query_amounts_out;
use crate::dexes::utils::DexUtils;
use crate::errors::{EndpointError, QuoteError, ValidationError};
use crate::gas::swap_gas_estimate;
use crate::price_impact::{
    categorize_impact, exchange_rate, rate_price_impact, reserve_amount_out, reserve_price_impact,
};
use crate::routing::PathBuilder;
use crate::rpc::{ChainClient, ResilientExecutor};
use crate::types::{Quote, QuoteSource, TokenRef, TradingPath};

// Decimal carries at most 28 fractional digits
const MAX_DECIMAL_SCALE: u32 = 28;

/// Layered quote source: off-chain pair index first, then the on-chain router with failover.
#[derive(Clone)]
pub struct QuoteAggregator {
    executor: ResilientExecutor,
    path_builder: PathBuilder,
    router: Address,
    price_index: Option<Arc<dyn PriceIndexSource>>,
    index_timeout: Duration,
}

impl QuoteAggregator {
    pub fn new(executor: ResilientExecutor, path_builder: PathBuilder, router: Address) -> Self {
        Self {
            executor,
            path_builder,
            router,
            price_index: None,
            index_timeout: MAX_INDEX_TIMEOUT,
        }
    }

    /// Consult `source` before the router. The timeout is capped at five seconds.
    pub fn with_price_index(mut self, source: Arc<dyn PriceIndexSource>, timeout: Duration) -> Self {
        self.price_index = Some(source);
        self.index_timeout = timeout.min(MAX_INDEX_TIMEOUT);
        self
    }

    pub fn executor(&self) -> &ResilientExecutor {
        &self.executor
    }

    pub fn path_builder(&self) -> &PathBuilder {
        &self.path_builder
    }

    #[instrument(skip(self, token_in, token_out), fields(token_in = %token_in.identifier, token_out = %token_out.identifier))]
    pub async fn get_quote(
        &self,
        amount_in: Decimal,
        token_in: &TokenRef,
        token_out: &TokenRef,
    ) -> Result<Quote, QuoteError> {
        if amount_in <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmount(format!("amountIn must be positive, got {}", amount_in)).into());
        }

        let normalized_in = self.path_builder.normalize(&token_in.identifier).identifier;
        let normalized_out = self.path_builder.normalize(&token_out.identifier).identifier;
        if normalized_in.eq_ignore_ascii_case(&normalized_out) {
            return Err(ValidationError::IdenticalTokens(normalized_in).into());
        }
        let raw_amount_in = DexUtils::decimal_to_raw(amount_in, token_in.decimals)?;

        if let Some(quote) = self
            .index_quote(amount_in, &normalized_in, &normalized_out, token_out.decimals)
            .await
        {
            return Ok(quote);
        }

        self.router_quote(amount_in, raw_amount_in, token_in, token_out).await
    }

    /// Reserve-math quote from the off-chain index. Every failure here means "try the router".
    async fn index_quote(
        &self,
        amount_in: Decimal,
        token_in: &str,
        token_out: &str,
        out_decimals: u8,
    ) -> Option<Quote> {
        let source = self.price_index.as_ref()?;

        let dataset = match tokio::time::timeout(self.index_timeout, source.fetch_dataset()).await {
            Ok(Ok(dataset)) => dataset,
            Ok(Err(e)) => {
                warn!("⚠️ Price index unavailable, falling back to router: {}", e);
                return None;
            }
            Err(_) => {
                warn!("⚠️ Price index timed out after {:?}, falling back to router", self.index_timeout);
                return None;
            }
        };

        let Some(reserves) = dataset.lookup(token_in, token_out) else {
            debug!("Pair {}/{} not in price index", token_in, token_out);
            return None;
        };

        let amount_out = reserve_amount_out(amount_in, reserves.reserve_in, reserves.reserve_out)?
            .round_dp_with_strategy(u32::from(out_decimals).min(MAX_DECIMAL_SCALE), RoundingStrategy::ToZero)
            .normalize();
        if amount_out <= Decimal::ZERO {
            debug!("Reserve math produced no output for {}/{}", token_in, token_out);
            return None;
        }

        let price_impact_pct = reserve_price_impact(amount_in, reserves.reserve_in);
        info!(
            "📊 Index quote {} -> {} ({:.4}% impact, {})",
            amount_in,
            amount_out,
            price_impact_pct,
            categorize_impact(price_impact_pct)
        );

        let route = TradingPath::direct(token_in.to_string(), token_out.to_string());
        Some(Quote {
            amount_out: amount_out.to_string(),
            price_impact_pct,
            gas_estimate: swap_gas_estimate(route.len()).to_string(),
            route,
            source: QuoteSource::PriceIndex,
        })
    }

    async fn router_quote(
        &self,
        amount_in: Decimal,
        raw_amount_in: U256,
        token_in: &TokenRef,
        token_out: &TokenRef,
    ) -> Result<Quote, QuoteError> {
        let route = self.path_builder.build_path(&token_in.identifier, &token_out.identifier);
        let path = PathBuilder::path_addresses(&route)?;
        let router = self.router;
        let unit_in = DexUtils::one_unit(token_in.decimals);
        let path_ref = &path;

        let (raw_out, client) = self
            .executor
            .execute(|handle| async move {
                let amount_out = query_amounts_out(handle.client.as_ref(), router, raw_amount_in, path_ref).await?;
                Ok::<_, EndpointError>((amount_out, handle.client))
            })
            .await
            .map_err(|aggregate| {
                warn!("🚫 No endpoint could price {}: {}", route.tokens().join(" -> "), aggregate);
                aggregate
            })?;

        if raw_out.is_zero() {
            warn!("🚫 Router returned no output for {}", route.tokens().join(" -> "));
            return Err(QuoteError::NoLiquidity(route.tokens().join(" -> ")));
        }

        // Best effort on the endpoint that answered; never fails the quote
        let reference_out = if raw_amount_in == unit_in {
            Some(raw_out)
        } else {
            let probe = reference_probe(client.as_ref(), router, unit_in, &path);
            match tokio::time::timeout(self.executor.attempt_timeout(), probe).await {
                Ok(reference) => reference,
                Err(_) => {
                    debug!("Reference probe timed out, reporting zero impact");
                    None
                }
            }
        };

        let amount_out = DexUtils::format_amount_safe(raw_out, token_out.decimals);
        let price_impact_pct = match reference_out {
            Some(reference) => {
                let expected = exchange_rate("1", &DexUtils::format_amount_safe(reference, token_out.decimals));
                let actual = exchange_rate(&amount_in.to_string(), &amount_out);
                match (expected, actual) {
                    (Some(expected), Some(actual)) => rate_price_impact(expected, actual),
                    _ => 0.0,
                }
            }
            None => 0.0,
        };

        info!(
            "✅ Router quote {} -> {} via {} hop(s) ({:.4}% impact, {})",
            amount_in,
            amount_out,
            route.hops(),
            price_impact_pct,
            categorize_impact(price_impact_pct)
        );

        Ok(Quote {
            amount_out,
            price_impact_pct,
            gas_estimate: swap_gas_estimate(route.len()).to_string(),
            route,
            source: QuoteSource::Router,
        })
    }
}

/// Output for one whole input token, used as the no-impact reference rate.
async fn reference_probe(
    client: &dyn ChainClient,
    router: Address,
    unit_in: U256,
    path: &[Address],
) -> Option<U256> {
    match query_amounts_out(client, router, unit_in, path).await {
        Ok(amount) => Some(amount),
        Err(e) => {
            debug!("Reference probe failed, reporting zero impact: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dexes::price_index::PairDataset;
    use crate::errors::PriceIndexError;
    use crate::rpc::testing::{registry_with, MockChainClient};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WBNB: &str = "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c";
    const USDT: &str = "0x55d398326f99059fF775485246999027B3197955";
    const CAKE: &str = "0x0E09FaBB73Bd3Ade0a17ECC321fD13a19e81cE82";

    struct StaticIndex {
        dataset: Result<PairDataset, ()>,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl PriceIndexSource for StaticIndex {
        async fn fetch_dataset(&self) -> Result<PairDataset, PriceIndexError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.dataset.clone().map_err(|_| PriceIndexError::Status(500))
        }
    }

    fn aggregator(clients: Vec<(&str, Arc<MockChainClient>)>) -> QuoteAggregator {
        let registry = Arc::new(registry_with(clients));
        let executor = ResilientExecutor::new(registry, Duration::from_secs(1));
        let wbnb = Address::from_str(WBNB).unwrap();
        QuoteAggregator::new(executor, PathBuilder::new(wbnb, wbnb, "BNB"), Address::repeat_byte(0x10))
    }

    fn usdt() -> TokenRef {
        TokenRef::new(USDT, "USDT", 18)
    }

    fn cake(decimals: u8) -> TokenRef {
        TokenRef::new(CAKE, "CAKE", decimals)
    }

    #[tokio::test]
    async fn test_non_positive_amount_makes_no_calls() {
        let client = Arc::new(MockChainClient::amounts_out(vec![]));
        let aggregator = aggregator(vec![("https://a", client.clone())]);

        for amount in [dec!(0), dec!(-1)] {
            let err = aggregator.get_quote(amount, &usdt(), &cake(18)).await.unwrap_err();
            assert!(matches!(err, QuoteError::Validation(ValidationError::InvalidAmount(_))));
        }
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_identical_tokens_rejected() {
        let client = Arc::new(MockChainClient::amounts_out(vec![]));
        let aggregator = aggregator(vec![("https://a", client.clone())]);

        let err = aggregator
            .get_quote(dec!(1), &TokenRef::address("BNB"), &TokenRef::address(WBNB))
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::Validation(ValidationError::IdenticalTokens(_))));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_router_quote_scales_by_output_decimals() {
        let raw = vec![U256::from(10u64).pow(U256::from(18)), U256::from(2u64), U256::from(123_456u64)];
        let client = Arc::new(MockChainClient::amounts_out(raw));
        let aggregator = aggregator(vec![("https://a", client.clone())]);

        let quote = aggregator.get_quote(dec!(1), &usdt(), &cake(3)).await.unwrap();
        assert_eq!(quote.amount_out, "123.456");
        assert_eq!(quote.source, QuoteSource::Router);
        assert_eq!(quote.route.len(), 3);
        assert_eq!(quote.gas_estimate, "220000");
        // One whole unit in: the quote itself is the reference rate
        assert_eq!(quote.price_impact_pct, 0.0);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_router_quote_reports_impact_from_reference_probe() {
        // The mock answers every call identically, so 10 units in buys what 1 unit does
        let raw = vec![U256::from(1u64), U256::from(1u64), U256::from(2_000u64)];
        let client = Arc::new(MockChainClient::amounts_out(raw));
        let aggregator = aggregator(vec![("https://a", client.clone())]);

        let quote = aggregator.get_quote(dec!(10), &usdt(), &cake(3)).await.unwrap();
        assert_eq!(quote.amount_out, "2");
        assert_eq!(quote.price_impact_pct, 50.0);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_stalled_reference_query_keeps_quote() {
        let raw = vec![U256::from(1u64), U256::from(1u64), U256::from(5u64)];
        let client = Arc::new(MockChainClient::amounts_out(raw).stalling_after(1, Duration::from_secs(5)));
        let registry = Arc::new(registry_with(vec![("https://a", client.clone())]));
        let executor = ResilientExecutor::new(registry.clone(), Duration::from_millis(200));
        let wbnb = Address::from_str(WBNB).unwrap();
        let aggregator = QuoteAggregator::new(executor, PathBuilder::new(wbnb, wbnb, "BNB"), Address::repeat_byte(0x10));

        let quote = aggregator.get_quote(dec!(10), &usdt(), &cake(0)).await.unwrap();
        assert_eq!(quote.amount_out, "5");
        assert_eq!(quote.price_impact_pct, 0.0);
        assert_eq!(client.calls(), 2);

        let stats = &registry.snapshot()[0];
        assert_eq!((stats.success_count, stats.error_count), (1, 0));
    }

    #[tokio::test]
    async fn test_zero_router_output_is_not_a_quote() {
        let raw = vec![U256::from(1u64), U256::from(1u64), U256::ZERO];
        let client = Arc::new(MockChainClient::amounts_out(raw));
        let aggregator = aggregator(vec![("https://a", client.clone())]);

        let err = aggregator.get_quote(dec!(1), &usdt(), &cake(18)).await.unwrap_err();
        assert!(matches!(err, QuoteError::NoLiquidity(_)));
        // The endpoint answered correctly, so it is not charged
        assert_eq!(aggregator.executor().registry().snapshot()[0].error_count, 0);
    }

    #[tokio::test]
    async fn test_index_output_never_rounds_up() {
        let client = Arc::new(MockChainClient::amounts_out(vec![]));
        let index = Arc::new(StaticIndex {
            dataset: Ok(PairDataset::default().with_pair(USDT, CAKE, dec!(1000), dec!(2000))),
            fetches: AtomicUsize::new(0),
        });
        let aggregator = aggregator(vec![("https://a", client)]).with_price_index(index, Duration::from_secs(1));

        // 10 * 2000 / 1010 = 19.80198..., which half-even rounding would lift to 19.802
        let quote = aggregator.get_quote(dec!(10), &usdt(), &cake(3)).await.unwrap();
        assert_eq!(quote.amount_out, "19.801");
    }

    #[tokio::test]
    async fn test_exhausted_router_is_quote_error() {
        let a = Arc::new(MockChainClient::failing(EndpointError::Connection("refused".into())));
        let b = Arc::new(MockChainClient::failing(EndpointError::Reverted("K".into())));
        let aggregator = aggregator(vec![("https://a", a), ("https://b", b)]);

        let err = aggregator.get_quote(dec!(1), &usdt(), &cake(18)).await.unwrap_err();
        match err {
            QuoteError::Exhausted(aggregate) => assert_eq!(aggregate.urls(), vec!["https://a", "https://b"]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparsable_token_charges_no_endpoint() {
        let client = Arc::new(MockChainClient::amounts_out(vec![]));
        let aggregator = aggregator(vec![("https://a", client.clone())]);

        let err = aggregator
            .get_quote(dec!(1), &TokenRef::address("not-a-token"), &cake(18))
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::Validation(ValidationError::InvalidToken(_))));
        assert_eq!(client.calls(), 0);
        assert_eq!(aggregator.executor().registry().snapshot()[0].error_count, 0);
    }

    #[tokio::test]
    async fn test_index_hit_skips_router() {
        let client = Arc::new(MockChainClient::amounts_out(vec![]));
        let index = Arc::new(StaticIndex {
            dataset: Ok(PairDataset::default().with_pair(CAKE, USDT, dec!(2000), dec!(1000))),
            fetches: AtomicUsize::new(0),
        });
        let aggregator = aggregator(vec![("https://a", client.clone())])
            .with_price_index(index.clone(), Duration::from_secs(10));

        let quote = aggregator.get_quote(dec!(10), &usdt(), &cake(18)).await.unwrap();
        assert_eq!(quote.source, QuoteSource::PriceIndex);
        assert_eq!(quote.amount_out_decimal().unwrap().round_dp(6), dec!(19.801980));
        assert!(quote.price_impact_pct > 0.0 && quote.price_impact_pct < 1.0);
        assert_eq!(quote.route.len(), 2);
        assert_eq!(index.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_index_failure_falls_through_to_router() {
        let raw = vec![U256::from(1u64), U256::from(1u64), U256::from(5u64)];
        let client = Arc::new(MockChainClient::amounts_out(raw));
        let index = Arc::new(StaticIndex {
            dataset: Err(()),
            fetches: AtomicUsize::new(0),
        });
        let aggregator = aggregator(vec![("https://a", client.clone())])
            .with_price_index(index.clone(), Duration::from_secs(1));

        let quote = aggregator.get_quote(dec!(1), &usdt(), &cake(0)).await.unwrap();
        assert_eq!(quote.source, QuoteSource::Router);
        assert_eq!(quote.amount_out, "5");
        assert_eq!(index.fetches.load(Ordering::SeqCst), 1);
    }
}
