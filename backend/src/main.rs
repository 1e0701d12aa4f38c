use anyhow::Context;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use swapguard_backend::{
    api::{create_router, AppState},
    dexes::HttpPriceIndex,
    ClientConfig, EndpointRegistry, QuoteAggregator, ResilientExecutor, StaticGasPolicy, TransactionPolicy,
    TransactionSubmitter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = match std::env::var("SWAPGUARD_CONFIG") {
        Ok(path) => ClientConfig::load_from_file(&path)?.with_overrides(|key| std::env::var(key).ok()),
        Err(_) => ClientConfig::load_from_env(),
    };
    config.validate()?;

    let policy = StaticGasPolicy::default();
    if let Err(e) = policy.params_for(config.chain_id) {
        warn!("⚠️ {}; transaction endpoints will be unavailable", e);
    }

    let registry = Arc::new(EndpointRegistry::connect(config.endpoints())?);
    info!("✅ Endpoint registry ready with {} endpoint(s) on chain {}", registry.len(), registry.chain_id());

    let mut executor = ResilientExecutor::new(registry.clone(), config.attempt_timeout());
    if let Some(deadline) = config.overall_deadline() {
        executor = executor.with_overall_deadline(deadline);
    }

    let mut aggregator = QuoteAggregator::new(executor, config.path_builder()?, config.router()?);
    if let Some(url) = &config.price_index_url {
        let index = HttpPriceIndex::new(url.clone(), config.index_timeout()).context("building price index client")?;
        aggregator = aggregator.with_price_index(Arc::new(index), config.index_timeout());
        info!("✅ Price index enabled: {}", url);
    }

    let state = AppState::new(
        Arc::new(aggregator),
        Arc::new(TransactionSubmitter::new(registry, config.submit_timeout())),
        Arc::new(policy),
    );

    let app = create_router().layer(CorsLayer::permissive()).with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("🚀 Server running on http://{}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
