pub mod quote_api;
pub mod tx_api;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::aggregator::QuoteAggregator;
use crate::errors::{ConfigError, QuoteError, SubmitError};
use crate::gas::TransactionPolicy;
use crate::rpc::{EndpointRegistry, EndpointSnapshot, TransactionSubmitter};

/// Message shown whenever no source could produce a price.
pub const PRICE_UNAVAILABLE: &str = "price unavailable, try again";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<QuoteAggregator>,
    pub submitter: Arc<TransactionSubmitter>,
    pub policy: Arc<dyn TransactionPolicy>,
}

impl AppState {
    pub fn new(
        aggregator: Arc<QuoteAggregator>,
        submitter: Arc<TransactionSubmitter>,
        policy: Arc<dyn TransactionPolicy>,
    ) -> Self {
        Self {
            aggregator,
            submitter,
            policy,
        }
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        self.aggregator.executor().registry()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Error responses of the HTTP surface.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    PriceUnavailable,
    Upstream(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::PriceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, PRICE_UNAVAILABLE.to_string()),
            ApiError::Upstream(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::Validation(e) => ApiError::BadRequest(e.to_string()),
            QuoteError::Exhausted(e) => {
                error!("Quote failed: {}", e);
                ApiError::PriceUnavailable
            }
            QuoteError::NoLiquidity(route) => {
                warn!("Zero-output quote withheld for {}", route);
                ApiError::PriceUnavailable
            }
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Validation(e) => ApiError::BadRequest(e.to_string()),
            endpoint @ SubmitError::Endpoint { .. } => ApiError::Upstream(endpoint.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/endpoints", get(endpoint_health))
        .route("/quote", get(quote_api::get_quote))
        .route("/tx/params", get(tx_api::get_tx_params))
        .route("/tx/submit", post(tx_api::submit_transaction))
}

async fn health_check() -> &'static str {
    info!("Health check requested");
    "ok"
}

async fn endpoint_health(State(state): State<AppState>) -> Json<Vec<EndpointSnapshot>> {
    Json(state.registry().snapshot())
}
