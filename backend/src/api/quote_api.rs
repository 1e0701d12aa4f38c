use axum::{
    extract::{Query, State},
    response::Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, instrument};

use super::{ApiError, AppState};
use crate::types::{Quote, TokenRef, DEFAULT_TOKEN_DECIMALS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    pub amount_in: String,
    pub token_in: String,
    pub token_out: String,
    pub token_in_decimals: Option<u8>,
    pub token_out_decimals: Option<u8>,
    pub slippage_bps: Option<u16>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub quote: Quote,
    #[serde(
        rename = "minimumReceived",
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub minimum_received: Option<Decimal>,
}

#[instrument(skip(state))]
pub async fn get_quote(
    State(state): State<AppState>,
    Query(params): Query<QuoteQuery>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let start = std::time::Instant::now();

    let amount_in = Decimal::from_str(params.amount_in.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid amountIn {:?}: {}", params.amount_in, e)))?;
    let token_in = TokenRef::new(
        params.token_in.as_str(),
        "",
        params.token_in_decimals.unwrap_or(DEFAULT_TOKEN_DECIMALS),
    );
    let token_out = TokenRef::new(
        params.token_out.as_str(),
        "",
        params.token_out_decimals.unwrap_or(DEFAULT_TOKEN_DECIMALS),
    );

    let quote = state.aggregator.get_quote(amount_in, &token_in, &token_out).await?;
    let minimum_received = params
        .slippage_bps
        .map(|bps| quote.minimum_received(bps))
        .transpose()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("Quote generated in {}ms", start.elapsed().as_millis());
    Ok(Json(QuoteResponse { quote, minimum_received }))
}
