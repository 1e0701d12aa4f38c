use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, AppState};
use crate::types::{TransactionParameters, TxType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub raw_transaction: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub tx_hash: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxParamsResponse {
    pub chain_id: u64,
    #[serde(flatten)]
    pub params: TransactionParameters,
    pub tx_type: TxType,
}

pub async fn get_tx_params(State(state): State<AppState>) -> Result<Json<TxParamsResponse>, ApiError> {
    let chain_id = state.registry().chain_id();
    let params = state.policy.params_for(chain_id)?;
    Ok(Json(TxParamsResponse {
        chain_id,
        tx_type: params.tx_type(),
        params,
    }))
}

pub async fn submit_transaction(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let encoded = request.raw_transaction.trim();
    let raw = hex::decode(encoded.strip_prefix("0x").unwrap_or(encoded))
        .map_err(|e| ApiError::BadRequest(format!("rawTransaction is not valid hex: {}", e)))?;

    let params = state.policy.params_for(state.registry().chain_id())?;
    let tx_hash = state.submitter.submit(&raw, &params).await?;

    info!("Transaction submitted: {}", tx_hash);
    Ok(Json(SubmitResponse {
        tx_hash: tx_hash.to_string(),
    }))
}
