use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{AccountId, AssetId, EventEnvelope};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardQuery {
    pub asset: String,
    pub owner: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBalanceResponse {
    pub asset: String,
    pub owner: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub asset: String,
    pub beneficiary: String,
    /// Payout destination; defaults to the beneficiary itself.
    #[serde(default)]
    pub to: Option<String>,
}

pub async fn get_reward_balance(
    Query(params): Query<RewardQuery>,
    State(state): State<AppState>,
) -> Result<Json<RewardBalanceResponse>, AppError> {
    let asset = AssetId::new(params.asset);
    let owner = AccountId::new(params.owner);
    let amount = state.service.reward_balance(&asset, &owner).await;

    Ok(Json(RewardBalanceResponse {
        asset: asset.as_str().to_string(),
        owner: owner.as_str().to_string(),
        amount: amount.to_string(),
    }))
}

pub async fn claim(
    State(state): State<AppState>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    let beneficiary = AccountId::new(request.beneficiary);
    let to = request
        .to
        .map(AccountId::new)
        .unwrap_or_else(|| beneficiary.clone());

    let event = state
        .service
        .claim_reward(AssetId::new(request.asset), beneficiary, to)
        .await?;
    Ok(Json(EventEnvelope::new(event)))
}
