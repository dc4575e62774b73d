use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{EventEnvelope, IncentiveId, IncentiveKey};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncentiveRequest {
    #[serde(flatten)]
    pub key: IncentiveKey,
    #[serde(with = "crate::domain::primitives::amount")]
    pub total_reward: u128,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndIncentiveRequest {
    #[serde(flatten)]
    pub key: IncentiveKey,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncentiveDto {
    pub id: String,
    pub creator: String,
    pub reward_asset: String,
    pub pool: String,
    pub start_time: u64,
    pub end_time: u64,
    pub claim_deadline: u64,
    pub total_reward_unclaimed: String,
    pub total_seconds_claimed_x128: String,
}

pub async fn create_incentive(
    State(state): State<AppState>,
    Json(request): Json<CreateIncentiveRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    let event = state
        .service
        .create_incentive(request.key, request.total_reward)
        .await?;
    Ok(Json(EventEnvelope::new(event)))
}

pub async fn end_incentive(
    State(state): State<AppState>,
    Json(request): Json<EndIncentiveRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    let event = state.service.end_incentive(request.key).await?;
    Ok(Json(EventEnvelope::new(event)))
}

pub async fn get_incentive(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<IncentiveDto>, AppError> {
    let id = IncentiveId::new(id);
    let row = state
        .repo
        .get_incentive_row(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No incentive {}", id)))?;

    Ok(Json(IncentiveDto {
        id: row.id.as_str().to_string(),
        creator: row.key.creator.as_str().to_string(),
        reward_asset: row.key.reward_asset.as_str().to_string(),
        pool: row.key.pool.as_str().to_string(),
        start_time: row.key.start_time.as_secs(),
        end_time: row.key.end_time.as_secs(),
        claim_deadline: row.key.claim_deadline.as_secs(),
        total_reward_unclaimed: row.incentive.total_reward_unclaimed.to_string(),
        total_seconds_claimed_x128: row.incentive.total_seconds_claimed_x128.to_string(),
    }))
}
