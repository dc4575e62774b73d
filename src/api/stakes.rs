use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::{AccountId, EventEnvelope, IncentiveKey, PositionId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeRequest {
    pub position: u64,
    pub caller: String,
    #[serde(flatten)]
    pub key: IncentiveKey,
}

pub async fn stake(
    State(state): State<AppState>,
    Json(request): Json<StakeRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    let event = state
        .service
        .stake(
            PositionId::new(request.position),
            request.key,
            &AccountId::new(request.caller),
        )
        .await?;
    Ok(Json(EventEnvelope::new(event)))
}

pub async fn unstake(
    State(state): State<AppState>,
    Json(request): Json<StakeRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    let event = state
        .service
        .unstake(
            PositionId::new(request.position),
            request.key,
            &AccountId::new(request.caller),
        )
        .await?;
    Ok(Json(EventEnvelope::new(event)))
}
