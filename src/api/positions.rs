use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{AccountId, EventEnvelope, IncentiveKey, PositionId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInRequest {
    /// The custody contract notifying us; must match the configured one.
    pub custodian: String,
    pub position: u64,
    pub from: String,
    /// Optional payload: stake the position into this incentive atomically.
    #[serde(default)]
    pub stake_in: Option<IncentiveKey>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub caller: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub position: u64,
    pub owner: String,
    pub number_of_stakes: u32,
}

pub async fn transfer_in(
    State(state): State<AppState>,
    Json(request): Json<TransferInRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    let event = state
        .service
        .deposit_position(
            &AccountId::new(request.custodian),
            PositionId::new(request.position),
            AccountId::new(request.from),
            request.stake_in,
        )
        .await?;
    Ok(Json(EventEnvelope::new(event)))
}

pub async fn withdraw(
    Path(position): Path<u64>,
    State(state): State<AppState>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<EventEnvelope>, AppError> {
    let event = state
        .service
        .withdraw_position(
            PositionId::new(position),
            &AccountId::new(request.caller),
            AccountId::new(request.to),
        )
        .await?;
    Ok(Json(EventEnvelope::new(event)))
}

pub async fn get_position(
    Path(position): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<PositionDto>, AppError> {
    let position = PositionId::new(position);
    let deposit = state
        .service
        .deposit_record(position)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No deposit for position {}", position)))?;

    Ok(Json(PositionDto {
        position: position.as_u64(),
        owner: deposit.owner.as_str().to_string(),
        number_of_stakes: deposit.number_of_stakes,
    }))
}
