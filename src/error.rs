use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::engine::EngineError;
use crate::orchestration::ServiceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Upstream venue error: {0}")]
    BadGateway(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::InvalidWindow | EngineError::InvalidReward(_) => {
                AppError::BadRequest(message)
            }
            EngineError::IncentiveNotFound(_)
            | EngineError::DepositNotFound(_)
            | EngineError::StakeNotFound { .. } => AppError::NotFound(message),
            EngineError::IncentiveExists(_)
            | EngineError::AlreadyStaked { .. }
            | EngineError::StakesActive { .. }
            | EngineError::PoolMismatch { .. }
            | EngineError::ZeroLiquidity(_)
            | EngineError::NotStarted
            | EngineError::Ended
            | EngineError::NotYetClaimable => AppError::Conflict(message),
            EngineError::NotDepositOwner { .. } => AppError::Forbidden(message),
            EngineError::Arithmetic(_) | EngineError::BalanceOverflow { .. } => {
                AppError::Internal(message)
            }
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Engine(e) => e.into(),
            ServiceError::Venue(e) => AppError::BadGateway(e.to_string()),
            ServiceError::Db(e) => e.into(),
            ServiceError::UntrustedCustodian(_) => AppError::Forbidden(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
