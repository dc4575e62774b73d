pub mod health;
pub mod incentives;
pub mod positions;
pub mod rewards;
pub mod stakes;

use crate::db::Repository;
use crate::orchestration::StakingService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StakingService>,
    pub repo: Arc<Repository>,
}

impl AppState {
    pub fn new(service: Arc<StakingService>, repo: Arc<Repository>) -> Self {
        Self { service, repo }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/incentives", post(incentives::create_incentive))
        .route("/v1/incentives/end", post(incentives::end_incentive))
        .route("/v1/incentives/:id", get(incentives::get_incentive))
        .route("/v1/positions/transfer-in", post(positions::transfer_in))
        .route("/v1/positions/:id/withdraw", post(positions::withdraw))
        .route("/v1/positions/:id", get(positions::get_position))
        .route("/v1/stakes", post(stakes::stake))
        .route("/v1/stakes/unstake", post(stakes::unstake))
        .route("/v1/rewards", get(rewards::get_reward_balance))
        .route("/v1/rewards/claim", post(rewards::claim))
        .layer(cors)
        .with_state(state)
}
