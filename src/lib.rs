pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod venue;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    AccountId, AssetId, Deposit, Incentive, IncentiveId, IncentiveKey, LedgerEvent, PoolId,
    PositionId, PositionInfo, Stake, Timestamp,
};
pub use engine::{AccrualEngine, EngineError};
pub use error::AppError;
pub use orchestration::{Clock, ManualClock, StakingService, SystemClock};
pub use venue::{HttpVenue, MockVenue, PositionOracle, VenueError};
