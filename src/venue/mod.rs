//! Collaborator interfaces to the external liquidity venue.
//!
//! The engine consumes three narrow capabilities: position metadata and the
//! cumulative seconds-per-liquidity accumulator (the metering signal),
//! asset transfers for funding and payouts, and position custody transfer.
//! All three are trusted externally-ordered collaborators; a failed
//! transfer fails the whole surrounding operation.

use alloy_primitives::U256;
use async_trait::async_trait;
use std::fmt;

use crate::domain::{AccountId, AssetId, PoolId, PositionId, PositionInfo};

pub mod http;
pub mod mock;

pub use http::HttpVenue;
pub use mock::MockVenue;

/// Read-only view of positions and the accumulator.
#[async_trait]
pub trait PositionOracle: Send + Sync + fmt::Debug {
    /// Resolve a position's pool, range and current liquidity.
    ///
    /// Fails for unknown position ids; the engine never guesses.
    async fn resolve_position(&self, position: PositionId) -> Result<PositionInfo, VenueError>;

    /// Sample the cumulative seconds-per-unit-liquidity counter for a range,
    /// X128 fixed point, as of the current instant.
    ///
    /// Monotonically non-decreasing while the range is in-range.
    async fn seconds_per_liquidity_inside_x128(
        &self,
        pool: &PoolId,
        tick_lower: i32,
        tick_upper: i32,
    ) -> Result<U256, VenueError>;
}

/// Moves reward assets between venue accounts and engine custody.
#[async_trait]
pub trait AssetTransfer: Send + Sync + fmt::Debug {
    /// Pull `amount` of `asset` from `from` into engine custody.
    async fn pull(&self, asset: &AssetId, from: &AccountId, amount: u128) -> Result<(), VenueError>;

    /// Push `amount` of `asset` from engine custody to `to`.
    async fn push(&self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<(), VenueError>;
}

/// Transfers position custody back out of the engine.
#[async_trait]
pub trait PositionCustody: Send + Sync + fmt::Debug {
    async fn transfer_position(&self, position: PositionId, to: &AccountId)
        -> Result<(), VenueError>;
}

/// Error type for venue operations.
#[derive(Debug, Clone)]
pub enum VenueError {
    /// The venue does not know this position id.
    UnknownPosition(PositionId),
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded on an idempotent read
    RateLimited,
    /// The venue refused a transfer (insufficient balance, frozen asset, ...)
    TransferRejected(String),
}

impl fmt::Display for VenueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueError::UnknownPosition(position) => {
                write!(f, "Unknown position: {}", position)
            }
            VenueError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            VenueError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            VenueError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            VenueError::RateLimited => write!(f, "Rate limited"),
            VenueError::TransferRejected(msg) => write!(f, "Transfer rejected: {}", msg),
        }
    }
}

impl std::error::Error for VenueError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_error_display() {
        let err = VenueError::UnknownPosition(PositionId::new(9));
        assert_eq!(err.to_string(), "Unknown position: 9");

        let err = VenueError::HttpError {
            status: 502,
            message: "Bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 502: Bad gateway");

        let err = VenueError::TransferRejected("insufficient balance".to_string());
        assert_eq!(err.to_string(), "Transfer rejected: insufficient balance");
    }
}
