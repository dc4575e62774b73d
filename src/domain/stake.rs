//! Stake records and the venue's view of a position.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::domain::PoolId;

/// Position metadata resolved from the venue at stake time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInfo {
    pub pool: PoolId,
    pub tick_lower: i32,
    pub tick_upper: i32,
    #[serde(with = "crate::domain::primitives::amount")]
    pub liquidity: u128,
}

/// The association of one position with one incentive.
///
/// The liquidity amount is frozen at stake time and never re-sampled, even
/// if the underlying position's liquidity changes afterwards. Existence of
/// the record is existence of the stake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stake {
    /// Accumulator snapshot taken when the stake was opened, X128.
    pub seconds_per_liquidity_inside_initial_x128: U256,
    /// Liquidity committed to the incentive, frozen at stake time.
    #[serde(with = "crate::domain::primitives::amount")]
    pub liquidity: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_serde_roundtrip() {
        let stake = Stake {
            seconds_per_liquidity_inside_initial_x128: U256::from(7u8) << 128,
            liquidity: 1_000_000,
        };
        let json = serde_json::to_string(&stake).unwrap();
        let back: Stake = serde_json::from_str(&json).unwrap();
        assert_eq!(stake, back);
    }
}
