//! In-memory venue for tests: settable positions and accumulators, recorded
//! transfers, and failure injection.

use alloy_primitives::U256;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{AccountId, AssetId, PoolId, PositionId, PositionInfo};

use super::{AssetTransfer, PositionCustody, PositionOracle, VenueError};

/// A recorded asset movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub direction: TransferDirection,
    pub asset: AssetId,
    pub account: AccountId,
    pub amount: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Pull,
    Push,
}

#[derive(Debug, Default)]
struct Inner {
    positions: HashMap<PositionId, PositionInfo>,
    accumulators: HashMap<(PoolId, i32, i32), U256>,
    transfers: Vec<TransferRecord>,
    custody_log: Vec<(PositionId, AccountId)>,
    fail_transfers: bool,
    fail_custody: bool,
}

/// Mock venue that returns predefined data and records every value move.
#[derive(Debug, Default)]
pub struct MockVenue {
    inner: Mutex<Inner>,
}

impl MockVenue {
    /// Create an empty mock venue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a position the oracle can resolve.
    pub fn with_position(self, position: PositionId, info: PositionInfo) -> Self {
        self.set_position(position, info);
        self
    }

    /// Register or replace a position.
    pub fn set_position(&self, position: PositionId, info: PositionInfo) {
        self.inner.lock().unwrap().positions.insert(position, info);
    }

    /// Forget a position, as if the venue burned it.
    pub fn remove_position(&self, position: PositionId) {
        self.inner.lock().unwrap().positions.remove(&position);
    }

    /// Set the accumulator value for a (pool, range) triple.
    pub fn set_accumulator(&self, pool: &PoolId, tick_lower: i32, tick_upper: i32, value: U256) {
        self.inner
            .lock()
            .unwrap()
            .accumulators
            .insert((pool.clone(), tick_lower, tick_upper), value);
    }

    /// Make every subsequent transfer fail.
    pub fn set_fail_transfers(&self, fail: bool) {
        self.inner.lock().unwrap().fail_transfers = fail;
    }

    /// Make every subsequent custody transfer fail.
    pub fn set_fail_custody(&self, fail: bool) {
        self.inner.lock().unwrap().fail_custody = fail;
    }

    /// All asset movements recorded so far.
    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.inner.lock().unwrap().transfers.clone()
    }

    /// All custody transfers recorded so far.
    pub fn custody_transfers(&self) -> Vec<(PositionId, AccountId)> {
        self.inner.lock().unwrap().custody_log.clone()
    }

    /// Net amount pushed to `account` for `asset` (pushes minus pulls).
    pub fn net_pushed(&self, asset: &AssetId, account: &AccountId) -> i128 {
        self.inner
            .lock()
            .unwrap()
            .transfers
            .iter()
            .filter(|t| &t.asset == asset && &t.account == account)
            .map(|t| match t.direction {
                TransferDirection::Push => t.amount as i128,
                TransferDirection::Pull => -(t.amount as i128),
            })
            .sum()
    }
}

#[async_trait]
impl PositionOracle for MockVenue {
    async fn resolve_position(&self, position: PositionId) -> Result<PositionInfo, VenueError> {
        self.inner
            .lock()
            .unwrap()
            .positions
            .get(&position)
            .cloned()
            .ok_or(VenueError::UnknownPosition(position))
    }

    async fn seconds_per_liquidity_inside_x128(
        &self,
        pool: &PoolId,
        tick_lower: i32,
        tick_upper: i32,
    ) -> Result<U256, VenueError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .accumulators
            .get(&(pool.clone(), tick_lower, tick_upper))
            .copied()
            .unwrap_or(U256::ZERO))
    }
}

#[async_trait]
impl AssetTransfer for MockVenue {
    async fn pull(&self, asset: &AssetId, from: &AccountId, amount: u128) -> Result<(), VenueError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_transfers {
            return Err(VenueError::TransferRejected("mock failure".to_string()));
        }
        inner.transfers.push(TransferRecord {
            direction: TransferDirection::Pull,
            asset: asset.clone(),
            account: from.clone(),
            amount,
        });
        Ok(())
    }

    async fn push(&self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<(), VenueError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_transfers {
            return Err(VenueError::TransferRejected("mock failure".to_string()));
        }
        inner.transfers.push(TransferRecord {
            direction: TransferDirection::Push,
            asset: asset.clone(),
            account: to.clone(),
            amount,
        });
        Ok(())
    }
}

#[async_trait]
impl PositionCustody for MockVenue {
    async fn transfer_position(
        &self,
        position: PositionId,
        to: &AccountId,
    ) -> Result<(), VenueError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_custody {
            return Err(VenueError::TransferRejected("mock failure".to_string()));
        }
        inner.custody_log.push((position, to.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> PositionInfo {
        PositionInfo {
            pool: PoolId::new("0xpool".to_string()),
            tick_lower: -10,
            tick_upper: 10,
            liquidity: 77,
        }
    }

    #[tokio::test]
    async fn test_resolves_registered_positions() {
        let venue = MockVenue::new().with_position(PositionId::new(1), info());
        assert_eq!(
            venue.resolve_position(PositionId::new(1)).await.unwrap(),
            info()
        );
        assert!(matches!(
            venue.resolve_position(PositionId::new(2)).await,
            Err(VenueError::UnknownPosition(_))
        ));
    }

    #[tokio::test]
    async fn test_accumulator_defaults_to_zero_and_updates() {
        let venue = MockVenue::new();
        let pool = PoolId::new("0xpool".to_string());

        let value = venue
            .seconds_per_liquidity_inside_x128(&pool, -10, 10)
            .await
            .unwrap();
        assert_eq!(value, U256::ZERO);

        venue.set_accumulator(&pool, -10, 10, U256::from(5u8));
        let value = venue
            .seconds_per_liquidity_inside_x128(&pool, -10, 10)
            .await
            .unwrap();
        assert_eq!(value, U256::from(5u8));
    }

    #[tokio::test]
    async fn test_records_transfers_and_injects_failures() {
        let venue = MockVenue::new();
        let asset = AssetId::new("0xreward".to_string());
        let alice = AccountId::new("0xalice".to_string());

        venue.pull(&asset, &alice, 100).await.unwrap();
        venue.push(&asset, &alice, 40).await.unwrap();
        assert_eq!(venue.net_pushed(&asset, &alice), -60);

        venue.set_fail_transfers(true);
        assert!(venue.push(&asset, &alice, 1).await.is_err());
        assert_eq!(venue.transfers().len(), 2);
    }
}
