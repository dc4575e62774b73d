//! Deposit custody and stake lifecycle operations.
//!
//! State machine per position: NotDeposited -> Deposited(owner, stakes=0)
//! -> Staked(n>0) <-> Deposited(n-1) -> Withdrawn. A position may be staked
//! in many incentives at once, but at most once per incentive.

use alloy_primitives::U256;

use crate::domain::{
    AccountId, ArithmeticError, Deposit, Incentive, IncentiveId, IncentiveKey, PositionId,
    PositionInfo, Stake, Timestamp,
};

use super::{accrual, AccrualEngine, EngineError};

/// Everything produced by one unstake: the credited reward plus the prior
/// records needed to reverse the transition if a later external effect in
/// the same operation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnstakeSettlement {
    pub owner: AccountId,
    pub reward: u128,
    pub seconds_inside_x128: U256,
    pub(crate) replaced_incentive: Incentive,
    pub(crate) removed_stake: Stake,
}

impl AccrualEngine {
    /// Record custody of a position transferred in by `owner`.
    ///
    /// Any stale record from a previous custody cycle is re-initialized;
    /// withdrawal already guaranteed it carried no active stakes.
    pub fn deposit_position(&mut self, position: PositionId, owner: AccountId) {
        self.deposits_mut().insert(position, Deposit::new(owner));
    }

    /// Stake a deposited position into an incentive.
    ///
    /// `info` and the accumulator snapshot were sampled from the venue by
    /// the caller immediately before this call. The committed liquidity is
    /// frozen here and never re-sampled.
    pub fn stake(
        &mut self,
        position: PositionId,
        key: &IncentiveKey,
        caller: &AccountId,
        info: &PositionInfo,
        seconds_per_liquidity_inside_x128: U256,
        now: Timestamp,
    ) -> Result<u128, EngineError> {
        self.owned_deposit(position, caller)?;

        let id = key.id();
        if self.incentive(&id).is_none() {
            return Err(EngineError::IncentiveNotFound(id));
        }
        if now < key.start_time {
            return Err(EngineError::NotStarted);
        }
        if now >= key.end_time {
            return Err(EngineError::Ended);
        }
        if self.stake_record(position, &id).is_some() {
            return Err(EngineError::AlreadyStaked {
                position,
                incentive: id,
            });
        }
        if info.pool != key.pool {
            return Err(EngineError::PoolMismatch {
                position,
                expected: key.pool.clone(),
                actual: info.pool.clone(),
            });
        }
        if info.liquidity == 0 {
            return Err(EngineError::ZeroLiquidity(position));
        }

        self.stakes_mut().insert(
            (position, id),
            Stake {
                seconds_per_liquidity_inside_initial_x128: seconds_per_liquidity_inside_x128,
                liquidity: info.liquidity,
            },
        );
        if let Some(deposit) = self.deposits_mut().get_mut(&position) {
            deposit.number_of_stakes += 1;
        }

        Ok(info.liquidity)
    }

    /// Unstake a position from an incentive, settling its reward.
    ///
    /// Validations and the accrual computation complete before the first
    /// mutation; an error leaves every ledger untouched.
    pub fn unstake(
        &mut self,
        position: PositionId,
        key: &IncentiveKey,
        caller: &AccountId,
        seconds_per_liquidity_inside_x128: U256,
        now: Timestamp,
    ) -> Result<UnstakeSettlement, EngineError> {
        let owner = self.owned_deposit(position, caller)?.owner.clone();

        let id = key.id();
        let stake = self
            .stake_record(position, &id)
            .cloned()
            .ok_or_else(|| EngineError::StakeNotFound {
                position,
                incentive: id.clone(),
            })?;
        let incentive = self
            .incentive(&id)
            .cloned()
            .ok_or_else(|| EngineError::IncentiveNotFound(id.clone()))?;

        let settled = accrual::compute_reward(
            incentive.total_reward_unclaimed,
            incentive.total_seconds_claimed_x128,
            key.start_time,
            key.end_time,
            stake.liquidity,
            stake.seconds_per_liquidity_inside_initial_x128,
            seconds_per_liquidity_inside_x128,
            now,
        )?;

        // Stage every checked update before mutating anything.
        let new_claimed = incentive
            .total_seconds_claimed_x128
            .checked_add(settled.seconds_inside_x128)
            .ok_or(ArithmeticError::Overflow("total seconds claimed"))?;
        let new_unclaimed = incentive
            .total_reward_unclaimed
            .checked_sub(settled.reward)
            .ok_or(ArithmeticError::Underflow("total reward unclaimed"))?;
        let balance_key = (key.reward_asset.clone(), owner.clone());
        let new_balance = self
            .reward_balance(&key.reward_asset, &owner)
            .checked_add(settled.reward)
            .ok_or_else(|| EngineError::BalanceOverflow {
                asset: key.reward_asset.clone(),
                owner: owner.clone(),
            })?;

        // Commit.
        self.incentives_mut().insert(
            id.clone(),
            Incentive {
                total_reward_unclaimed: new_unclaimed,
                total_seconds_claimed_x128: new_claimed,
            },
        );
        self.stakes_mut().remove(&(position, id));
        if let Some(deposit) = self.deposits_mut().get_mut(&position) {
            deposit.number_of_stakes = deposit.number_of_stakes.saturating_sub(1);
        }
        if settled.reward > 0 {
            self.rewards_mut().insert(balance_key, new_balance);
        }

        Ok(UnstakeSettlement {
            owner,
            reward: settled.reward,
            seconds_inside_x128: settled.seconds_inside_x128,
            replaced_incentive: incentive,
            removed_stake: stake,
        })
    }

    /// Remove the custody record for a withdrawable position.
    ///
    /// Returns the removed record so the custody transfer that follows can
    /// be compensated if it fails.
    pub fn withdraw_position(
        &mut self,
        position: PositionId,
        caller: &AccountId,
    ) -> Result<Deposit, EngineError> {
        let deposit = self.owned_deposit(position, caller)?;
        if deposit.number_of_stakes != 0 {
            return Err(EngineError::StakesActive {
                position,
                count: deposit.number_of_stakes,
            });
        }
        self.deposits_mut()
            .remove(&position)
            .ok_or(EngineError::DepositNotFound(position))
    }

    /// Undo helper: drop a just-recorded deposit.
    pub(crate) fn forget_deposit(&mut self, position: PositionId) {
        self.deposits_mut().remove(&position);
    }

    /// Undo helper: reinstate a custody record.
    pub(crate) fn restore_deposit(&mut self, position: PositionId, deposit: Deposit) {
        self.deposits_mut().insert(position, deposit);
    }

    /// Undo helper: reverse a committed stake transition.
    pub(crate) fn rollback_stake(&mut self, position: PositionId, incentive: &IncentiveId) {
        self.stakes_mut().remove(&(position, incentive.clone()));
        if let Some(deposit) = self.deposits_mut().get_mut(&position) {
            deposit.number_of_stakes = deposit.number_of_stakes.saturating_sub(1);
        }
    }

    /// Undo helper: reverse a committed unstake transition.
    pub(crate) fn rollback_unstake(
        &mut self,
        position: PositionId,
        incentive: &IncentiveId,
        key: &IncentiveKey,
        settlement: &UnstakeSettlement,
    ) {
        self.incentives_mut()
            .insert(incentive.clone(), settlement.replaced_incentive.clone());
        self.stakes_mut().insert(
            (position, incentive.clone()),
            settlement.removed_stake.clone(),
        );
        if let Some(deposit) = self.deposits_mut().get_mut(&position) {
            deposit.number_of_stakes += 1;
        }
        if settlement.reward > 0 {
            let balance_key = (key.reward_asset.clone(), settlement.owner.clone());
            let restored = self
                .reward_balance(&key.reward_asset, &settlement.owner)
                .saturating_sub(settlement.reward);
            if restored == 0 {
                self.rewards_mut().remove(&balance_key);
            } else {
                self.rewards_mut().insert(balance_key, restored);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{AssetId, PoolId};

    use super::*;

    const DAY: u64 = 86_400;

    fn key() -> IncentiveKey {
        IncentiveKey {
            creator: AccountId::new("0xcreator".to_string()),
            reward_asset: AssetId::new("0xreward".to_string()),
            pool: PoolId::new("0xpool".to_string()),
            start_time: Timestamp::new(1000),
            end_time: Timestamp::new(1000 + 30 * DAY),
            claim_deadline: Timestamp::new(1000 + 60 * DAY),
        }
    }

    fn info(liquidity: u128) -> PositionInfo {
        PositionInfo {
            pool: PoolId::new("0xpool".to_string()),
            tick_lower: -600,
            tick_upper: 600,
            liquidity,
        }
    }

    fn alice() -> AccountId {
        AccountId::new("0xalice".to_string())
    }

    fn engine_with_deposit() -> (AccrualEngine, PositionId) {
        let mut engine = AccrualEngine::new();
        engine.create_incentive(&key(), 3000).unwrap();
        let position = PositionId::new(1);
        engine.deposit_position(position, alice());
        (engine, position)
    }

    #[test]
    fn test_stake_records_snapshot_and_count() {
        let (mut engine, position) = engine_with_deposit();
        let snapshot = U256::from(9u8) << 128;

        engine
            .stake(
                position,
                &key(),
                &alice(),
                &info(500),
                snapshot,
                Timestamp::new(1000),
            )
            .unwrap();

        let stake = engine.stake_record(position, &key().id()).unwrap();
        assert_eq!(stake.liquidity, 500);
        assert_eq!(stake.seconds_per_liquidity_inside_initial_x128, snapshot);
        assert_eq!(engine.deposit(position).unwrap().number_of_stakes, 1);
    }

    #[test]
    fn test_stake_gates() {
        let (mut engine, position) = engine_with_deposit();

        // not the owner
        let bob = AccountId::new("0xbob".to_string());
        assert!(matches!(
            engine.stake(position, &key(), &bob, &info(1), U256::ZERO, Timestamp::new(1000)),
            Err(EngineError::NotDepositOwner { .. })
        ));

        // before start
        assert_eq!(
            engine.stake(position, &key(), &alice(), &info(1), U256::ZERO, Timestamp::new(999)),
            Err(EngineError::NotStarted)
        );

        // at end
        assert_eq!(
            engine.stake(
                position,
                &key(),
                &alice(),
                &info(1),
                U256::ZERO,
                key().end_time
            ),
            Err(EngineError::Ended)
        );

        // wrong pool
        let mut foreign = info(1);
        foreign.pool = PoolId::new("0xelsewhere".to_string());
        assert!(matches!(
            engine.stake(position, &key(), &alice(), &foreign, U256::ZERO, Timestamp::new(1000)),
            Err(EngineError::PoolMismatch { .. })
        ));

        // empty position
        assert_eq!(
            engine.stake(position, &key(), &alice(), &info(0), U256::ZERO, Timestamp::new(1000)),
            Err(EngineError::ZeroLiquidity(position))
        );
    }

    #[test]
    fn test_double_stake_rejected() {
        let (mut engine, position) = engine_with_deposit();
        engine
            .stake(position, &key(), &alice(), &info(1), U256::ZERO, Timestamp::new(1000))
            .unwrap();
        assert!(matches!(
            engine.stake(position, &key(), &alice(), &info(1), U256::ZERO, Timestamp::new(1001)),
            Err(EngineError::AlreadyStaked { .. })
        ));
    }

    #[test]
    fn test_unstake_settles_and_clears() {
        let (mut engine, position) = engine_with_deposit();
        let liquidity = 1000u128;
        engine
            .stake(
                position,
                &key(),
                &alice(),
                &info(liquidity),
                U256::ZERO,
                key().start_time,
            )
            .unwrap();

        // full window, this stake is the whole pool
        let accumulator = (U256::from(30 * DAY) << 128) / U256::from(liquidity);
        let settlement = engine
            .unstake(position, &key(), &alice(), accumulator, key().end_time)
            .unwrap();

        assert_eq!(settlement.reward, 3000);
        assert!(engine.stake_record(position, &key().id()).is_none());
        assert_eq!(engine.deposit(position).unwrap().number_of_stakes, 0);
        assert_eq!(
            engine.reward_balance(&key().reward_asset, &alice()),
            3000
        );
        let incentive = engine.incentive(&key().id()).unwrap();
        assert_eq!(incentive.total_reward_unclaimed, 0);
    }

    #[test]
    fn test_unstake_ownership_gate() {
        let (mut engine, position) = engine_with_deposit();
        engine
            .stake(position, &key(), &alice(), &info(10), U256::ZERO, key().start_time)
            .unwrap();

        let bob = AccountId::new("0xbob".to_string());
        assert!(matches!(
            engine.unstake(position, &key(), &bob, U256::from(1u8) << 128, key().end_time),
            Err(EngineError::NotDepositOwner { .. })
        ));
    }

    #[test]
    fn test_double_unstake_rejected() {
        let (mut engine, position) = engine_with_deposit();
        engine
            .stake(position, &key(), &alice(), &info(10), U256::ZERO, key().start_time)
            .unwrap();
        engine
            .unstake(position, &key(), &alice(), U256::from(1u8) << 100, key().end_time)
            .unwrap();
        assert!(matches!(
            engine.unstake(position, &key(), &alice(), U256::from(1u8) << 100, key().end_time),
            Err(EngineError::StakeNotFound { .. })
        ));
    }

    #[test]
    fn test_unstake_failure_leaves_state_untouched() {
        let (mut engine, position) = engine_with_deposit();
        engine
            .stake(
                position,
                &key(),
                &alice(),
                &info(10),
                U256::from(5u8) << 128,
                key().start_time,
            )
            .unwrap();

        // regressing accumulator: computation fails, nothing changed
        let result = engine.unstake(
            position,
            &key(),
            &alice(),
            U256::from(4u8) << 128,
            key().end_time,
        );
        assert!(matches!(result, Err(EngineError::Arithmetic(_))));
        assert!(engine.stake_record(position, &key().id()).is_some());
        assert_eq!(engine.deposit(position).unwrap().number_of_stakes, 1);
        assert_eq!(
            engine.incentive(&key().id()).unwrap().total_reward_unclaimed,
            3000
        );
    }

    #[test]
    fn test_withdraw_requires_zero_stakes() {
        let (mut engine, position) = engine_with_deposit();
        engine
            .stake(position, &key(), &alice(), &info(10), U256::ZERO, key().start_time)
            .unwrap();

        assert_eq!(
            engine.withdraw_position(position, &alice()),
            Err(EngineError::StakesActive { position, count: 1 })
        );

        engine
            .unstake(position, &key(), &alice(), U256::from(1u8) << 120, key().end_time)
            .unwrap();
        let removed = engine.withdraw_position(position, &alice()).unwrap();
        assert_eq!(removed.owner, alice());
        assert!(engine.deposit(position).is_none());
    }

    #[test]
    fn test_withdraw_ownership_gate() {
        let (mut engine, position) = engine_with_deposit();
        let bob = AccountId::new("0xbob".to_string());
        assert!(matches!(
            engine.withdraw_position(position, &bob),
            Err(EngineError::NotDepositOwner { .. })
        ));
    }

    #[test]
    fn test_redeposit_reinitializes_record() {
        let (mut engine, position) = engine_with_deposit();
        engine.withdraw_position(position, &alice()).unwrap();

        let bob = AccountId::new("0xbob".to_string());
        engine.deposit_position(position, bob.clone());
        let deposit = engine.deposit(position).unwrap();
        assert_eq!(deposit.owner, bob);
        assert_eq!(deposit.number_of_stakes, 0);
    }

    #[test]
    fn test_rollback_unstake_restores_everything() {
        let (mut engine, position) = engine_with_deposit();
        engine
            .stake(position, &key(), &alice(), &info(1000), U256::ZERO, key().start_time)
            .unwrap();

        let accumulator = (U256::from(30 * DAY) << 128) / U256::from(1000u64);
        let settlement = engine
            .unstake(position, &key(), &alice(), accumulator, key().end_time)
            .unwrap();
        let id = key().id();

        engine.rollback_unstake(position, &id, &key(), &settlement);

        assert!(engine.stake_record(position, &id).is_some());
        assert_eq!(engine.deposit(position).unwrap().number_of_stakes, 1);
        assert_eq!(engine.reward_balance(&key().reward_asset, &alice()), 0);
        assert_eq!(
            engine.incentive(&id).unwrap().total_reward_unclaimed,
            3000
        );
    }
}
