//! The incentive accounting engine.
//!
//! One `AccrualEngine` value owns the four keyed ledgers (incentives,
//! deposits, stakes, reward balances) and every state transition over them.
//! The engine is synchronous and does no I/O: oracle samples and the current
//! time are passed in by the transactional layer, which makes every rule
//! testable in isolation. Methods validate all preconditions and complete
//! every fallible computation before the first mutation, so an error leaves
//! the ledgers untouched.

pub mod accrual;
mod incentives;
mod rewards;
mod staking;

pub use accrual::{compute_reward, RewardSettlement};
pub use staking::UnstakeSettlement;

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::{
    AccountId, ArithmeticError, AssetId, Deposit, Incentive, IncentiveId, PoolId, PositionId,
    Stake,
};

/// Errors raised by engine state transitions.
///
/// Grouped per the accounting taxonomy: validation, state conflict,
/// authorization, temporal, arithmetic. Every error aborts the whole
/// operation with no partial state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    // -- validation -----------------------------------------------------
    #[error("invalid incentive window: need claim_deadline >= end_time > start_time")]
    InvalidWindow,
    #[error("invalid reward: {0}")]
    InvalidReward(&'static str),

    // -- state conflicts ------------------------------------------------
    #[error("incentive {0} already exists")]
    IncentiveExists(IncentiveId),
    #[error("incentive {0} does not exist")]
    IncentiveNotFound(IncentiveId),
    #[error("no deposit record for position {0}")]
    DepositNotFound(PositionId),
    #[error("position {position} is already staked in incentive {incentive}")]
    AlreadyStaked {
        position: PositionId,
        incentive: IncentiveId,
    },
    #[error("position {position} is not staked in incentive {incentive}")]
    StakeNotFound {
        position: PositionId,
        incentive: IncentiveId,
    },
    #[error("position {position} still has {count} active stakes")]
    StakesActive { position: PositionId, count: u32 },
    #[error("position {position} is in pool {actual}, incentive targets pool {expected}")]
    PoolMismatch {
        position: PositionId,
        expected: PoolId,
        actual: PoolId,
    },
    #[error("position {0} has zero liquidity")]
    ZeroLiquidity(PositionId),

    // -- authorization --------------------------------------------------
    #[error("caller {caller} does not own the deposit for position {position}")]
    NotDepositOwner {
        position: PositionId,
        caller: AccountId,
    },

    // -- temporal -------------------------------------------------------
    #[error("incentive has not started yet")]
    NotStarted,
    #[error("incentive has already ended")]
    Ended,
    #[error("claim deadline has not passed yet")]
    NotYetClaimable,

    // -- arithmetic -----------------------------------------------------
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
    #[error("reward balance overflow for asset {asset}, owner {owner}")]
    BalanceOverflow { asset: AssetId, owner: AccountId },
}

/// The four ledgers, exclusively owned. All cross-entity references are by
/// key, never by pointer, so entries are created and destroyed
/// independently.
#[derive(Debug, Default)]
pub struct AccrualEngine {
    incentives: HashMap<IncentiveId, Incentive>,
    deposits: HashMap<PositionId, Deposit>,
    stakes: HashMap<(PositionId, IncentiveId), Stake>,
    rewards: HashMap<(AssetId, AccountId), u128>,
}

impl AccrualEngine {
    /// Empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an engine from persisted ledgers.
    pub fn from_parts(
        incentives: HashMap<IncentiveId, Incentive>,
        deposits: HashMap<PositionId, Deposit>,
        stakes: HashMap<(PositionId, IncentiveId), Stake>,
        rewards: HashMap<(AssetId, AccountId), u128>,
    ) -> Self {
        AccrualEngine {
            incentives,
            deposits,
            stakes,
            rewards,
        }
    }

    /// Look up an incentive's accounting state.
    pub fn incentive(&self, id: &IncentiveId) -> Option<&Incentive> {
        self.incentives.get(id)
    }

    /// Look up a position's custody record.
    pub fn deposit(&self, position: PositionId) -> Option<&Deposit> {
        self.deposits.get(&position)
    }

    /// Look up a stake record.
    pub fn stake_record(&self, position: PositionId, incentive: &IncentiveId) -> Option<&Stake> {
        self.stakes.get(&(position, incentive.clone()))
    }

    /// Claimable balance for (asset, owner); zero when absent.
    pub fn reward_balance(&self, asset: &AssetId, owner: &AccountId) -> u128 {
        self.rewards
            .get(&(asset.clone(), owner.clone()))
            .copied()
            .unwrap_or(0)
    }

    // Internal map accessors shared by the operation modules.

    pub(crate) fn incentives_mut(&mut self) -> &mut HashMap<IncentiveId, Incentive> {
        &mut self.incentives
    }

    pub(crate) fn deposits_mut(&mut self) -> &mut HashMap<PositionId, Deposit> {
        &mut self.deposits
    }

    pub(crate) fn stakes_mut(&mut self) -> &mut HashMap<(PositionId, IncentiveId), Stake> {
        &mut self.stakes
    }

    pub(crate) fn rewards_mut(&mut self) -> &mut HashMap<(AssetId, AccountId), u128> {
        &mut self.rewards
    }

    /// Deposit lookup that also enforces the ownership gate.
    pub(crate) fn owned_deposit(
        &self,
        position: PositionId,
        caller: &AccountId,
    ) -> Result<&Deposit, EngineError> {
        let deposit = self
            .deposits
            .get(&position)
            .ok_or(EngineError::DepositNotFound(position))?;
        if &deposit.owner != caller {
            return Err(EngineError::NotDepositOwner {
                position,
                caller: caller.clone(),
            });
        }
        Ok(deposit)
    }
}
