//! The transactional boundary around the accounting engine.
//!
//! Every public operation runs with the engine mutex held for its full
//! duration: operations are serialized, atomic transactions. Within one
//! operation the protocol is fixed: venue reads first, engine mutation
//! second, persistence third, value-moving collaborator calls last. A
//! failed transfer triggers explicit compensation restoring the prior
//! ledger entries, so no partial effect survives an abort.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::db::Repository;
use crate::domain::{
    AccountId, AssetId, Deposit, Incentive, IncentiveKey, LedgerEvent, PositionId,
};
use crate::engine::{AccrualEngine, EngineError};
use crate::orchestration::Clock;
use crate::venue::{AssetTransfer, PositionCustody, PositionOracle, VenueError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Venue(#[from] VenueError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("custody callback from untrusted caller {0}")]
    UntrustedCustodian(AccountId),
}

/// Owns the engine and coordinates it with the venue and the database.
pub struct StakingService {
    engine: Mutex<AccrualEngine>,
    repo: Arc<Repository>,
    oracle: Arc<dyn PositionOracle>,
    assets: Arc<dyn AssetTransfer>,
    custody: Arc<dyn PositionCustody>,
    clock: Arc<dyn Clock>,
    custodian: AccountId,
}

impl StakingService {
    /// Build a service, rebuilding the engine from the persisted ledgers.
    pub async fn load(
        repo: Arc<Repository>,
        oracle: Arc<dyn PositionOracle>,
        assets: Arc<dyn AssetTransfer>,
        custody: Arc<dyn PositionCustody>,
        clock: Arc<dyn Clock>,
        custodian: AccountId,
    ) -> Result<Self, ServiceError> {
        let (incentives, deposits, stakes, rewards) = futures::try_join!(
            repo.load_incentives(),
            repo.load_deposits(),
            repo.load_stakes(),
            repo.load_reward_balances(),
        )?;

        info!(
            incentives = incentives.len(),
            deposits = deposits.len(),
            stakes = stakes.len(),
            balances = rewards.len(),
            "engine state loaded"
        );

        Ok(StakingService {
            engine: Mutex::new(AccrualEngine::from_parts(
                incentives, deposits, stakes, rewards,
            )),
            repo,
            oracle,
            assets,
            custody,
            clock,
            custodian,
        })
    }

    // =========================================================================
    // Incentive lifecycle
    // =========================================================================

    /// Create and fund an incentive.
    pub async fn create_incentive(
        &self,
        key: IncentiveKey,
        total_reward: u128,
    ) -> Result<LedgerEvent, ServiceError> {
        let mut engine = self.engine.lock().await;
        let id = engine.create_incentive(&key, total_reward)?;

        if let Err(e) = self
            .repo
            .upsert_incentive(&id, &key, &Incentive::new(total_reward))
            .await
        {
            engine.forget_incentive(&id);
            return Err(e.into());
        }

        // Funding is pulled last; a refused pull unwinds the registration.
        if let Err(e) = self
            .assets
            .pull(&key.reward_asset, &key.creator, total_reward)
            .await
        {
            engine.forget_incentive(&id);
            if let Err(db) = self.repo.delete_incentive(&id).await {
                error!(incentive = %id, error = %db, "failed to unwind incentive row after rejected funding");
            }
            return Err(e.into());
        }

        info!(incentive = %id, creator = %key.creator, total_reward, "incentive created");
        Ok(LedgerEvent::IncentiveCreated {
            incentive_id: id,
            creator: key.creator,
            reward_asset: key.reward_asset,
            total_reward,
        })
    }

    /// End an incentive after its claim deadline, refunding the remainder.
    pub async fn end_incentive(&self, key: IncentiveKey) -> Result<LedgerEvent, ServiceError> {
        let mut engine = self.engine.lock().await;
        let now = self.clock.now();
        let (id, removed) = engine.end_incentive(&key, now)?;
        let refund = removed.total_reward_unclaimed;

        if let Err(e) = self.repo.delete_incentive(&id).await {
            engine.restore_incentive(id, removed);
            return Err(e.into());
        }

        if refund > 0 {
            if let Err(e) = self.assets.push(&key.reward_asset, &key.creator, refund).await {
                engine.restore_incentive(id.clone(), removed.clone());
                if let Err(db) = self.repo.upsert_incentive(&id, &key, &removed).await {
                    error!(incentive = %id, error = %db, "failed to restore incentive row after rejected refund");
                }
                return Err(e.into());
            }
        }

        info!(incentive = %id, refund, "incentive ended");
        Ok(LedgerEvent::IncentiveEnded {
            incentive_id: id,
            creator: key.creator,
            refund,
        })
    }

    // =========================================================================
    // Position custody
    // =========================================================================

    /// Handle the custody transfer-in callback from the venue.
    ///
    /// Only the configured custodian may invoke this. When the transfer
    /// payload carries an incentive key the stake is chained atomically: if
    /// it fails, the deposit is unwound and the whole callback errors.
    pub async fn deposit_position(
        &self,
        custodian: &AccountId,
        position: PositionId,
        from: AccountId,
        stake_in: Option<IncentiveKey>,
    ) -> Result<LedgerEvent, ServiceError> {
        if custodian != &self.custodian {
            warn!(caller = %custodian, "rejected custody callback");
            return Err(ServiceError::UntrustedCustodian(custodian.clone()));
        }

        let mut engine = self.engine.lock().await;
        let previous = engine.deposit(position).cloned();
        engine.deposit_position(position, from.clone());

        let record = Deposit::new(from.clone());
        if let Err(e) = self.repo.upsert_deposit(position, &record).await {
            Self::unwind_deposit(&mut engine, position, previous);
            return Err(e.into());
        }

        let mut staked_incentive = None;
        if let Some(key) = stake_in {
            match self.stake_locked(&mut engine, position, &key, &from).await {
                Ok(_) => staked_incentive = Some(key.id()),
                Err(e) => {
                    Self::unwind_deposit(&mut engine, position, previous.clone());
                    let restore = match &previous {
                        Some(prev) => self.repo.upsert_deposit(position, prev).await,
                        None => self.repo.delete_deposit(position).await,
                    };
                    if let Err(db) = restore {
                        error!(%position, error = %db, "failed to unwind deposit row after rejected chained stake");
                    }
                    return Err(e);
                }
            }
        }

        info!(%position, owner = %from, chained = staked_incentive.is_some(), "position deposited");
        Ok(LedgerEvent::PositionDeposited {
            position,
            owner: from,
            staked_incentive,
        })
    }

    fn unwind_deposit(
        engine: &mut MutexGuard<'_, AccrualEngine>,
        position: PositionId,
        previous: Option<Deposit>,
    ) {
        match previous {
            Some(prev) => engine.restore_deposit(position, prev),
            None => engine.forget_deposit(position),
        }
    }

    /// Withdraw a position with no active stakes, transferring custody out.
    pub async fn withdraw_position(
        &self,
        position: PositionId,
        caller: &AccountId,
        to: AccountId,
    ) -> Result<LedgerEvent, ServiceError> {
        let mut engine = self.engine.lock().await;
        let removed = engine.withdraw_position(position, caller)?;

        if let Err(e) = self.repo.delete_deposit(position).await {
            engine.restore_deposit(position, removed);
            return Err(e.into());
        }

        if let Err(e) = self.custody.transfer_position(position, &to).await {
            engine.restore_deposit(position, removed.clone());
            if let Err(db) = self.repo.upsert_deposit(position, &removed).await {
                error!(%position, error = %db, "failed to restore deposit row after rejected custody transfer");
            }
            return Err(e.into());
        }

        info!(%position, to = %to, "position withdrawn");
        Ok(LedgerEvent::PositionWithdrawn { position, to })
    }

    // =========================================================================
    // Staking
    // =========================================================================

    /// Stake a deposited position into an incentive.
    pub async fn stake(
        &self,
        position: PositionId,
        key: IncentiveKey,
        caller: &AccountId,
    ) -> Result<LedgerEvent, ServiceError> {
        let mut engine = self.engine.lock().await;
        self.stake_locked(&mut engine, position, &key, caller).await
    }

    /// Stake under an already-held engine lock; shared with the chained
    /// deposit-and-stake path.
    async fn stake_locked(
        &self,
        engine: &mut MutexGuard<'_, AccrualEngine>,
        position: PositionId,
        key: &IncentiveKey,
        caller: &AccountId,
    ) -> Result<LedgerEvent, ServiceError> {
        // Venue reads happen before any mutation.
        let info = self.oracle.resolve_position(position).await?;
        let accumulator = self
            .oracle
            .seconds_per_liquidity_inside_x128(&info.pool, info.tick_lower, info.tick_upper)
            .await?;
        let now = self.clock.now();

        let liquidity = engine.stake(position, key, caller, &info, accumulator, now)?;
        let id = key.id();

        let persisted = async {
            let stake = engine
                .stake_record(position, &id)
                .cloned()
                .ok_or(EngineError::StakeNotFound {
                    position,
                    incentive: id.clone(),
                })?;
            let deposit = engine
                .deposit(position)
                .cloned()
                .ok_or(EngineError::DepositNotFound(position))?;
            self.repo
                .persist_stake(position, &id, &stake, &deposit)
                .await?;
            Ok::<(), ServiceError>(())
        }
        .await;

        if let Err(e) = persisted {
            engine.rollback_stake(position, &id);
            return Err(e);
        }

        info!(%position, incentive = %id, liquidity, "position staked");
        Ok(LedgerEvent::PositionStaked {
            position,
            incentive_id: id,
            liquidity,
        })
    }

    /// Unstake a position, settling its share of the reward pool.
    pub async fn unstake(
        &self,
        position: PositionId,
        key: IncentiveKey,
        caller: &AccountId,
    ) -> Result<LedgerEvent, ServiceError> {
        let mut engine = self.engine.lock().await;

        // Re-resolve the position's range; an unresolvable position aborts
        // rather than guessing a pool.
        let info = self.oracle.resolve_position(position).await?;
        let accumulator = self
            .oracle
            .seconds_per_liquidity_inside_x128(&info.pool, info.tick_lower, info.tick_upper)
            .await?;
        let now = self.clock.now();

        let settlement = engine.unstake(position, &key, caller, accumulator, now)?;
        let id = key.id();

        let persisted = async {
            let incentive = engine
                .incentive(&id)
                .cloned()
                .ok_or_else(|| EngineError::IncentiveNotFound(id.clone()))?;
            let deposit = engine
                .deposit(position)
                .cloned()
                .ok_or(EngineError::DepositNotFound(position))?;
            let balance = (settlement.reward > 0)
                .then(|| engine.reward_balance(&key.reward_asset, &settlement.owner));
            self.repo
                .persist_unstake(
                    &id,
                    &key,
                    &incentive,
                    position,
                    &deposit,
                    &settlement.owner,
                    balance,
                )
                .await?;
            Ok::<(), ServiceError>(())
        }
        .await;

        if let Err(e) = persisted {
            engine.rollback_unstake(position, &id, &key, &settlement);
            return Err(e);
        }

        info!(
            %position,
            incentive = %id,
            owner = %settlement.owner,
            reward = settlement.reward,
            "position unstaked"
        );
        Ok(LedgerEvent::PositionUnstaked {
            position,
            incentive_id: id,
            owner: settlement.owner,
            reward: settlement.reward,
        })
    }

    // =========================================================================
    // Rewards
    // =========================================================================

    /// Pay out the accumulated balance for (asset, beneficiary) to `to`.
    pub async fn claim_reward(
        &self,
        asset: AssetId,
        beneficiary: AccountId,
        to: AccountId,
    ) -> Result<LedgerEvent, ServiceError> {
        let mut engine = self.engine.lock().await;
        let amount = engine.claim_reward(&asset, &beneficiary);

        if amount > 0 {
            if let Err(e) = self.repo.delete_reward_balance(&asset, &beneficiary).await {
                engine.restore_reward_balance(&asset, &beneficiary, amount);
                return Err(e.into());
            }

            if let Err(e) = self.assets.push(&asset, &to, amount).await {
                engine.restore_reward_balance(&asset, &beneficiary, amount);
                if let Err(db) = self
                    .repo
                    .upsert_reward_balance(&asset, &beneficiary, amount)
                    .await
                {
                    error!(%asset, owner = %beneficiary, error = %db, "failed to restore balance row after rejected payout");
                }
                return Err(e.into());
            }
        }

        info!(%asset, beneficiary = %beneficiary, to = %to, amount, "reward claimed");
        Ok(LedgerEvent::RewardClaimed {
            asset,
            beneficiary,
            to,
            amount,
        })
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Custody record for a position, if the engine holds it.
    pub async fn deposit_record(&self, position: PositionId) -> Option<Deposit> {
        self.engine.lock().await.deposit(position).cloned()
    }

    /// Claimable balance for (asset, owner).
    pub async fn reward_balance(&self, asset: &AssetId, owner: &AccountId) -> u128 {
        self.engine.lock().await.reward_balance(asset, owner)
    }

    /// Accounting state of an incentive, if it is live.
    pub async fn incentive_state(
        &self,
        key: &IncentiveKey,
    ) -> Option<Incentive> {
        self.engine.lock().await.incentive(&key.id()).cloned()
    }
}
