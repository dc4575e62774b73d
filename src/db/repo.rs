//! Repository layer mirroring the engine's four ledgers in SQLite.
//!
//! The in-memory engine is authoritative within a run; these tables exist so
//! a restarted process can rebuild it. Numeric columns hold decimal strings
//! because SQLite's numeric affinity is lossy for u128/U256 values.

use alloy_primitives::U256;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::collections::HashMap;
use std::str::FromStr;

use crate::domain::{
    AccountId, AssetId, Deposit, Incentive, IncentiveId, IncentiveKey, PoolId, PositionId, Stake,
    Timestamp,
};

/// A full incentive row, creation parameters included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncentiveRow {
    pub id: IncentiveId,
    pub key: IncentiveKey,
    pub incentive: Incentive,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

fn decode_u128(raw: &str, column: &'static str) -> Result<u128, sqlx::Error> {
    raw.parse::<u128>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn decode_u256(raw: &str, column: &'static str) -> Result<U256, sqlx::Error> {
    U256::from_str(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    // =========================================================================
    // Incentive operations
    // =========================================================================

    /// Insert or replace an incentive row.
    pub async fn upsert_incentive(
        &self,
        id: &IncentiveId,
        key: &IncentiveKey,
        incentive: &Incentive,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO incentives
            (id, creator, reward_asset, pool, start_time, end_time, claim_deadline,
             total_reward_unclaimed, total_seconds_claimed_x128)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(key.creator.as_str())
        .bind(key.reward_asset.as_str())
        .bind(key.pool.as_str())
        .bind(key.start_time.as_secs() as i64)
        .bind(key.end_time.as_secs() as i64)
        .bind(key.claim_deadline.as_secs() as i64)
        .bind(incentive.total_reward_unclaimed.to_string())
        .bind(incentive.total_seconds_claimed_x128.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete an incentive row.
    pub async fn delete_incentive(&self, id: &IncentiveId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM incentives WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Fetch one incentive row with its creation parameters.
    pub async fn get_incentive_row(
        &self,
        id: &IncentiveId,
    ) -> Result<Option<IncentiveRow>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, creator, reward_asset, pool, start_time, end_time, claim_deadline,
                   total_reward_unclaimed, total_seconds_claimed_x128
            FROM incentives
            WHERE id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let unclaimed: String = row.get("total_reward_unclaimed");
            let claimed: String = row.get("total_seconds_claimed_x128");
            Ok(IncentiveRow {
                id: IncentiveId::new(row.get::<String, _>("id")),
                key: IncentiveKey {
                    creator: AccountId::new(row.get::<String, _>("creator")),
                    reward_asset: AssetId::new(row.get::<String, _>("reward_asset")),
                    pool: PoolId::new(row.get::<String, _>("pool")),
                    start_time: Timestamp::new(row.get::<i64, _>("start_time") as u64),
                    end_time: Timestamp::new(row.get::<i64, _>("end_time") as u64),
                    claim_deadline: Timestamp::new(row.get::<i64, _>("claim_deadline") as u64),
                },
                incentive: Incentive {
                    total_reward_unclaimed: decode_u128(&unclaimed, "total_reward_unclaimed")?,
                    total_seconds_claimed_x128: decode_u256(
                        &claimed,
                        "total_seconds_claimed_x128",
                    )?,
                },
            })
        })
        .transpose()
    }

    /// Load every incentive's accounting state.
    pub async fn load_incentives(&self) -> Result<HashMap<IncentiveId, Incentive>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, total_reward_unclaimed, total_seconds_claimed_x128 FROM incentives",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let unclaimed: String = row.get("total_reward_unclaimed");
            let claimed: String = row.get("total_seconds_claimed_x128");
            out.insert(
                IncentiveId::new(row.get::<String, _>("id")),
                Incentive {
                    total_reward_unclaimed: decode_u128(&unclaimed, "total_reward_unclaimed")?,
                    total_seconds_claimed_x128: decode_u256(
                        &claimed,
                        "total_seconds_claimed_x128",
                    )?,
                },
            );
        }
        Ok(out)
    }

    // =========================================================================
    // Deposit operations
    // =========================================================================

    /// Insert or replace a deposit row.
    pub async fn upsert_deposit(
        &self,
        position: PositionId,
        deposit: &Deposit,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO deposits (position_id, owner, number_of_stakes)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(position.as_u64() as i64)
        .bind(deposit.owner.as_str())
        .bind(deposit.number_of_stakes as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a deposit row.
    pub async fn delete_deposit(&self, position: PositionId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM deposits WHERE position_id = ?")
            .bind(position.as_u64() as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Load every custody record.
    pub async fn load_deposits(&self) -> Result<HashMap<PositionId, Deposit>, sqlx::Error> {
        let rows = sqlx::query("SELECT position_id, owner, number_of_stakes FROM deposits")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    PositionId::new(row.get::<i64, _>("position_id") as u64),
                    Deposit {
                        owner: AccountId::new(row.get::<String, _>("owner")),
                        number_of_stakes: row.get::<i64, _>("number_of_stakes") as u32,
                    },
                )
            })
            .collect())
    }

    // =========================================================================
    // Stake operations
    // =========================================================================

    /// Insert or replace a stake row.
    pub async fn upsert_stake(
        &self,
        position: PositionId,
        incentive: &IncentiveId,
        stake: &Stake,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO stakes
            (position_id, incentive_id, seconds_per_liquidity_initial_x128, liquidity)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(position.as_u64() as i64)
        .bind(incentive.as_str())
        .bind(stake.seconds_per_liquidity_inside_initial_x128.to_string())
        .bind(stake.liquidity.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a stake row.
    pub async fn delete_stake(
        &self,
        position: PositionId,
        incentive: &IncentiveId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM stakes WHERE position_id = ? AND incentive_id = ?")
            .bind(position.as_u64() as i64)
            .bind(incentive.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Load every stake record.
    pub async fn load_stakes(
        &self,
    ) -> Result<HashMap<(PositionId, IncentiveId), Stake>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT position_id, incentive_id, seconds_per_liquidity_initial_x128, liquidity
            FROM stakes
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let snapshot: String = row.get("seconds_per_liquidity_initial_x128");
            let liquidity: String = row.get("liquidity");
            out.insert(
                (
                    PositionId::new(row.get::<i64, _>("position_id") as u64),
                    IncentiveId::new(row.get::<String, _>("incentive_id")),
                ),
                Stake {
                    seconds_per_liquidity_inside_initial_x128: decode_u256(
                        &snapshot,
                        "seconds_per_liquidity_initial_x128",
                    )?,
                    liquidity: decode_u128(&liquidity, "liquidity")?,
                },
            );
        }
        Ok(out)
    }

    // =========================================================================
    // Reward balance operations
    // =========================================================================

    /// Insert or replace a reward balance row.
    pub async fn upsert_reward_balance(
        &self,
        asset: &AssetId,
        owner: &AccountId,
        amount: u128,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO reward_balances (asset, owner, amount)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(asset.as_str())
        .bind(owner.as_str())
        .bind(amount.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a reward balance row (claimed down to zero).
    pub async fn delete_reward_balance(
        &self,
        asset: &AssetId,
        owner: &AccountId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM reward_balances WHERE asset = ? AND owner = ?")
            .bind(asset.as_str())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Load every claimable balance.
    pub async fn load_reward_balances(
        &self,
    ) -> Result<HashMap<(AssetId, AccountId), u128>, sqlx::Error> {
        let rows = sqlx::query("SELECT asset, owner, amount FROM reward_balances")
            .fetch_all(&self.pool)
            .await?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let amount: String = row.get("amount");
            out.insert(
                (
                    AssetId::new(row.get::<String, _>("asset")),
                    AccountId::new(row.get::<String, _>("owner")),
                ),
                decode_u128(&amount, "amount")?,
            );
        }
        Ok(out)
    }

    // =========================================================================
    // Transaction coordination (spans multiple ledgers)
    // =========================================================================

    /// Persist the stake row and the bumped deposit counter together.
    pub async fn persist_stake(
        &self,
        position: PositionId,
        incentive: &IncentiveId,
        stake: &Stake,
        deposit: &Deposit,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO stakes
            (position_id, incentive_id, seconds_per_liquidity_initial_x128, liquidity)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(position.as_u64() as i64)
        .bind(incentive.as_str())
        .bind(stake.seconds_per_liquidity_inside_initial_x128.to_string())
        .bind(stake.liquidity.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO deposits (position_id, owner, number_of_stakes)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(position.as_u64() as i64)
        .bind(deposit.owner.as_str())
        .bind(deposit.number_of_stakes as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Persist every row an unstake touched in a single transaction.
    ///
    /// If any write fails the transaction rolls back, so the mirror never
    /// holds a half-applied unstake.
    #[allow(clippy::too_many_arguments)]
    pub async fn persist_unstake(
        &self,
        id: &IncentiveId,
        key: &IncentiveKey,
        incentive: &Incentive,
        position: PositionId,
        deposit: &Deposit,
        owner: &AccountId,
        new_balance: Option<u128>,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO incentives
            (id, creator, reward_asset, pool, start_time, end_time, claim_deadline,
             total_reward_unclaimed, total_seconds_claimed_x128)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(key.creator.as_str())
        .bind(key.reward_asset.as_str())
        .bind(key.pool.as_str())
        .bind(key.start_time.as_secs() as i64)
        .bind(key.end_time.as_secs() as i64)
        .bind(key.claim_deadline.as_secs() as i64)
        .bind(incentive.total_reward_unclaimed.to_string())
        .bind(incentive.total_seconds_claimed_x128.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM stakes WHERE position_id = ? AND incentive_id = ?")
            .bind(position.as_u64() as i64)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO deposits (position_id, owner, number_of_stakes)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(position.as_u64() as i64)
        .bind(deposit.owner.as_str())
        .bind(deposit.number_of_stakes as i64)
        .execute(&mut *tx)
        .await?;

        if let Some(balance) = new_balance {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO reward_balances (asset, owner, amount)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(key.reward_asset.as_str())
            .bind(owner.as_str())
            .bind(balance.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
