//! Incentive programs and their deterministic identity.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, AssetId, PoolId, Timestamp};

/// Deterministic incentive identity: hex-encoded SHA-256 over a canonical
/// encoding of the creation parameters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IncentiveId(pub String);

impl IncentiveId {
    /// Wrap an already-derived identity.
    pub fn new(id: String) -> Self {
        IncentiveId(id)
    }

    /// Get the identity as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IncentiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The full parameter tuple an incentive is created from.
///
/// The identity is derivable only from these six values; there is no
/// incrementing counter, so creating twice with identical parameters
/// collides deterministically and is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncentiveKey {
    pub creator: AccountId,
    pub reward_asset: AssetId,
    pub pool: PoolId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub claim_deadline: Timestamp,
}

impl IncentiveKey {
    /// Derive the incentive identity for this key.
    ///
    /// Variable-length fields are length-prefixed so distinct tuples can
    /// never produce the same byte stream; the combination is
    /// order-sensitive by construction.
    pub fn id(&self) -> IncentiveId {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, self.creator.as_str());
        hash_var(&mut hasher, self.reward_asset.as_str());
        hash_var(&mut hasher, self.pool.as_str());
        hasher.update(self.start_time.as_secs().to_le_bytes());
        hasher.update(self.end_time.as_secs().to_le_bytes());
        hasher.update(self.claim_deadline.as_secs().to_le_bytes());

        IncentiveId(hex::encode(hasher.finalize()))
    }
}

/// Mutable accounting state of a live incentive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incentive {
    /// Reward units not yet attributed to any staker. Monotonically
    /// decreasing; whatever remains at `endIncentive` returns to the
    /// creator.
    #[serde(with = "crate::domain::primitives::amount")]
    pub total_reward_unclaimed: u128,

    /// Liquidity-seconds already attributed, X128 fixed point.
    /// Monotonically non-decreasing.
    pub total_seconds_claimed_x128: U256,
}

impl Incentive {
    /// Fresh incentive state funded with `total_reward`.
    pub fn new(total_reward: u128) -> Self {
        Incentive {
            total_reward_unclaimed: total_reward,
            total_seconds_claimed_x128: U256::ZERO,
        }
    }
}
