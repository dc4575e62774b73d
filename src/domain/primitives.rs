//! Domain primitives: AccountId, AssetId, PoolId, PositionId, Timestamp.

use serde::{Deserialize, Serialize};

/// Account address on the liquidity venue (hex string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    /// Create an AccountId from a string.
    pub fn new(account: String) -> Self {
        AccountId(account)
    }

    /// Get the account as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reward asset identity (token address or symbol).
///
/// An empty value is the "no asset" sentinel and is rejected at incentive
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    /// Create an AssetId from a string.
    pub fn new(asset: String) -> Self {
        AssetId(asset)
    }

    /// Get the asset as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the "no asset" sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Liquidity pool identity on the venue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolId(pub String);

impl PoolId {
    /// Create a PoolId from a string.
    pub fn new(pool: String) -> Self {
        PoolId(pool)
    }

    /// Get the pool as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position token identifier assigned by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl PositionId {
    /// Create a PositionId from a raw token id.
    pub fn new(id: u64) -> Self {
        PositionId(id)
    }

    /// Get the underlying token id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PositionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time in seconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a Timestamp from seconds.
    pub fn new(secs: u64) -> Self {
        Timestamp(secs)
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serde helper carrying u128 amounts as decimal strings.
///
/// JSON numbers cannot represent the full u128 range, so every amount on the
/// wire is a string.
pub mod amount {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>().map_err(serde::de::Error::custom)
    }
}
