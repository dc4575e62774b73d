//! Position custody records.

use serde::{Deserialize, Serialize};

use crate::domain::AccountId;

/// Custody metadata for a position held by the engine.
///
/// The owner is whoever transferred the position in, not necessarily the
/// address that originally minted it. A position can only be withdrawn once
/// every stake against it has been unwound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    /// The depositing account; fixed for the lifetime of the record.
    pub owner: AccountId,
    /// Number of incentives this position is currently staked in.
    pub number_of_stakes: u32,
}

impl Deposit {
    /// Fresh custody record with no active stakes.
    pub fn new(owner: AccountId) -> Self {
        Deposit {
            owner,
            number_of_stakes: 0,
        }
    }
}
