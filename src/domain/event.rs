//! Structured notifications emitted by every public operation.
//!
//! Events mirror the operation's inputs and outcome for external observers;
//! they are not load-bearing for correctness.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{AccountId, AssetId, IncentiveId, PositionId};

/// One notification per committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LedgerEvent {
    #[serde(rename_all = "camelCase")]
    IncentiveCreated {
        incentive_id: IncentiveId,
        creator: AccountId,
        reward_asset: AssetId,
        #[serde(with = "crate::domain::primitives::amount")]
        total_reward: u128,
    },
    #[serde(rename_all = "camelCase")]
    IncentiveEnded {
        incentive_id: IncentiveId,
        creator: AccountId,
        #[serde(with = "crate::domain::primitives::amount")]
        refund: u128,
    },
    #[serde(rename_all = "camelCase")]
    PositionDeposited {
        position: PositionId,
        owner: AccountId,
        /// Set when the transfer-in payload chained into a stake.
        #[serde(skip_serializing_if = "Option::is_none")]
        staked_incentive: Option<IncentiveId>,
    },
    #[serde(rename_all = "camelCase")]
    PositionStaked {
        position: PositionId,
        incentive_id: IncentiveId,
        #[serde(with = "crate::domain::primitives::amount")]
        liquidity: u128,
    },
    #[serde(rename_all = "camelCase")]
    PositionUnstaked {
        position: PositionId,
        incentive_id: IncentiveId,
        owner: AccountId,
        #[serde(with = "crate::domain::primitives::amount")]
        reward: u128,
    },
    #[serde(rename_all = "camelCase")]
    PositionWithdrawn {
        position: PositionId,
        to: AccountId,
    },
    #[serde(rename_all = "camelCase")]
    RewardClaimed {
        asset: AssetId,
        beneficiary: AccountId,
        to: AccountId,
        #[serde(with = "crate::domain::primitives::amount")]
        amount: u128,
    },
}

/// Delivery wrapper for an event: a unique id and the observation time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub observed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

impl EventEnvelope {
    pub fn new(event: LedgerEvent) -> Self {
        EventEnvelope {
            event_id: Uuid::new_v4(),
            observed_at: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = LedgerEvent::PositionStaked {
            position: PositionId::new(7),
            incentive_id: IncentiveId::new("abc".to_string()),
            liquidity: 1000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "positionStaked");
        assert_eq!(json["position"], 7);
        assert_eq!(json["liquidity"], "1000");
    }

    #[test]
    fn test_envelope_flattens_event() {
        let envelope = EventEnvelope::new(LedgerEvent::PositionWithdrawn {
            position: PositionId::new(3),
            to: AccountId::new("0xbob".to_string()),
        });
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "positionWithdrawn");
        assert!(json["eventId"].is_string());
        assert!(json["observedAt"].is_string());
    }
}
