//! Incentive registry operations: create and end.

use crate::domain::{Incentive, IncentiveId, IncentiveKey, Timestamp};

use super::{AccrualEngine, EngineError};

impl AccrualEngine {
    /// Register a new incentive funded with `total_reward`.
    ///
    /// The identity is derived from the key alone, so re-creating with
    /// identical parameters is rejected rather than silently merged.
    pub fn create_incentive(
        &mut self,
        key: &IncentiveKey,
        total_reward: u128,
    ) -> Result<IncentiveId, EngineError> {
        if !(key.claim_deadline >= key.end_time && key.end_time > key.start_time) {
            return Err(EngineError::InvalidWindow);
        }
        if key.reward_asset.is_sentinel() {
            return Err(EngineError::InvalidReward("reward asset must be set"));
        }
        if total_reward == 0 {
            return Err(EngineError::InvalidReward("total reward must be positive"));
        }

        let id = key.id();
        if self.incentive(&id).is_some() {
            return Err(EngineError::IncentiveExists(id));
        }

        self.incentives_mut()
            .insert(id.clone(), Incentive::new(total_reward));
        Ok(id)
    }

    /// Remove an incentive after its claim deadline.
    ///
    /// Returns the removed record; its `total_reward_unclaimed` is the
    /// refund owed to the creator.
    pub fn end_incentive(
        &mut self,
        key: &IncentiveKey,
        now: Timestamp,
    ) -> Result<(IncentiveId, Incentive), EngineError> {
        if now <= key.claim_deadline {
            return Err(EngineError::NotYetClaimable);
        }
        let id = key.id();
        let incentive = self
            .incentives_mut()
            .remove(&id)
            .ok_or_else(|| EngineError::IncentiveNotFound(id.clone()))?;
        Ok((id, incentive))
    }

    /// Undo helper for a failed external effect after `create_incentive`.
    pub(crate) fn forget_incentive(&mut self, id: &IncentiveId) {
        self.incentives_mut().remove(id);
    }

    /// Undo helper for a failed external effect after `end_incentive`.
    pub(crate) fn restore_incentive(&mut self, id: IncentiveId, incentive: Incentive) {
        self.incentives_mut().insert(id, incentive);
    }
}
