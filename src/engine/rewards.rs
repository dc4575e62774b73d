//! Claimable reward balances.

use crate::domain::{AccountId, AssetId};

use super::AccrualEngine;

impl AccrualEngine {
    /// Read and zero the claimable balance for (asset, beneficiary).
    ///
    /// Idempotent: claiming an empty balance yields zero, not an error.
    pub fn claim_reward(&mut self, asset: &AssetId, beneficiary: &AccountId) -> u128 {
        self.rewards_mut()
            .remove(&(asset.clone(), beneficiary.clone()))
            .unwrap_or(0)
    }

    /// Undo helper: reinstate a balance after a failed payout.
    pub(crate) fn restore_reward_balance(
        &mut self,
        asset: &AssetId,
        beneficiary: &AccountId,
        amount: u128,
    ) {
        if amount > 0 {
            self.rewards_mut()
                .insert((asset.clone(), beneficiary.clone()), amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> AssetId {
        AssetId::new("0xreward".to_string())
    }

    fn alice() -> AccountId {
        AccountId::new("0xalice".to_string())
    }

    #[test]
    fn test_claim_zeroes_balance() {
        let mut engine = AccrualEngine::new();
        engine.restore_reward_balance(&asset(), &alice(), 250);

        assert_eq!(engine.claim_reward(&asset(), &alice()), 250);
        assert_eq!(engine.reward_balance(&asset(), &alice()), 0);
    }

    #[test]
    fn test_claim_is_idempotent() {
        let mut engine = AccrualEngine::new();
        engine.restore_reward_balance(&asset(), &alice(), 250);

        assert_eq!(engine.claim_reward(&asset(), &alice()), 250);
        assert_eq!(engine.claim_reward(&asset(), &alice()), 0);
    }

    #[test]
    fn test_balances_are_keyed_per_asset_and_owner() {
        let mut engine = AccrualEngine::new();
        let other_asset = AssetId::new("0xother".to_string());
        let bob = AccountId::new("0xbob".to_string());

        engine.restore_reward_balance(&asset(), &alice(), 10);
        engine.restore_reward_balance(&other_asset, &alice(), 20);
        engine.restore_reward_balance(&asset(), &bob, 30);

        assert_eq!(engine.claim_reward(&asset(), &alice()), 10);
        assert_eq!(engine.reward_balance(&other_asset, &alice()), 20);
        assert_eq!(engine.reward_balance(&asset(), &bob), 30);
    }
}
