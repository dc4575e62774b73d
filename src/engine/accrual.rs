//! Reward accrual: the computation performed at unstake time.
//!
//! Converts two accumulator snapshots and the liquidity committed at stake
//! time into the reward owed for the covered period, by dividing the
//! remaining reward pool over the remaining seconds budget. Each unstake
//! floors its payout, so the pool can never be overdrawn; the truncation
//! residue stays in the incentive until the creator sweeps it.

use alloy_primitives::U256;

use crate::domain::math::{self, ArithmeticError};
use crate::domain::Timestamp;

/// Output of one accrual computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardSettlement {
    /// Reward units owed to this stake, floored.
    pub reward: u128,
    /// In-range liquidity-seconds this stake contributed, X128.
    pub seconds_inside_x128: U256,
}

/// Compute the reward owed to one stake, lazily, from state alone.
///
/// No iteration over other participants and no stored total-liquidity
/// ledger: the remaining seconds budget is derived from the incentive
/// window and the seconds already claimed by earlier unstakes.
///
/// For any legitimate call sequence `seconds_inside <= total unclaimed
/// seconds` and therefore `reward <= total_reward_unclaimed`; when an
/// inconsistent oracle breaks that, the checked arithmetic surfaces it
/// instead of wrapping.
#[allow(clippy::too_many_arguments)]
pub fn compute_reward(
    total_reward_unclaimed: u128,
    total_seconds_claimed_x128: U256,
    start_time: Timestamp,
    end_time: Timestamp,
    liquidity: u128,
    seconds_per_liquidity_inside_initial_x128: U256,
    seconds_per_liquidity_inside_x128: U256,
    now: Timestamp,
) -> Result<RewardSettlement, ArithmeticError> {
    // Seconds contributed by this stake: accumulator delta times committed
    // liquidity. A regressing accumulator is an oracle fault, not a wrap.
    let delta = math::checked_sub(
        seconds_per_liquidity_inside_x128,
        seconds_per_liquidity_inside_initial_x128,
        "seconds-per-liquidity delta",
    )?;
    let seconds_inside_x128 = math::checked_mul(delta, U256::from(liquidity), "seconds inside")?;

    // Remaining seconds budget for the whole incentive. The window is
    // clamped so it never shrinks once `now` passes `end_time`.
    let effective_end = end_time.max(now);
    let duration = effective_end
        .as_secs()
        .checked_sub(start_time.as_secs())
        .ok_or(ArithmeticError::Underflow("incentive duration"))?;
    let total_seconds_unclaimed_x128 = math::checked_sub(
        math::seconds_to_x128(duration),
        total_seconds_claimed_x128,
        "total seconds unclaimed",
    )?;

    // reward = floor(unclaimed * secondsInside / secondsUnclaimed), with a
    // 512-bit intermediate. A zero budget means everything has already been
    // claimed through `now`; an explicit error, never a bogus rate.
    let reward_wide = math::mul_div_floor(
        U256::from(total_reward_unclaimed),
        seconds_inside_x128,
        total_seconds_unclaimed_x128,
        "reward",
    )?;
    let reward = u128::try_from(reward_wide).map_err(|_| ArithmeticError::Overflow("reward"))?;

    Ok(RewardSettlement {
        reward,
        seconds_inside_x128,
    })
}
