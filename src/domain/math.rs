//! Checked X128 fixed-point arithmetic over U256.
//!
//! The accumulator values this engine meters are scaled by 2^128 and can
//! exceed native integer width, so every operation here goes through U256
//! with explicit failure instead of wrapping. The reward division uses a
//! 512-bit intermediate; dividing the scale out before the multiply chain
//! completes would destroy precision.

use alloy_primitives::{U256, U512};
use thiserror::Error;

/// 2^128, the fixed-point scale for accumulator values.
pub const SCALE_X128: U256 = U256::from_limbs([0, 0, 1, 0]);

/// Arithmetic failure in the accounting math.
///
/// Each variant names the computation that failed; none of these are
/// recoverable mid-operation, the whole transaction aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("arithmetic underflow computing {0}")]
    Underflow(&'static str),
    #[error("arithmetic overflow computing {0}")]
    Overflow(&'static str),
    #[error("division by zero computing {0}")]
    DivisionByZero(&'static str),
}

/// Widen a seconds count to X128 fixed point.
pub fn seconds_to_x128(seconds: u64) -> U256 {
    U256::from(seconds) << 128
}

/// a + b, failing loudly on overflow.
pub fn checked_add(a: U256, b: U256, what: &'static str) -> Result<U256, ArithmeticError> {
    a.checked_add(b).ok_or(ArithmeticError::Overflow(what))
}

/// a - b, failing loudly if the result would be negative.
pub fn checked_sub(a: U256, b: U256, what: &'static str) -> Result<U256, ArithmeticError> {
    a.checked_sub(b).ok_or(ArithmeticError::Underflow(what))
}

/// a * b, failing loudly on overflow.
pub fn checked_mul(a: U256, b: U256, what: &'static str) -> Result<U256, ArithmeticError> {
    a.checked_mul(b).ok_or(ArithmeticError::Overflow(what))
}

fn widen(value: U256) -> U512 {
    let limbs = value.as_limbs();
    U512::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3], 0, 0, 0, 0])
}

/// floor(a * b / denominator) with a 512-bit intermediate.
///
/// The product of two U256 values needs up to 512 bits; doing the multiply
/// in native width first would overflow or truncate.
pub fn mul_div_floor(
    a: U256,
    b: U256,
    denominator: U256,
    what: &'static str,
) -> Result<U256, ArithmeticError> {
    if denominator.is_zero() {
        return Err(ArithmeticError::DivisionByZero(what));
    }
    let quotient = widen(a) * widen(b) / widen(denominator);

    let limbs = quotient.as_limbs();
    if limbs[4..].iter().any(|&limb| limb != 0) {
        return Err(ArithmeticError::Overflow(what));
    }
    Ok(U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_is_two_pow_128() {
        assert_eq!(SCALE_X128, U256::from(1u8) << 128);
    }

    #[test]
    fn test_seconds_to_x128() {
        assert_eq!(seconds_to_x128(0), U256::ZERO);
        assert_eq!(seconds_to_x128(3), U256::from(3u8) << 128);
    }

    #[test]
    fn test_checked_sub_underflow() {
        let result = checked_sub(U256::from(1u8), U256::from(2u8), "delta");
        assert_eq!(result, Err(ArithmeticError::Underflow("delta")));
    }

    #[test]
    fn test_checked_mul_overflow() {
        let result = checked_mul(U256::MAX, U256::from(2u8), "product");
        assert_eq!(result, Err(ArithmeticError::Overflow("product")));
    }

    #[test]
    fn test_mul_div_floor_exact() {
        let result = mul_div_floor(
            U256::from(3000u64),
            U256::from(10u8),
            U256::from(25u8),
            "reward",
        )
        .unwrap();
        assert_eq!(result, U256::from(1200u64));
    }

    #[test]
    fn test_mul_div_floor_truncates() {
        let result =
            mul_div_floor(U256::from(10u8), U256::from(10u8), U256::from(3u8), "reward").unwrap();
        // 100 / 3 = 33.33..., floored
        assert_eq!(result, U256::from(33u8));
    }

    #[test]
    fn test_mul_div_floor_wide_intermediate() {
        // (2^200) * (2^200) / (2^200) needs the 512-bit intermediate
        let big = U256::from(1u8) << 200;
        let result = mul_div_floor(big, big, big, "reward").unwrap();
        assert_eq!(result, big);
    }

    #[test]
    fn test_mul_div_floor_zero_denominator() {
        let result = mul_div_floor(U256::from(1u8), U256::from(1u8), U256::ZERO, "rate");
        assert_eq!(result, Err(ArithmeticError::DivisionByZero("rate")));
    }

    #[test]
    fn test_mul_div_floor_result_too_wide() {
        let result = mul_div_floor(U256::MAX, U256::MAX, U256::from(1u8), "reward");
        assert_eq!(result, Err(ArithmeticError::Overflow("reward")));
    }
}
