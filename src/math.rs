//! Integer arithmetic for pool shares
//!
//! Token amounts stay as `U256` end to end. Products are widened to 512 bits
//! before dividing so no intermediate can overflow; only a final quotient that
//! does not fit back into 256 bits is an error. Floating point appears only in
//! [`to_decimal`], after the integer pipeline is done.

use alloy::primitives::{U256, U512};

/// Fixed-point scale of a share (10^18 == 100%)
pub const SHARE_SCALE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ArithmeticError {
    #[error("result does not fit in 256 bits")]
    Overflow,
}

fn widen(value: U256) -> U512 {
    U512::from_limbs_slice(value.as_limbs())
}

fn narrow(value: U512) -> Result<U256, ArithmeticError> {
    U256::checked_from_limbs_slice(value.as_limbs()).ok_or(ArithmeticError::Overflow)
}

/// Division that yields zero for a zero divisor; truncates toward zero.
pub fn div_or_zero(numerator: U256, divisor: U256) -> U256 {
    if divisor.is_zero() {
        U256::ZERO
    } else {
        numerator / divisor
    }
}

/// `(a * b) / divisor` without intermediate overflow.
///
/// A zero divisor yields zero.
pub fn mul_div(a: U256, b: U256, divisor: U256) -> Result<U256, ArithmeticError> {
    if divisor.is_zero() {
        return Ok(U256::ZERO);
    }
    narrow(widen(a) * widen(b) / widen(divisor))
}

/// Holder's share of the pool as a [`SHARE_SCALE`] fixed-point fraction.
pub fn pool_share(lp_balance: U256, total_supply: U256) -> Result<U256, ArithmeticError> {
    if lp_balance.is_zero() {
        return Ok(U256::ZERO);
    }
    mul_div(lp_balance, SHARE_SCALE, total_supply)
}

/// The holder's amount of one reserve for a given fixed-point share.
pub fn reserve_portion(reserve: U256, share: U256) -> Result<U256, ArithmeticError> {
    mul_div(reserve, share, SHARE_SCALE)
}

/// Format a raw integer amount with `decimals` fractional digits
///
/// Trailing zeros of the fractional part are dropped.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Human-readable value of a raw amount, for USD multiplication.
pub fn to_decimal(value: U256, decimals: u8) -> f64 {
    // format_units always yields a valid decimal literal
    format_units(value, decimals).parse().unwrap_or(0.0)
}
