//! 18-decimal fixed-point arithmetic.
//!
//! A [`Wad`] stores a rational value scaled by `10^18`. All operations are
//! checked and use floor division, with a 256-bit intermediate so that
//! `amount × ratio` products cannot overflow before the rescale:
//!
//! ```text
//! a.mul(b)       = floor(a_raw * b_raw / 10^18)
//! a.div(b)       = floor(a_raw * 10^18 / b_raw)
//! w.mul_amount(x) = floor(x * w_raw / 10^18)
//! w.divide_amount(x) = floor(x * 10^18 / w_raw)
//! ```

use serde::{Deserialize, Serialize};

use crate::{Amount, Result, TypesError};

mod u256 {
    uint::construct_uint! {
        /// 256-bit intermediate for fixed-point multiply/divide.
        pub(super) struct U256(4);
    }
}
use u256::U256;

/// The fixed-point scale: `10^18`.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// An 18-decimal fixed-point value.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Wad(u128);

impl Wad {
    /// The value `0.0`.
    pub const ZERO: Wad = Wad(0);

    /// The value `1.0`.
    pub const ONE: Wad = Wad(WAD);

    /// Wrap a raw scaled value.
    pub fn from_raw(raw: u128) -> Self {
        Wad(raw)
    }

    /// Build from an integer value (`n * 10^18`).
    ///
    /// # Errors
    ///
    /// - [`TypesError::Overflow`] if the scaled value exceeds `u128::MAX`
    pub fn from_int(n: u64) -> Result<Self> {
        let raw = (n as u128).checked_mul(WAD).ok_or(TypesError::Overflow)?;
        Ok(Wad(raw))
    }

    /// Build from a percentage (`pct / 100`).
    pub fn from_percent(pct: u8) -> Self {
        Wad(pct as u128 * (WAD / 100))
    }

    /// Build from an integer ratio, floor-divided.
    ///
    /// # Errors
    ///
    /// - [`TypesError::DivisionByZero`] if `den` is zero
    pub fn from_ratio(num: u128, den: u128) -> Result<Self> {
        if den == 0 {
            return Err(TypesError::DivisionByZero);
        }
        let raw = mul_div(num, WAD, den)?;
        Ok(Wad(raw))
    }

    /// The raw scaled value.
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Whether the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    ///
    /// # Errors
    ///
    /// - [`TypesError::Overflow`] on overflow
    pub fn checked_add(self, other: Wad) -> Result<Wad> {
        self.0
            .checked_add(other.0)
            .map(Wad)
            .ok_or(TypesError::Overflow)
    }

    /// Checked subtraction.
    ///
    /// # Errors
    ///
    /// - [`TypesError::Overflow`] if `other > self`
    pub fn checked_sub(self, other: Wad) -> Result<Wad> {
        self.0
            .checked_sub(other.0)
            .map(Wad)
            .ok_or(TypesError::Overflow)
    }

    /// Fixed-point multiplication, floored.
    ///
    /// # Errors
    ///
    /// - [`TypesError::Overflow`] if the rescaled product exceeds `u128::MAX`
    pub fn mul(self, other: Wad) -> Result<Wad> {
        Ok(Wad(mul_div(self.0, other.0, WAD)?))
    }

    /// Fixed-point division, floored.
    ///
    /// # Errors
    ///
    /// - [`TypesError::DivisionByZero`] if `other` is zero
    /// - [`TypesError::Overflow`] if the quotient exceeds `u128::MAX`
    pub fn div(self, other: Wad) -> Result<Wad> {
        if other.0 == 0 {
            return Err(TypesError::DivisionByZero);
        }
        Ok(Wad(mul_div(self.0, WAD, other.0)?))
    }

    /// Scale an amount by this ratio: `floor(amount * self)`.
    ///
    /// # Errors
    ///
    /// - [`TypesError::Overflow`] if the result exceeds `u128::MAX`
    pub fn mul_amount(&self, amount: Amount) -> Result<Amount> {
        mul_div(amount, self.0, WAD)
    }

    /// Divide an amount by this ratio: `floor(amount / self)`.
    ///
    /// # Errors
    ///
    /// - [`TypesError::DivisionByZero`] if `self` is zero
    /// - [`TypesError::Overflow`] if the result exceeds `u128::MAX`
    pub fn divide_amount(&self, amount: Amount) -> Result<Amount> {
        if self.0 == 0 {
            return Err(TypesError::DivisionByZero);
        }
        mul_div(amount, WAD, self.0)
    }
}

/// `floor(a * b / den)` over a 256-bit intermediate.
///
/// # Errors
///
/// - [`TypesError::DivisionByZero`] if `den` is zero
/// - [`TypesError::Overflow`] if the result exceeds `u128::MAX`
pub fn mul_div(a: u128, b: u128, den: u128) -> Result<u128> {
    if den == 0 {
        return Err(TypesError::DivisionByZero);
    }
    let wide = U256::from(a) * U256::from(b) / U256::from(den);
    if wide > U256::from(u128::MAX) {
        return Err(TypesError::Overflow);
    }
    Ok(wide.as_u128())
}

/// `ceil(a * b / den)` over a 256-bit intermediate.
///
/// # Errors
///
/// - [`TypesError::DivisionByZero`] if `den` is zero
/// - [`TypesError::Overflow`] if the result exceeds `u128::MAX`
pub fn mul_div_ceil(a: u128, b: u128, den: u128) -> Result<u128> {
    if den == 0 {
        return Err(TypesError::DivisionByZero);
    }
    let den = U256::from(den);
    let wide = (U256::from(a) * U256::from(b) + den - U256::from(1u8)) / den;
    if wide > U256::from(u128::MAX) {
        return Err(TypesError::Overflow);
    }
    Ok(wide.as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_times_one() {
        let r = Wad::ONE.mul(Wad::ONE).expect("mul");
        assert_eq!(r, Wad::ONE);
    }

    #[test]
    fn test_from_ratio() {
        let half = Wad::from_ratio(1, 2).expect("ratio");
        assert_eq!(half.raw(), WAD / 2);
    }

    #[test]
    fn test_from_percent() {
        assert_eq!(Wad::from_percent(50).raw(), WAD / 2);
        assert_eq!(Wad::from_percent(100), Wad::ONE);
    }

    #[test]
    fn test_mul_amount_floors() {
        // 1/3 of 10 floors to 3
        let third = Wad::from_ratio(1, 3).expect("ratio");
        assert_eq!(third.mul_amount(10).expect("mul_amount"), 3);
    }

    #[test]
    fn test_divide_amount() {
        // 10 / 0.5 = 20
        let half = Wad::from_ratio(1, 2).expect("ratio");
        assert_eq!(half.divide_amount(10).expect("divide"), 20);
    }

    #[test]
    fn test_divide_amount_by_zero_rejected() {
        let err = Wad::ZERO.divide_amount(10).expect_err("zero divisor");
        assert_eq!(err, TypesError::DivisionByZero);
    }

    #[test]
    fn test_wide_intermediate_no_overflow() {
        // amount near u128 range times 1.0 survives the intermediate
        let big: Amount = u128::MAX / WAD * WAD;
        assert_eq!(Wad::ONE.mul_amount(big).expect("identity"), big);
    }

    #[test]
    fn test_mul_overflow_rejected() {
        let huge = Wad::from_raw(u128::MAX);
        assert_eq!(huge.mul(huge).expect_err("overflow"), TypesError::Overflow);
    }

    #[test]
    fn test_checked_sub_underflow_rejected() {
        let err = Wad::ZERO.checked_sub(Wad::ONE).expect_err("underflow");
        assert_eq!(err, TypesError::Overflow);
    }

    #[test]
    fn test_price_division_unit_conversion() {
        // backing value 5 at price 0.5 implies 10 token units
        let price = Wad::from_ratio(1, 2).expect("ratio");
        assert_eq!(price.divide_amount(5).expect("divide"), 10);
    }
}
