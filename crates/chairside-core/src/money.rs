//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Splitting a RM64.00 bundle across RM50 + RM30 services:               │
//! │    64 × 50/80 = 40.0, 64 × 30/80 = 24.0  (fine here, not always)       │
//! │    RM10.00 / 3 = 3.333... → shares no longer sum to the bill           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    All math in cents, one rounding rule (half-up), and allocation      │
//! │    that hands the leftover cent to a known share                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use chairside_core::money::Money;
//! use chairside_core::types::Percent;
//!
//! let base = Money::from_cents(5000);   // RM50.00
//! let addon = Money::from_cents(3000);  // RM30.00
//! let original = base + addon;
//!
//! let discount = original.percentage(Percent::from_bps(1000)); // 10%
//! assert_eq!(discount.cents(), 800);
//! assert_eq!((original - discount).cents(), 7200);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Percent;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (sen for MYR, cents for USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction never panics; negatives are clamped where
///   the business rule forbids them (see [`Money::floor_zero`])
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Package.price ──► snapshot ──► originalPrice ──┬──► commission basis   │
/// │                                                 │                       │
/// │                   discount(s) ──────────────────┴──► finalPrice        │
/// │                                                         │               │
/// │                                                         ▼               │
/// │                                              revenue / per-service split│
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use chairside_core::money::Money;
    ///
    /// let price = Money::from_cents(4550); // RM45.50
    /// assert_eq!(price.cents(), 4550);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use chairside_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(50, 0).cents(), 5000);
    /// assert_eq!(Money::from_major_minor(12, 5).cents(), 1205);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    ///
    /// A final price can never go below zero, no matter how many discounts
    /// were stacked on it.
    #[inline]
    pub const fn floor_zero(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Computes `self × percent / 100`, rounded half-up to the cent.
    ///
    /// ## Rounding
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  HALF-UP ROUNDING (2 decimal places)                                │
    /// │                                                                     │
    /// │  RM33.35 × 10%  = RM3.335  → RM3.34                                │
    /// │  RM80.00 × 10%  = RM8.00   → RM8.00                                │
    /// │  RM45.00 × 40%  = RM18.00  → RM18.00 (commission)                  │
    /// │                                                                     │
    /// │  Integer form: (cents × bps + 5000) / 10000                        │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// Used for percentage discounts and for commissions. Amounts reaching this
    /// function are never negative, so truncating division after adding half
    /// the divisor is exactly half-up.
    ///
    /// ## Example
    /// ```rust
    /// use chairside_core::money::Money;
    /// use chairside_core::types::Percent;
    ///
    /// let amount = Money::from_cents(3335);
    /// assert_eq!(amount.percentage(Percent::from_bps(1000)).cents(), 334);
    /// ```
    pub fn percentage(&self, percent: Percent) -> Money {
        let cents = (self.0 as i128 * percent.bps() as i128 + 5000) / 10000;
        Money::from_cents(cents as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Splits this amount across `weights` proportionally.
    ///
    /// ## Algorithm
    /// Each share is `floor(amount × weight / Σweights)`. Whatever is left
    /// after flooring goes to the first share, so the shares always sum to
    /// exactly `self`. If every weight is zero the whole amount goes to the
    /// first share.
    ///
    /// ## Example
    /// ```rust
    /// use chairside_core::money::Money;
    ///
    /// // RM64 bundle, list prices RM50 + RM30
    /// let shares = Money::from_cents(6400)
    ///     .allocate(&[Money::from_cents(5000), Money::from_cents(3000)]);
    /// assert_eq!(shares, vec![Money::from_cents(4000), Money::from_cents(2400)]);
    /// ```
    pub fn allocate(&self, weights: &[Money]) -> Vec<Money> {
        if weights.is_empty() {
            return Vec::new();
        }

        let total_weight: i128 = weights.iter().map(|w| w.0.max(0) as i128).sum();
        if total_weight == 0 {
            let mut shares = vec![Money::zero(); weights.len()];
            shares[0] = *self;
            return shares;
        }

        let mut shares: Vec<Money> = weights
            .iter()
            .map(|w| Money((self.0 as i128 * w.0.max(0) as i128 / total_weight) as i64))
            .collect();

        let allocated: Money = shares.iter().copied().sum();
        shares[0] += *self - allocated;
        shares
    }

    /// Converts to major units as a float.
    ///
    /// ## Note
    /// For display and wire formats only. Never feed the result back into
    /// business math.
    #[inline]
    pub fn to_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation for logs and messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}RM{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(6400).to_string(), "RM64.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-RM5.50");
        assert_eq!(Money::zero().to_string(), "RM0.00");
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 33.35 × 10% = 3.335 → 3.34
        let amount = Money::from_cents(3335);
        assert_eq!(amount.percentage(Percent::from_bps(1000)).cents(), 334);

        // 33.34 × 10% = 3.334 → 3.33
        let amount = Money::from_cents(3334);
        assert_eq!(amount.percentage(Percent::from_bps(1000)).cents(), 333);
    }

    #[test]
    fn test_percentage_of_zero_and_full() {
        let amount = Money::from_cents(8000);
        assert_eq!(amount.percentage(Percent::zero()).cents(), 0);
        assert_eq!(amount.percentage(Percent::from_bps(10000)).cents(), 8000);
    }

    #[test]
    fn test_floor_zero() {
        assert_eq!(Money::from_cents(-1).floor_zero(), Money::zero());
        assert_eq!(Money::from_cents(1).floor_zero(), Money::from_cents(1));
    }

    #[test]
    fn test_allocate_proportional() {
        let shares = Money::from_cents(6400)
            .allocate(&[Money::from_cents(5000), Money::from_cents(3000)]);
        assert_eq!(shares, vec![Money::from_cents(4000), Money::from_cents(2400)]);
    }

    #[test]
    fn test_allocate_remainder_goes_to_first_share() {
        let shares = Money::from_cents(1000).allocate(&[
            Money::from_cents(100),
            Money::from_cents(100),
            Money::from_cents(100),
        ]);
        assert_eq!(shares.iter().copied().sum::<Money>(), Money::from_cents(1000));
        assert_eq!(shares[0].cents(), 334);
        assert_eq!(shares[1].cents(), 333);
        assert_eq!(shares[2].cents(), 333);
    }

    #[test]
    fn test_allocate_zero_weights() {
        let shares = Money::from_cents(500).allocate(&[Money::zero(), Money::zero()]);
        assert_eq!(shares, vec![Money::from_cents(500), Money::zero()]);
        assert!(Money::from_cents(500).allocate(&[]).is_empty());
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_cents(5000), Money::from_cents(3000)]
            .iter()
            .sum();
        assert_eq!(total.cents(), 8000);
    }
}
