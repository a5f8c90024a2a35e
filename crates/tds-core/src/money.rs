//! # Money Module
//!
//! Provides the `Money` type for committed amounts and withholding.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Withholding is summed across campaigns and fiscal years:              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ drifts on every sum              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    ₹35,000.00 = 3_500_000 paise                                        │
//! │    1% of it   =    35_000 paise = ₹350.00 exactly                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tds_core::money::Money;
//! use tds_core::rate::TdsRate;
//!
//! let tca = Money::from_rupees(35_000);
//! let tds = tca.withholding(TdsRate::SoleProprietorship);
//! assert_eq!(tds, Money::from_rupees(350));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::rate::TdsRate;

/// Paise per rupee.
const PAISE_PER_RUPEE: i64 = 100;

/// A monetary value in paise (1/100 of a rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences between totals may be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as a plain integer** of paise on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    ///
    /// ## Example
    /// ```rust
    /// use tds_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees(30_000).paise(), 3_000_000);
    /// ```
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * PAISE_PER_RUPEE)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / PAISE_PER_RUPEE
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % PAISE_PER_RUPEE).abs()
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

    /// Checked addition. `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Checked subtraction. `None` on overflow.
    #[inline]
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Calculates the amount withheld at the given rate.
    ///
    /// ## Implementation
    /// Integer math on paise: `(amount * percent + 50) / 100`.
    /// The +50 rounds half a paisa up; whole-rupee amounts are exact.
    ///
    /// ## Example
    /// ```rust
    /// use tds_core::money::Money;
    /// use tds_core::rate::TdsRate;
    ///
    /// let peak = Money::from_rupees(105_000);
    /// assert_eq!(peak.withholding(TdsRate::SoleProprietorship), Money::from_rupees(1_050));
    /// assert_eq!(peak.withholding(TdsRate::NoPan), Money::from_rupees(21_000));
    /// ```
    pub fn withholding(&self, rate: TdsRate) -> Money {
        // i128 prevents overflow on large amounts
        let paise = (self.0 as i128 * rate.percent() as i128 + 50) / 100;
        Money(paise as i64)
    }

    /// Returns `self` as a percentage of `whole` (display only).
    pub fn percentage_of(&self, whole: Money) -> f64 {
        if whole.is_zero() {
            return 0.0;
        }
        let pct = self.0 as f64 * 100.0 / whole.0 as f64;
        (pct * 100.0).round() / 100.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `₹1050.00`. Use frontend formatting for lakh grouping.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
