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
//! │  Over thousands of sale lines the drift compounds, and the recorded    │
//! │  gross profit stops matching subtotal − cost.                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Centavos                                         │
//! │    Every price, cost, line total and aggregate is an i64 count of the  │
//! │    smallest currency unit. subtotal − cost is exact, always.           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tindahan_core::money::Money;
//!
//! // Create from centavos (the only way)
//! let price = Money::from_centavos(10_99); // ₱10.99
//!
//! // Arithmetic operations
//! let line_total = price.multiply_quantity(3);
//! let with_fee = price + Money::from_centavos(500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (centavos).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for profit deltas and refunds
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **No float constructor**: There is deliberately no `from_float`
///
/// Every monetary value in the system - variant prices, unit costs, line
/// totals, subtotals, gross profit - flows through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use tindahan_core::money::Money;
    ///
    /// let price = Money::from_centavos(10_99); // ₱10.99
    /// assert_eq!(price.centavos(), 1099);
    /// ```
    #[inline]
    pub const fn from_centavos(centavos: i64) -> Self {
        Money(centavos)
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn centavos(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (pesos) portion.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99, absolute value).
    #[inline]
    pub const fn centavos_part(&self) -> i64 {
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

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use tindahan_core::money::Money;
    ///
    /// let unit_price = Money::from_centavos(299); // ₱2.99
    /// let line_total = unit_price.multiply_quantity(3);
    /// assert_eq!(line_total.centavos(), 897); // ₱8.97
    /// ```
    ///
    /// This is the per-line computation in the sale processor:
    /// `line_total = unit_price × quantity`.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and debugging. Receipt formatting lives with the caller
/// to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}₱{}.{:02}",
            sign,
            self.pesos().abs(),
            self.centavos_part()
        )
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_centavos() {
        let money = Money::from_centavos(1099);
        assert_eq!(money.centavos(), 1099);
        assert_eq!(money.pesos(), 10);
        assert_eq!(money.centavos_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_centavos(1099)), "₱10.99");
        assert_eq!(format!("{}", Money::from_centavos(500)), "₱5.00");
        assert_eq!(format!("{}", Money::from_centavos(-550)), "-₱5.50");
        assert_eq!(format!("{}", Money::from_centavos(0)), "₱0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_centavos(1000);
        let b = Money::from_centavos(500);

        assert_eq!((a + b).centavos(), 1500);
        assert_eq!((a - b).centavos(), 500);
        let result: Money = a * 3;
        assert_eq!(result.centavos(), 3000);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_centavos(299);
        let line_total = unit_price.multiply_quantity(3);
        assert_eq!(line_total.centavos(), 897);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let positive = Money::from_centavos(100);
        assert!(positive.is_positive());

        let negative = Money::from_centavos(-100);
        assert!(negative.is_negative());
    }

    /// Gross profit must be exactly subtotal − cost with integer money.
    #[test]
    fn test_profit_is_exact() {
        let subtotal = Money::from_centavos(10_000);
        let cost = Money::from_centavos(6_667);
        let profit = subtotal - cost;
        assert_eq!(profit.centavos(), 3_333);
        assert_eq!((cost + profit).centavos(), subtotal.centavos());
    }
}
