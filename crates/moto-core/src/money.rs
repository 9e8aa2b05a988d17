//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Shop balances are the running sum of thousands of cash rows.          │
//! │  With floats every sum drifts:                                         │
//! │    0.1 + 0.2 = 0.30000000000000004                                     │
//! │                                                                         │
//! │  Integer amounts in the smallest currency unit never drift, and the    │
//! │  ledger invariant (Σ income − Σ expense == balance) holds exactly.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use moto_core::money::Money;
//!
//! let oil = Money::new(120_000);
//! let labor = Money::new(50_000);
//!
//! let line = oil * 2;           // 240,000
//! let total = line + labor;     // 290,000
//! assert_eq!(total.amount(), 290_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are balance deltas for expenses and reversals
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Newtype serde**: serialises as a bare integer
///
/// ## Where Money Flows
/// ```text
/// Part.selling_price ──► SaleItem.unit_price ──► Sale.total ──► CashTransaction.amount
///                                                                     │
/// WorkOrder.labor_cost ──┐                                            ▼
/// PartUsage.price ───────┼──► WorkOrder.total              PaymentSource.balance[branch]
/// QuotationItem.price ───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from an amount in the smallest currency unit.
    ///
    /// ## Example
    /// ```rust
    /// use moto_core::money::Money;
    ///
    /// let price = Money::new(85_000);
    /// assert_eq!(price.amount(), 85_000);
    /// ```
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Money(amount)
    }

    /// Returns the raw amount.
    #[inline]
    pub const fn amount(&self) -> i64 {
        self.0
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use moto_core::money::Money;
    ///
    /// let spark_plug = Money::new(45_000);
    /// assert_eq!(spark_plug.multiply_quantity(3).amount(), 135_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Applies a percentage in basis points (1000 = 10%) and returns the share.
    ///
    /// Rounds half up using integer math: `(amount * bps + 5000) / 10000`.
    ///
    /// ## Example
    /// ```rust
    /// use moto_core::money::Money;
    ///
    /// let total = Money::new(1_000_000);
    /// assert_eq!(total.percentage(500).amount(), 50_000); // 5%
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        let share = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money(share as i64)
    }

    /// Integer division by a positive unit, rounding toward zero.
    ///
    /// Returns zero for a non-positive unit. Used for loyalty points
    /// (`total / point_value`).
    pub const fn units_of(&self, unit: i64) -> i64 {
        if unit <= 0 {
            return 0;
        }
        self.0 / unit
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount with thousands separators, e.g. `1,250,000`.
///
/// ## Note
/// This is for logs and debugging. Currency formatting belongs to the
/// front end.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        if self.0 < 0 {
            write!(f, "-{}", grouped)
        } else {
            write!(f, "{}", grouped)
        }
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

/// Negation turns a balance delta into its reversal.
impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by quantity.
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
