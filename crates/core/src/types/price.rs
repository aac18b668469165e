//! Integer price representation.
//!
//! The backend stores every amount in cents. Arithmetic stays in integers;
//! `rust_decimal` is only used to render the two-decimal display form.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Currency every storefront price is quoted in.
pub const CURRENCY_CODE: &str = "CAD";

/// An amount in cents.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Create an amount from a number of cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Get the raw number of cents.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Multiply by a quantity, saturating instead of overflowing.
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as i64))
    }

    /// Amount in dollars with two decimal places.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Parse a dollar amount typed into a form (e.g. `"24.99"`).
    ///
    /// Rounds to the nearest cent. Returns `None` for anything that is not a
    /// non-negative number.
    #[must_use]
    pub fn parse_dollars(input: &str) -> Option<Self> {
        let amount: Decimal = input.trim().parse().ok()?;
        if amount.is_sign_negative() {
            return None;
        }
        let cents = (amount * Decimal::ONE_HUNDRED).round();
        cents.to_i64().map(Self)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${} {CURRENCY_CODE}", self.to_decimal())
    }
}

impl Add for Cents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<i64> for Cents {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats_dollars_and_currency() {
        assert_eq!(Cents::new(2200).to_string(), "$22.00 CAD");
        assert_eq!(Cents::new(999).to_string(), "$9.99 CAD");
        assert_eq!(Cents::ZERO.to_string(), "$0.00 CAD");
        assert_eq!(Cents::new(5).to_string(), "$0.05 CAD");
    }

    #[test]
    fn test_times_and_sum() {
        let total: Cents = [Cents::new(500).times(2), Cents::new(1200).times(1)]
            .into_iter()
            .sum();
        assert_eq!(total, Cents::new(2200));
    }

    #[test]
    fn test_times_saturates() {
        assert_eq!(Cents::new(i64::MAX).times(2), Cents::new(i64::MAX));
    }

    #[test]
    fn test_parse_dollars() {
        assert_eq!(Cents::parse_dollars("24.99"), Some(Cents::new(2499)));
        assert_eq!(Cents::parse_dollars(" 10 "), Some(Cents::new(1000)));
        assert_eq!(Cents::parse_dollars("0.005"), Some(Cents::new(0)));
        assert_eq!(Cents::parse_dollars("-1"), None);
        assert_eq!(Cents::parse_dollars("ten"), None);
    }
}
