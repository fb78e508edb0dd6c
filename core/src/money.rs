//! Money value object.
//!
//! Amounts are kept in minor units (cents) so that pricing, discounts and
//! totals never touch floating point.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An amount of money in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole currency units, with overflow checking.
    #[must_use]
    pub const fn checked_from_units(units: u64) -> Option<Self> {
        match units.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents.
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts with overflow checking.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Subtracts, clamping at zero.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Converts to the signed representation used by SQL `BIGINT` columns.
    #[must_use]
    pub fn to_i64(self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }

    /// Builds from a signed SQL value, rejecting negatives.
    #[must_use]
    pub fn from_i64(cents: i64) -> Option<Self> {
        u64::try_from(cents).ok().map(Self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| Self(acc.0.saturating_add(m.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_with_two_decimals() {
        assert_eq!(Money::from_cents(4900).to_string(), "49.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
    }

    #[test]
    fn saturating_sub_never_goes_negative() {
        let price = Money::from_cents(500);
        assert_eq!(price.saturating_sub(Money::from_cents(800)), Money::ZERO);
        assert_eq!(price.saturating_sub(Money::from_cents(100)).cents(), 400);
    }

    #[test]
    fn signed_conversion_rejects_negative_values() {
        assert_eq!(Money::from_i64(-1), None);
        assert_eq!(Money::from_i64(250), Some(Money::from_cents(250)));
    }
}
