//! Type-safe price representation using decimal arithmetic.
//!
//! The storefront sells in a single currency and renders every amount as
//! `$12.34`. Arithmetic stays in [`Decimal`] so cart totals never drift the
//! way binary floats do.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Sub};
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A non-currency-tagged amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Subtract, clamping at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(2);
        if rounded.is_sign_negative() && !rounded.is_zero() {
            write!(f, "-${:.2}", rounded.abs())
        } else {
            write!(f, "${:.2}", rounded.abs())
        }
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        assert_eq!(Price::from_cents(2999).amount(), Decimal::new(2999, 2));
        assert_eq!(Price::from_cents(-150).amount(), Decimal::new(-150, 2));
    }

    #[test]
    fn test_display_rounds_to_cents() {
        assert_eq!(Price::from_cents(2999).to_string(), "$29.99");
        assert_eq!(Price::new(Decimal::new(15, 0)).to_string(), "$15.00");
        assert_eq!(Price::new(Decimal::new(12_345, 3)).to_string(), "$12.35");
        assert_eq!(Price::from_cents(-2999).to_string(), "-$29.99");
    }

    #[test]
    fn test_times_and_sum() {
        let unit = Price::from_cents(1050);
        let total: Price = [unit.times(3), Price::from_cents(50)].into_iter().sum();
        assert_eq!(total, Price::from_cents(3200));
    }

    #[test]
    fn test_saturating_sub() {
        let fee = Price::from_cents(2999);
        assert_eq!(fee.saturating_sub(fee), Price::ZERO);
        assert_eq!(Price::ZERO.saturating_sub(fee), Price::ZERO);
        assert_eq!(
            Price::from_cents(5000).saturating_sub(fee),
            Price::from_cents(2001)
        );
    }

    #[test]
    fn test_deserializes_json_numbers() {
        let price: Price = serde_json::from_str("29.99").unwrap();
        assert_eq!(price, Price::from_cents(2999));
        let price: Price = serde_json::from_str("\"150\"").unwrap();
        assert_eq!(price, " 150 ".parse().unwrap());
        assert!("abc".parse::<Price>().is_err());
        assert_eq!(price, Price::new(Decimal::new(150, 0)));
    }
}
