//! Decimal-safe price representation.
//!
//! The backend stores prices as plain JSON numbers (rubles per kilogram).
//! Summing cart totals with binary floats drifts, so prices and quantities
//! are carried as [`rust_decimal::Decimal`] end to end.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::Decimal;

/// A price in rubles per kilogram.
///
/// Wraps a [`Decimal`] amount. Multiplying by a quantity (in kilograms)
/// yields the line total; totals sum exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Price(Decimal);

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    /// Formats as `"{amount} руб."`, e.g. `"150 руб."`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} руб.", self.0.normalize())
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    /// Price per kilogram times quantity in kilograms.
    fn mul(self, quantity: Decimal) -> Self {
        Self(self.0 * quantity)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
