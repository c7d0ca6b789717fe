//! Dollar amounts with exactly 2 decimal places.
//!
//! ACH records carry amounts as whole cents. `Amount` converts between the
//! two using `rust_decimal`, so no value ever passes through a float.

use crate::record::FieldValue;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A dollar amount with cent precision.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use ach_engine::{Amount, FieldValue};
///
/// let amount = Amount::from_str("15.99").unwrap();
/// assert_eq!(amount.cents(), 1599);
/// assert_eq!(FieldValue::from(amount), FieldValue::Text("1599".into()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// The number of decimal places to maintain.
    pub const SCALE: u32 = 2;

    pub const ZERO: Self = Amount(Decimal::ZERO);

    /// Creates an amount from a `Decimal`, rounding to cents.
    pub fn new(value: Decimal) -> Self {
        let mut normalized = value;
        normalized.rescale(Self::SCALE);
        Amount(normalized)
    }

    /// Creates an amount from a number of cents, as stored in an entry.
    pub fn from_cents(cents: i64) -> Self {
        Amount(Decimal::new(cents, Self::SCALE))
    }

    /// Whole number of cents.
    pub fn cents(&self) -> i128 {
        self.0.mantissa()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())?;
        Ok(Amount::new(decimal))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount::new(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
        self.0.rescale(Self::SCALE);
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

/// Amounts are written to records as whole cents.
impl From<Amount> for FieldValue {
    fn from(amount: Amount) -> Self {
        FieldValue::Text(amount.cents().to_string())
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:.2}", self.0))
    }
}
