//! Amount type for monetary values typed by a person or read back from storage.
//!
//! This module provides the `Amount` type which wraps `Decimal`, accepts either a comma or a period
//! as the decimal separator when parsing, and renders values as Brazilian Real.

use crate::error::Rejection;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// What is shown in place of a monetary value when values are hidden.
pub const MASK: &str = "••••••";

const CURRENCY_SYMBOL: &str = "R$";

/// Values must stay below this many units, which keeps any sum of them far from `Decimal::MAX`.
const LIMIT: i64 = 1_000_000_000_000_000;

/// Represents an amount of money.
///
/// Parsing is lenient about the decimal separator because the mobile input form uses a numeric
/// keypad that produces `12,50` on Brazilian devices:
///
/// ```
/// # use myfinance::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("12,50").unwrap();
/// let b = Amount::from_str("12.5").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "R$ 12,50");
/// ```
///
/// Thousands separators are not understood:
///
/// ```
/// # use myfinance::model::Amount;
/// # use std::str::FromStr;
/// assert!(Amount::from_str("1.234,56").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is below zero. Negative zero is not negative.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// True if the amount is too large to be the value of a transaction.
    pub fn exceeds_limit(&self) -> bool {
        self.0.abs() >= Decimal::from(LIMIT)
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// Renders the amount as currency, or as `MASK` when `visible` is false.
    pub fn render(&self, visible: bool) -> String {
        if visible {
            self.to_string()
        } else {
            MASK.to_string()
        }
    }
}

impl FromStr for Amount {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Rejection::EmptyValue);
        }

        // Only the first comma is treated as a decimal separator. Anything left over is garbage.
        let normalized = trimmed.replacen(',', ".", 1);
        Decimal::from_str(&normalized)
            .map(Amount)
            .map_err(|_| Rejection::InvalidValue(trimmed.to_string()))
    }
}

impl fmt::Display for Amount {
    /// Formats like `toLocaleString('pt-BR', { style: 'currency', currency: 'BRL' })`, e.g.
    /// `R$ 1.234,56` and `-R$ 20,00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded.is_zero() || rounded.is_sign_positive() {
            ""
        } else {
            "-"
        };
        let digits = format!("{:.2}", rounded.abs());
        let (units, cents) = digits.split_once('.').unwrap_or((&digits, "00"));
        write!(
            f,
            "{sign}{CURRENCY_SYMBOL} {},{cents}",
            group_thousands(units)
        )
    }
}

/// `1234567` becomes `1.234.567`.
fn group_thousands(units: &str) -> String {
    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (ix, c) in units.chars().enumerate() {
        if ix > 0 && (units.len() - ix) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    grouped
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    /// Accepts a decimal string (current schema) or a JSON number (data written by the first
    /// version of the app). `null`, which is what a non-numeric value became there, is an error.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal number or a string containing one")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Decimal::try_from(v)
            .map(|d| Amount(d.normalize()))
            .map_err(|_| E::custom(format!("{v} cannot be represented as a decimal")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

// The operators saturate at the bounds of `Decimal`. Use `checked_add` and `checked_sub` to
// find out when that happens.

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = *self + rhs;
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        *self = *self - rhs;
    }
}
