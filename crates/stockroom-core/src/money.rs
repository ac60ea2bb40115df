//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Fixed-Point Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    2 × 9.995 + 5.00 = 24.990000000000002  ❌ (rounds how?)              │
//! │                                                                         │
//! │  OUR SOLUTION: i64 in units of 1/10 000                                 │
//! │    9.995  = 99 950 units                                                │
//! │    2 × 99 950 + 50 000 = 249 900 units = 24.99  ✓ exact                 │
//! │                                                                         │
//! │  Totals are rounded ONCE to cents, half away from zero.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockroom_core::money::Money;
//!
//! let price: Money = "9.995".parse().unwrap();
//! let line = price.checked_mul_quantity(2).unwrap();
//! let total = (line + Money::from_cents(500)).round_to_cents();
//! assert_eq!(total.to_string(), "24.99");
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

use crate::error::ValidationError;

/// Number of fractional digits carried by [`Money`].
pub const MONEY_SCALE_DIGITS: u32 = 4;

/// Units per whole currency unit.
pub const UNITS_PER_WHOLE: i64 = 10_000;

const UNITS_PER_CENT: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in units of 1/10 000 of the currency.
///
/// Catalogue prices may carry up to four decimal places. Sale totals and
/// report revenues are always rounded to cents with [`Money::round_to_cents`].
///
/// ## Where Money is Used
/// ```text
/// Product.price ──► SaleItem.price_at_sale ──► line contribution (exact)
///                                                    │
///                                      Σ lines ──► round_to_cents ──► Sale.total_amount
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from raw units (1 unit = 0.0001).
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).units(), 109_900);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents * UNITS_PER_CENT)
    }

    /// Returns the raw value in units of 1/10 000.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    ///
    /// The product is computed in i128 so the only failure is a result that
    /// does not fit back into i64.
    pub fn checked_mul_quantity(&self, quantity: i64) -> Option<Money> {
        let product = self.0 as i128 * quantity as i128;
        i64::try_from(product).ok().map(Money)
    }

    /// Adds two amounts, returning `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Rounds to whole cents, half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// assert_eq!(Money::from_units(50).round_to_cents(), Money::from_cents(1));
    /// assert_eq!(Money::from_units(-50).round_to_cents(), Money::from_cents(-1));
    /// assert_eq!(Money::from_units(249).round_to_cents(), Money::from_cents(2));
    /// ```
    pub fn round_to_cents(&self) -> Money {
        let cents = self.0 / UNITS_PER_CENT;
        let remainder = self.0 % UNITS_PER_CENT;
        let rounded = if remainder >= UNITS_PER_CENT / 2 {
            cents + 1
        } else if remainder <= -(UNITS_PER_CENT / 2) {
            cents - 1
        } else {
            cents
        };
        Money::from_cents(rounded)
    }

    /// Sums amounts exactly, returning `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// Approximate float value, used only for JSON output.
    fn as_f64(&self) -> f64 {
        self.0 as f64 / UNITS_PER_WHOLE as f64
    }

    /// Parses a plain decimal string such as `"12"`, `"-0.5"` or `"9.995"`.
    ///
    /// At most four significant fractional digits are accepted; trailing
    /// zeros beyond that are ignored.
    pub fn parse_decimal(input: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let text = input.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("must be a decimal number"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("must be a decimal number"));
        }

        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > MONEY_SCALE_DIGITS as usize {
            return Err(invalid("must have at most 4 decimal places"));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("is too large"))?
        };

        let mut fraction_value: i64 = 0;
        for digit in fraction.chars().chain(std::iter::repeat('0')).take(MONEY_SCALE_DIGITS as usize) {
            fraction_value = fraction_value * 10 + i64::from(digit as u8 - b'0');
        }

        let units = whole_value
            .checked_mul(UNITS_PER_WHOLE)
            .and_then(|w| w.checked_add(fraction_value))
            .ok_or_else(|| invalid("is too large"))?;

        Ok(Money(if negative { -units } else { units }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows at least two decimal places and up to four, without a currency sign.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / UNITS_PER_WHOLE as u64;
        let fraction = abs % UNITS_PER_WHOLE as u64;

        let mut fraction_text = format!("{:04}", fraction);
        while fraction_text.len() > 2 && fraction_text.ends_with('0') {
            fraction_text.pop();
        }

        write!(f, "{}{}.{}", sign, whole, fraction_text)
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse_decimal(s)
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

// =============================================================================
// Serde
// =============================================================================
// JSON carries money as a plain number (`24.99`). Input also accepts decimal
// strings (`"24.99"`). Floats go through their shortest round-trip text so
// `9.995` arrives as exactly 99 950 units.

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount with at most 4 decimal places")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(UNITS_PER_WHOLE)
            .map(Money)
            .ok_or_else(|| E::custom("amount is too large"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        let v = i64::try_from(v).map_err(|_| E::custom("amount is too large"))?;
        self.visit_i64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom("amount must be finite"));
        }
        Money::parse_decimal(&v.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Money::parse_decimal(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
