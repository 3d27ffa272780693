// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Represents an amount of money in a specified currency denomination.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tradesim_core::correctness::{FAILED, check_predicate_true};

use crate::types::{
    currency::Currency,
    fixed::{FIXED_PRECISION, f64_to_fixed_i64, fixed_i64_to_f64},
};

/// An error when combining [`Money`] values of different currencies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// The two operands were denominated in different currencies.
    #[error("currency mismatch: {lhs} vs {rhs}")]
    CurrencyMismatch {
        /// The currency code of the left-hand operand.
        lhs: String,
        /// The currency code of the right-hand operand.
        rhs: String,
    },
}

/// Represents an amount of money in a specified currency denomination.
///
/// Arithmetic preserves the currency; operators panic on a currency mismatch
/// (a programmer error), while [`Money::try_add`] surfaces the mismatch as a
/// typed error for boundary arithmetic.
#[repr(C)]
#[derive(Clone, Copy, Eq)]
pub struct Money {
    /// The raw monetary amount scaled to `FIXED_PRECISION`.
    pub raw: i64,
    /// The currency denomination associated with the monetary amount.
    pub currency: Currency,
}

impl Money {
    /// Creates a new [`Money`] instance with correctness checking.
    ///
    /// The amount is rounded to the currency's decimal precision.
    ///
    /// # Errors
    ///
    /// Returns an error if `amount` is not finite.
    pub fn new_checked(amount: f64, currency: Currency) -> anyhow::Result<Self> {
        check_predicate_true(
            amount.is_finite(),
            &format!("`amount` was invalid, was {amount}"),
        )?;
        Ok(Self {
            raw: f64_to_fixed_i64(amount, currency.precision),
            currency,
        })
    }

    /// Creates a new [`Money`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    #[must_use]
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self::new_checked(amount, currency).expect(FAILED)
    }

    /// Creates a new [`Money`] instance from the given raw fixed-point value.
    #[must_use]
    pub const fn from_raw(raw: i64, currency: Currency) -> Self {
        Self { raw, currency }
    }

    /// Creates a new [`Money`] instance with a value of zero.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self::from_raw(0, currency)
    }

    /// Returns `true` if the value of this instance is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Returns the value of this instance as an `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        fixed_i64_to_f64(self.raw)
    }

    /// Returns the value of this instance as a `Decimal`.
    #[must_use]
    pub fn as_decimal(&self) -> Decimal {
        let precision = self.currency.precision;
        let rescaled_raw = self.raw / 10_i64.pow(u32::from(FIXED_PRECISION - precision));
        Decimal::from_i128_with_scale(i128::from(rescaled_raw), u32::from(precision))
    }

    /// Adds the given money value, checking the currencies match.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError::CurrencyMismatch`] if the currencies differ.
    pub fn try_add(&self, rhs: Self) -> Result<Self, MoneyError> {
        if self.currency != rhs.currency {
            return Err(MoneyError::CurrencyMismatch {
                lhs: self.currency.code.to_string(),
                rhs: rhs.currency.code.to_string(),
            });
        }
        Ok(Self::from_raw(self.raw + rhs.raw, self.currency))
    }

    /// Subtracts the given money value, checking the currencies match.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError::CurrencyMismatch`] if the currencies differ.
    pub fn try_sub(&self, rhs: Self) -> Result<Self, MoneyError> {
        if self.currency != rhs.currency {
            return Err(MoneyError::CurrencyMismatch {
                lhs: self.currency.code.to_string(),
                rhs: rhs.currency.code.to_string(),
            });
        }
        Ok(Self::from_raw(self.raw - rhs.raw, self.currency))
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.currency == other.currency && self.raw == other.raw
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Money {
    fn cmp(&self, other: &Self) -> Ordering {
        assert_eq!(self.currency, other.currency, "Currency mismatch");
        self.raw.cmp(&other.raw)
    }
}

impl Hash for Money {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
        self.currency.hash(state);
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        assert_eq!(self.currency, rhs.currency, "Currency mismatch");
        Self::from_raw(
            self.raw.checked_add(rhs.raw).expect("Error adding with overflow"),
            self.currency,
        )
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        assert_eq!(self.currency, rhs.currency, "Currency mismatch");
        Self::from_raw(
            self.raw
                .checked_sub(rhs.raw)
                .expect("Error subtracting with underflow"),
            self.currency,
        )
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        assert_eq!(self.currency, other.currency, "Currency mismatch");
        self.raw = self
            .raw
            .checked_add(other.raw)
            .expect("Error adding with overflow");
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        assert_eq!(self.currency, other.currency, "Currency mismatch");
        self.raw = self
            .raw
            .checked_sub(other.raw)
            .expect("Error subtracting with underflow");
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::from_raw(-self.raw, self.currency)
    }
}

impl Mul<f64> for Money {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.as_f64() * rhs, self.currency)
    }
}

impl Debug for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({self})", stringify!(Money))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.*} {}",
            self.currency.precision as usize,
            self.as_f64(),
            self.currency
        )
    }
}

impl FromStr for Money {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.splitn(2, ' ').collect();
        if parts.len() != 2 {
            return Err(format!(
                "Error invalid input format '{value}', expected '<amount> <currency>'"
            ));
        }
        let amount = parts[0]
            .parse::<f64>()
            .map_err(|e| format!("Error parsing amount '{}' as f64: {e}", parts[0]))?;
        let currency = Currency::from_str(parts[1]).map_err(|e| e.to_string())?;
        Self::new_checked(amount, currency).map_err(|e| e.to_string())
    }
}

impl From<&str> for Money {
    fn from(value: &str) -> Self {
        value.parse().unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let money_str: String = Deserialize::deserialize(deserializer)?;
        money_str.parse().map_err(serde::de::Error::custom)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_new_rounds_to_currency_precision() {
        let money = Money::new(180.006, Currency::JPY());
        assert_eq!(money.to_string(), "180.01 JPY");
    }

    #[rstest]
    fn test_from_str() {
        let money = Money::from("1000 USD");
        assert_eq!(money.as_f64(), 1000.0);
        assert_eq!(money.currency, Currency::USD());
    }

    #[rstest]
    fn test_from_str_invalid_format() {
        assert!("1000USD".parse::<Money>().is_err());
        assert!("1000 ZZZ".parse::<Money>().is_err());
    }

    #[rstest]
    fn test_add_same_currency() {
        let a = Money::from("180.01 JPY");
        let b = Money::from("200.01 JPY");
        assert_eq!(a + b, Money::from("380.02 JPY"));
    }

    #[rstest]
    #[should_panic(expected = "Currency mismatch")]
    fn test_add_different_currency_panics() {
        let _ = Money::from("1 USD") + Money::from("1 JPY");
    }

    #[rstest]
    fn test_try_add_currency_mismatch() {
        let result = Money::from("1 USD").try_add(Money::from("1 JPY"));
        assert_eq!(
            result,
            Err(MoneyError::CurrencyMismatch {
                lhs: "USD".to_string(),
                rhs: "JPY".to_string(),
            })
        );
    }

    #[rstest]
    fn test_negative_display() {
        let money = Money::new(-0.00217511, Currency::BTC());
        assert_eq!(money.to_string(), "-0.00217511 BTC");
    }

    #[rstest]
    fn test_serde_round_trip() {
        let money = Money::from("999619.98 JPY");
        let json = serde_json::to_string(&money).unwrap();
        assert_eq!(json, "\"999619.98 JPY\"");
        let deserialized: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, money);
    }
}
