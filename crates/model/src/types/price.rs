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

//! Represents a price in a market with a specified decimal precision.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    ops::{Add, Neg, Sub},
    str::FromStr,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tradesim_core::correctness::{FAILED, check_predicate_true};

use crate::types::fixed::{FIXED_PRECISION, check_fixed_precision, f64_to_fixed_i64, fixed_i64_to_f64};

/// Represents a price in a market with a specified decimal precision.
///
/// The raw value is stored scaled to the maximum fixed-point precision, so
/// prices of different precision compare and combine exactly.
#[repr(C)]
#[derive(Clone, Copy, Default, Eq)]
pub struct Price {
    /// The raw price value scaled to `FIXED_PRECISION`.
    pub raw: i64,
    /// The price decimal precision.
    pub precision: u8,
}

impl Price {
    /// Creates a new [`Price`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not finite or `precision` is invalid.
    pub fn new_checked(value: f64, precision: u8) -> anyhow::Result<Self> {
        check_predicate_true(
            value.is_finite(),
            &format!("`value` was invalid, was {value}"),
        )?;
        check_fixed_precision(precision)?;
        Ok(Self {
            raw: f64_to_fixed_i64(value, precision),
            precision,
        })
    }

    /// Creates a new [`Price`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    #[must_use]
    pub fn new(value: f64, precision: u8) -> Self {
        Self::new_checked(value, precision).expect(FAILED)
    }

    /// Creates a new [`Price`] instance from the given raw fixed-point value.
    #[must_use]
    pub fn from_raw(raw: i64, precision: u8) -> Self {
        check_fixed_precision(precision).expect(FAILED);
        Self { raw, precision }
    }

    /// Creates a new [`Price`] instance with a value of zero.
    #[must_use]
    pub fn zero(precision: u8) -> Self {
        Self::from_raw(0, precision)
    }

    /// Returns `true` if the value of this instance is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Returns `true` if the value of this instance is positive.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.raw > 0
    }

    /// Returns the value of this instance as an `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        fixed_i64_to_f64(self.raw)
    }

    /// Returns the value of this instance as a `Decimal`.
    #[must_use]
    pub fn as_decimal(&self) -> Decimal {
        let rescaled_raw = self.raw / 10_i64.pow(u32::from(FIXED_PRECISION - self.precision));
        Decimal::from_i128_with_scale(i128::from(rescaled_raw), u32::from(self.precision))
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl Hash for Price {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            raw: self.raw.checked_add(rhs.raw).expect("Error adding with overflow"),
            precision: self.precision,
        }
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            raw: self
                .raw
                .checked_sub(rhs.raw)
                .expect("Error subtracting with underflow"),
            precision: self.precision,
        }
    }
}

impl Neg for Price {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            raw: -self.raw,
            precision: self.precision,
        }
    }
}

impl Debug for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({self})", stringify!(Price))
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.*}", self.precision as usize, self.as_f64())
    }
}

impl FromStr for Price {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let float_from_input = value
            .parse::<f64>()
            .map_err(|e| format!("Error parsing `input` string '{value}' as f64: {e}"))?;
        let precision = precision_from_str(value);
        Self::new_checked(float_from_input, precision).map_err(|e| e.to_string())
    }
}

impl From<&str> for Price {
    fn from(value: &str) -> Self {
        value.parse().unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let price_str: String = Deserialize::deserialize(deserializer)?;
        price_str.parse().map_err(serde::de::Error::custom)
    }
}

/// Returns the decimal precision inferred from the given string value.
#[must_use]
pub fn precision_from_str(value: &str) -> u8 {
    let value = value.trim();
    if let Some(exp_idx) = value.to_ascii_lowercase().find('e') {
        // Scientific notation: precision is the negated exponent when negative
        if let Ok(exponent) = value[exp_idx + 1..].parse::<i32>()
            && exponent < 0
        {
            return exponent.unsigned_abs().min(u32::from(FIXED_PRECISION)) as u8;
        }
        return 0;
    }
    value
        .split('.')
        .nth(1)
        .map_or(0, |decimals| decimals.len().min(usize::from(FIXED_PRECISION)) as u8)
}

/// Checks the price is positive.
///
/// # Errors
///
/// Returns an error if `price` is not positive.
pub fn check_positive_price(price: Price, param: &str) -> anyhow::Result<()> {
    if !price.is_positive() {
        anyhow::bail!("invalid `Price` for '{param}' not positive, was {price}")
    }
    Ok(())
}
