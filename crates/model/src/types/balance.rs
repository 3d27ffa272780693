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

//! Represents a per-currency account balance denominated in total, locked and free amounts.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tradesim_core::correctness::{FAILED, check_predicate_true};

use crate::types::{currency::Currency, money::Money};

/// Represents an account balance denominated in a particular currency.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The total account balance.
    pub total: Money,
    /// The account balance locked (assigned to pending orders).
    pub locked: Money,
    /// The account balance free for trading.
    pub free: Money,
}

impl AccountBalance {
    /// Creates a new [`AccountBalance`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// Returns an error if the currencies are not equal, or if
    /// `total` != `locked` + `free`.
    pub fn new_checked(total: Money, locked: Money, free: Money) -> anyhow::Result<Self> {
        check_predicate_true(
            total.currency == locked.currency && total.currency == free.currency,
            &format!(
                "currency mismatch: total {}, locked {}, free {}",
                total.currency, locked.currency, free.currency
            ),
        )?;
        check_predicate_true(
            total.raw == locked.raw + free.raw,
            &format!("total {total} was not equal to locked {locked} + free {free}"),
        )?;
        Ok(Self {
            total,
            locked,
            free,
        })
    }

    /// Creates a new [`AccountBalance`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    #[must_use]
    pub fn new(total: Money, locked: Money, free: Money) -> Self {
        Self::new_checked(total, locked, free).expect(FAILED)
    }

    /// Creates a new [`AccountBalance`] instance with the full amount free.
    #[must_use]
    pub fn from_total(total: Money) -> Self {
        Self::new(total, Money::zero(total.currency), total)
    }

    /// Returns the currency of this balance.
    #[must_use]
    pub const fn currency(&self) -> Currency {
        self.total.currency
    }
}

impl Display for AccountBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(total={}, locked={}, free={})",
            stringify!(AccountBalance),
            self.total,
            self.locked,
            self.free,
        )
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
    fn test_from_total() {
        let balance = AccountBalance::from_total(Money::from("1000000 USD"));
        assert_eq!(balance.total, Money::from("1000000 USD"));
        assert_eq!(balance.locked, Money::from("0 USD"));
        assert_eq!(balance.free, Money::from("1000000 USD"));
    }

    #[rstest]
    fn test_new_checked_total_mismatch() {
        let result = AccountBalance::new_checked(
            Money::from("100 USD"),
            Money::from("0 USD"),
            Money::from("99 USD"),
        );
        assert!(result.is_err());
    }

    #[rstest]
    fn test_new_checked_currency_mismatch() {
        let result = AccountBalance::new_checked(
            Money::from("100 USD"),
            Money::from("0 JPY"),
            Money::from("100 USD"),
        );
        assert!(result.is_err());
    }

    #[rstest]
    fn test_serde_round_trip() {
        let balance = AccountBalance::from_total(Money::from("1000000 USD"));
        let json = serde_json::to_string(&balance).unwrap();
        let deserialized: AccountBalance = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, balance);
    }
}
