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

//! Represents a trading account with per-currency balances.

use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tradesim_core::{UUID4, UnixNanos, correctness::check_predicate_true};

use crate::{
    events::account::AccountState,
    identifiers::AccountId,
    types::{AccountBalance, Currency, Money},
};

/// Represents a trading account with per-currency balances.
///
/// When `is_frozen` is true every adjustment path is a no-op, while state
/// snapshots continue to be generated for reporting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account ID.
    pub id: AccountId,
    /// If the account balances are frozen (no adjustments applied).
    pub is_frozen: bool,
    balances: IndexMap<Currency, AccountBalance>,
}

impl Account {
    /// Creates a new [`Account`] instance with the given starting balances.
    ///
    /// # Errors
    ///
    /// Returns an error if `starting_balances` is empty.
    pub fn new(
        id: AccountId,
        starting_balances: Vec<Money>,
        is_frozen: bool,
    ) -> anyhow::Result<Self> {
        check_predicate_true(
            !starting_balances.is_empty(),
            "`starting_balances` must not be empty",
        )?;
        let mut balances = IndexMap::new();
        for money in starting_balances {
            balances.insert(money.currency, AccountBalance::from_total(money));
        }
        Ok(Self {
            id,
            is_frozen,
            balances,
        })
    }

    /// Returns the balance for the given currency.
    #[must_use]
    pub fn balance(&self, currency: Currency) -> Option<&AccountBalance> {
        self.balances.get(&currency)
    }

    /// Returns all balances in registration order.
    #[must_use]
    pub fn balances(&self) -> Vec<AccountBalance> {
        self.balances.values().copied().collect()
    }

    /// Applies the given adjustment to the balance of its currency.
    ///
    /// A balance is created on first touch of a new currency. No-op when the
    /// account is frozen.
    pub fn adjust(&mut self, adjustment: Money) {
        if self.is_frozen {
            log::debug!("Skipping balance adjustment {adjustment} for frozen account {}", self.id);
            return;
        }
        let balance = self
            .balances
            .entry(adjustment.currency)
            .or_insert_with(|| AccountBalance::from_total(Money::zero(adjustment.currency)));
        balance.total += adjustment;
        balance.free += adjustment;
    }

    /// Returns an [`AccountState`] snapshot of the current balances.
    #[must_use]
    pub fn snapshot(&self, is_reported: bool, ts_event: UnixNanos, ts_init: UnixNanos) -> AccountState {
        AccountState::new(
            self.id,
            self.balances(),
            is_reported,
            UUID4::new(),
            ts_event,
            ts_init,
        )
    }
}

impl Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(id={}, is_frozen={})",
            stringify!(Account),
            self.id,
            self.is_frozen,
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
    fn test_new_requires_starting_balances() {
        let result = Account::new(AccountId::default(), vec![], false);
        assert!(result.is_err());
    }

    #[rstest]
    fn test_adjust_changes_balance() {
        let mut account =
            Account::new(AccountId::default(), vec![Money::from("1000000 USD")], false).unwrap();
        account.adjust(Money::from("1000 USD"));

        let balance = account.balance(Currency::USD()).unwrap();
        assert_eq!(balance.total, Money::from("1001000 USD"));
        assert_eq!(balance.free, Money::from("1001000 USD"));
    }

    #[rstest]
    fn test_adjust_creates_balance_for_new_currency() {
        let mut account =
            Account::new(AccountId::default(), vec![Money::from("1000000 USD")], false).unwrap();
        account.adjust(Money::from("-180.01 JPY"));

        let balance = account.balance(Currency::JPY()).unwrap();
        assert_eq!(balance.total, Money::from("-180.01 JPY"));
    }

    #[rstest]
    fn test_adjust_when_frozen_does_not_change_balance() {
        let mut account =
            Account::new(AccountId::default(), vec![Money::from("1000000 USD")], true).unwrap();
        account.adjust(Money::from("1000 USD"));

        let balance = account.balance(Currency::USD()).unwrap();
        assert_eq!(balance.total, Money::from("1000000 USD"));
    }

    #[rstest]
    fn test_snapshot_reports_balances() {
        let account =
            Account::new(AccountId::default(), vec![Money::from("1000000 USD")], false).unwrap();
        let state = account.snapshot(true, UnixNanos::default(), UnixNanos::default());
        assert_eq!(state.account_id, account.id);
        assert_eq!(state.balances.len(), 1);
        assert!(state.is_reported);
    }
}
