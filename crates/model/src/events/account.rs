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

//! Account state events emitted by the venue.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tradesim_core::{UUID4, UnixNanos};

use crate::{identifiers::AccountId, types::AccountBalance};

/// Represents an event which includes information on the state of the account.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct AccountState {
    /// The account ID associated with the event.
    pub account_id: AccountId,
    /// The account balances, by currency.
    pub balances: Vec<AccountBalance>,
    /// If the state is reported from the venue (as opposed to calculated internally).
    pub is_reported: bool,
    /// The unique identifier for the event.
    pub event_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the event was initialized.
    pub ts_init: UnixNanos,
}

impl AccountState {
    /// Creates a new [`AccountState`] instance.
    #[must_use]
    pub const fn new(
        account_id: AccountId,
        balances: Vec<AccountBalance>,
        is_reported: bool,
        event_id: UUID4,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self {
            account_id,
            balances,
            is_reported,
            event_id,
            ts_event,
            ts_init,
        }
    }
}

impl Display for AccountState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}(account_id={}, is_reported={}, balances=[{}])",
            stringify!(AccountState),
            self.account_id,
            self.is_reported,
            self.balances
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(","),
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
    use crate::types::Money;

    #[rstest]
    fn test_serde_round_trip() {
        let event = AccountState::new(
            AccountId::from("SIM-001"),
            vec![AccountBalance::from_total(Money::from("1000000 USD"))],
            true,
            UUID4::new(),
            UnixNanos::default(),
            UnixNanos::default(),
        );
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: AccountState = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
