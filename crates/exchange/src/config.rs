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

//! Configuration for a simulated venue.

use serde::{Deserialize, Serialize};
use tradesim_model::{
    enums::OmsType,
    identifiers::{AccountId, Venue},
    types::Money,
};

/// Configuration for a simulated venue matching engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// The venue ID.
    pub venue: Venue,
    /// The order management system type (netting or hedging).
    pub oms_type: OmsType,
    /// The account ID the venue reports against.
    pub account_id: AccountId,
    /// The starting account balances, one per currency.
    pub starting_balances: Vec<Money>,
    /// If the venue mints position IDs for fills without one.
    pub generate_position_ids: bool,
    /// If the account balances are frozen (no adjustments applied).
    pub is_frozen_account: bool,
    /// If stop orders with a trigger already inside the market are rejected.
    pub reject_stop_orders: bool,
    /// If GTD expiration is honored.
    pub support_gtd_orders: bool,
    /// If bracket (contingent) orders are supported.
    pub support_contingent_orders: bool,
}

impl ExchangeConfig {
    /// Creates a new [`ExchangeConfig`] instance with the default behavior
    /// flags.
    #[must_use]
    pub fn new(
        venue: Venue,
        oms_type: OmsType,
        account_id: AccountId,
        starting_balances: Vec<Money>,
    ) -> Self {
        Self {
            venue,
            oms_type,
            account_id,
            starting_balances,
            generate_position_ids: true,
            is_frozen_account: false,
            reject_stop_orders: true,
            support_gtd_orders: true,
            support_contingent_orders: true,
        }
    }
}

impl Default for ExchangeConfig {
    /// Creates a new default [`ExchangeConfig`] instance.
    fn default() -> Self {
        Self::new(
            Venue::new("SIM"),
            OmsType::Hedging,
            AccountId::default(),
            vec![Money::from("1000000 USD")],
        )
    }
}
