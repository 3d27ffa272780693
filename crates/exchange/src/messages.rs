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

//! Trading commands delivered to the venue command sink.

use serde::{Deserialize, Serialize};
use tradesim_core::{UUID4, UnixNanos};
use tradesim_model::{
    identifiers::{ClientOrderId, InstrumentId, OrderListId, PositionId, StrategyId, TraderId},
    orders::Order,
    types::{Price, Quantity},
};

/// A command to submit an order to the venue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmitOrder {
    /// The trader ID associated with the command.
    pub trader_id: TraderId,
    /// The strategy ID associated with the command.
    pub strategy_id: StrategyId,
    /// The unique identifier for the command.
    pub command_id: UUID4,
    /// The order to submit.
    pub order: Order,
    /// The position ID to apply fills against (hedging OMS).
    pub position_id: Option<PositionId>,
    /// UNIX timestamp (nanoseconds) when the command was initialized.
    pub ts_init: UnixNanos,
}

/// A command to submit a bracket order family to the venue.
///
/// The stop-loss child is a STOP_MARKET and the take-profit child a LIMIT
/// order, both on the opposite side of the entry for its full quantity, and
/// forming an OCO pair contingent on the entry fill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmitBracket {
    /// The trader ID associated with the command.
    pub trader_id: TraderId,
    /// The strategy ID associated with the command.
    pub strategy_id: StrategyId,
    /// The unique identifier for the command.
    pub command_id: UUID4,
    /// The entry order of the bracket.
    pub entry: Order,
    /// The client order ID for the stop-loss child.
    pub stop_loss_client_order_id: ClientOrderId,
    /// The stop-loss trigger price.
    pub stop_loss_price: Price,
    /// The client order ID for the take-profit child.
    pub take_profit_client_order_id: ClientOrderId,
    /// The take-profit limit price.
    pub take_profit_price: Price,
    /// The order list ID shared by the bracket family.
    pub order_list_id: OrderListId,
    /// UNIX timestamp (nanoseconds) when the command was initialized.
    pub ts_init: UnixNanos,
}

/// A command to amend a working order.
///
/// A `None` (or zero quantity) field means "do not change this field".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyOrder {
    /// The trader ID associated with the command.
    pub trader_id: TraderId,
    /// The strategy ID associated with the command.
    pub strategy_id: StrategyId,
    /// The unique identifier for the command.
    pub command_id: UUID4,
    /// The instrument ID associated with the command.
    pub instrument_id: InstrumentId,
    /// The client order ID of the order to amend.
    pub client_order_id: ClientOrderId,
    /// The new order quantity.
    pub quantity: Option<Quantity>,
    /// The new limit price.
    pub price: Option<Price>,
    /// The new trigger price.
    pub trigger_price: Option<Price>,
    /// UNIX timestamp (nanoseconds) when the command was initialized.
    pub ts_init: UnixNanos,
}

/// A command to cancel a working order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    /// The trader ID associated with the command.
    pub trader_id: TraderId,
    /// The strategy ID associated with the command.
    pub strategy_id: StrategyId,
    /// The unique identifier for the command.
    pub command_id: UUID4,
    /// The instrument ID associated with the command.
    pub instrument_id: InstrumentId,
    /// The client order ID of the order to cancel.
    pub client_order_id: ClientOrderId,
    /// UNIX timestamp (nanoseconds) when the command was initialized.
    pub ts_init: UnixNanos,
}

/// A sum type covering every trading command the venue accepts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TradingCommand {
    /// Submit an order.
    SubmitOrder(SubmitOrder),
    /// Submit a bracket order family.
    SubmitBracket(SubmitBracket),
    /// Amend a working order.
    ModifyOrder(ModifyOrder),
    /// Cancel a working order.
    CancelOrder(CancelOrder),
}

impl TradingCommand {
    /// Returns the instrument ID associated with the command.
    #[must_use]
    pub fn instrument_id(&self) -> InstrumentId {
        match self {
            Self::SubmitOrder(command) => command.order.instrument_id,
            Self::SubmitBracket(command) => command.entry.instrument_id,
            Self::ModifyOrder(command) => command.instrument_id,
            Self::CancelOrder(command) => command.instrument_id,
        }
    }

    /// Returns the UNIX timestamp (nanoseconds) when the command was initialized.
    #[must_use]
    pub const fn ts_init(&self) -> UnixNanos {
        match self {
            Self::SubmitOrder(command) => command.ts_init,
            Self::SubmitBracket(command) => command.ts_init,
            Self::ModifyOrder(command) => command.ts_init,
            Self::CancelOrder(command) => command.ts_init,
        }
    }
}
