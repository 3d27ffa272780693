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

//! Events emitted by the venue, in exact causal order.

use serde::{Deserialize, Serialize};
use tradesim_core::UnixNanos;

pub mod account;
pub mod order;
pub mod position;

pub use crate::events::{
    account::AccountState,
    order::{
        OrderAccepted, OrderCancelRejected, OrderCanceled, OrderDenied, OrderEventAny,
        OrderExpired, OrderFilled, OrderModifyRejected, OrderRejected, OrderSubmitted,
        OrderTriggered, OrderUpdated,
    },
    position::{PositionChanged, PositionClosed, PositionEventAny, PositionOpened},
};

/// A sum type covering every event the venue can emit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventAny {
    /// An order lifecycle event.
    Order(OrderEventAny),
    /// A position lifecycle event.
    Position(PositionEventAny),
    /// An account state snapshot event.
    Account(AccountState),
}

impl EventAny {
    /// Returns the UNIX timestamp (nanoseconds) when the event occurred.
    #[must_use]
    pub fn ts_event(&self) -> UnixNanos {
        match self {
            Self::Order(event) => event.ts_event(),
            Self::Position(event) => event.ts_event(),
            Self::Account(event) => event.ts_event,
        }
    }
}
