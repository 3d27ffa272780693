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

//! Deterministic generation of venue-issued identifiers.

use tradesim_model::identifiers::{PositionId, TradeId, Venue, VenueOrderId};

/// Generates venue order, trade and position IDs from monotonic counters.
///
/// Counters reset with the venue, keeping replays of identical inputs
/// byte-identical.
#[derive(Clone, Debug)]
pub struct IdsGenerator {
    venue: Venue,
    venue_order_id_count: u64,
    trade_id_count: u64,
    position_id_count: u64,
}

impl IdsGenerator {
    /// Creates a new [`IdsGenerator`] instance.
    #[must_use]
    pub const fn new(venue: Venue) -> Self {
        Self {
            venue,
            venue_order_id_count: 0,
            trade_id_count: 0,
            position_id_count: 0,
        }
    }

    /// Resets all counters.
    pub fn reset(&mut self) {
        self.venue_order_id_count = 0;
        self.trade_id_count = 0;
        self.position_id_count = 0;
    }

    /// Generates the next venue order ID.
    pub fn generate_venue_order_id(&mut self) -> VenueOrderId {
        self.venue_order_id_count += 1;
        VenueOrderId::new(self.venue_order_id_count.to_string())
    }

    /// Generates the next trade match ID.
    pub fn generate_trade_id(&mut self) -> TradeId {
        self.trade_id_count += 1;
        TradeId::new(self.trade_id_count.to_string())
    }

    /// Generates the next position ID, in the form `P-{venue}-{count}`.
    pub fn generate_position_id(&mut self) -> PositionId {
        self.position_id_count += 1;
        PositionId::new(format!("P-{}-{}", self.venue, self.position_id_count))
    }
}
