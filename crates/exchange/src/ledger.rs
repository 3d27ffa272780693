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

//! The ledger of open and closed positions, with flip semantics.

use indexmap::IndexMap;
use tradesim_core::{UUID4, UnixNanos};
use tradesim_model::{
    enums::OrderSideSpecified,
    events::{OrderFilled, PositionChanged, PositionClosed, PositionEventAny, PositionOpened},
    identifiers::PositionId,
    instruments::Instrument,
    position::Position,
    types::Money,
};

/// The effects of applying a fill to the ledger.
///
/// `events` are in causal order; `postings` are the signed account balance
/// adjustments (commission debits and realized price PnL credits).
#[derive(Clone, Debug, Default)]
pub struct FillOutcome {
    /// The position events caused by the fill, in causal order.
    pub events: Vec<PositionEventAny>,
    /// The signed account balance adjustments caused by the fill.
    pub postings: Vec<Money>,
}

/// The ledger of positions by ID, applying fills with flip semantics.
///
/// A reducing fill exceeding the open quantity closes the position with
/// exactly its remaining quantity at the fill price, then opens a new
/// position in the opposite direction with the remainder under a freshly
/// minted position ID. Commission is split proportionally across the legs.
#[derive(Clone, Debug, Default)]
pub struct PositionLedger {
    open: IndexMap<PositionId, Position>,
    closed: Vec<Position>,
}

impl PositionLedger {
    /// Creates a new [`PositionLedger`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the open position with the given ID.
    #[must_use]
    pub fn position(&self, position_id: &PositionId) -> Option<&Position> {
        self.open.get(position_id)
    }

    /// Returns all open positions in opening order.
    #[must_use]
    pub fn positions_open(&self) -> Vec<&Position> {
        self.open.values().collect()
    }

    /// Returns all closed positions in closing order.
    #[must_use]
    pub fn positions_closed(&self) -> Vec<&Position> {
        self.closed.iter().collect()
    }

    /// Applies the given fill to the ledger.
    ///
    /// # Panics
    ///
    /// Panics if the fill carries no position ID (the engine resolves one for
    /// every fill).
    pub fn apply_fill(
        &mut self,
        fill: &OrderFilled,
        instrument: &Instrument,
        ts_init: UnixNanos,
    ) -> FillOutcome {
        let position_id = fill.position_id.expect("fill had no position ID");
        let mut outcome = FillOutcome::default();

        if let Some(commission) = fill.commission {
            outcome.postings.push(-commission);
        }

        let Some(position) = self.open.get_mut(&position_id) else {
            let position = Position::new(instrument, fill);
            outcome.events.push(PositionEventAny::Opened(PositionOpened::create(
                &position,
                fill,
                UUID4::new(),
                ts_init,
            )));
            self.open.insert(position_id, position);
            return outcome;
        };

        let is_reducing = match fill.order_side.as_specified() {
            OrderSideSpecified::Buy => position.is_short(),
            OrderSideSpecified::Sell => position.is_long(),
        };

        if is_reducing && fill.last_qty > position.quantity {
            self.flip_position(fill, instrument, ts_init, &mut outcome);
            return outcome;
        }

        if let Some(pnl) = position.apply(fill) {
            outcome.postings.push(pnl);
        }

        if position.is_closed() {
            outcome.events.push(PositionEventAny::Closed(PositionClosed::create(
                position,
                fill,
                UUID4::new(),
                ts_init,
            )));
            let closed = self
                .open
                .shift_remove(&position_id)
                .expect("position was just borrowed from the open map");
            self.closed.push(closed);
        } else {
            outcome.events.push(PositionEventAny::Changed(PositionChanged::create(
                position,
                fill,
                UUID4::new(),
                ts_init,
            )));
        }

        outcome
    }

    fn flip_position(
        &mut self,
        fill: &OrderFilled,
        instrument: &Instrument,
        ts_init: UnixNanos,
        outcome: &mut FillOutcome,
    ) {
        let position_id = fill.position_id.expect("fill had no position ID");
        let position = self
            .open
            .get_mut(&position_id)
            .expect("flip requires an open position");

        let close_qty = position.quantity;
        let open_qty = fill.last_qty - close_qty;
        let close_ratio = close_qty.as_f64() / fill.last_qty.as_f64();

        // Split commission proportionally, keeping the sum exact
        let (close_commission, open_commission) = match fill.commission {
            Some(commission) => {
                let close_leg = Money::new(commission.as_f64() * close_ratio, commission.currency);
                (Some(close_leg), Some(commission - close_leg))
            }
            None => (None, None),
        };

        let close_fill = OrderFilled {
            last_qty: close_qty,
            commission: close_commission,
            ..*fill
        };
        if let Some(pnl) = position.apply(&close_fill) {
            outcome.postings.push(pnl);
        }
        assert!(position.is_closed(), "flip close leg must flatten the position");
        outcome.events.push(PositionEventAny::Closed(PositionClosed::create(
            position,
            &close_fill,
            UUID4::new(),
            ts_init,
        )));
        let closed = self
            .open
            .shift_remove(&position_id)
            .expect("position was just borrowed from the open map");
        self.closed.push(closed);

        // Open the remainder in the opposite direction under a fresh ID
        let flipped_id = PositionId::new(format!("{position_id}F"));
        let open_fill = OrderFilled {
            last_qty: open_qty,
            position_id: Some(flipped_id),
            commission: open_commission,
            ..*fill
        };
        let flipped = Position::new(instrument, &open_fill);
        outcome.events.push(PositionEventAny::Opened(PositionOpened::create(
            &flipped,
            &open_fill,
            UUID4::new(),
            ts_init,
        )));
        self.open.insert(flipped_id, flipped);

        log::debug!("Flipped position {position_id} into {flipped_id}");
    }
}
