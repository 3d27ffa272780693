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

//! Represents a position in a market, opened and adjusted by order fills.

use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tradesim_core::UnixNanos;

use crate::{
    enums::{OrderSide, PositionSide},
    events::order::OrderFilled,
    identifiers::{AccountId, ClientOrderId, InstrumentId, PositionId, StrategyId, TradeId, TraderId},
    instruments::Instrument,
    types::{Currency, Money, Price, Quantity},
};

/// Represents a position in a market.
///
/// The position quantity is always non-negative with the direction expressed
/// by `side`; `side == FLAT` if and only if the quantity is zero. A reducing
/// fill must never exceed the open quantity (the ledger splits such fills
/// into a close and a re-open in the opposite direction).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// The position ID.
    pub id: PositionId,
    /// The trader ID associated with the position.
    pub trader_id: TraderId,
    /// The strategy ID associated with the position.
    pub strategy_id: StrategyId,
    /// The instrument ID for the position.
    pub instrument_id: InstrumentId,
    /// The account ID associated with the position.
    pub account_id: AccountId,
    /// The client order ID for the order which opened the position.
    pub opening_order_id: ClientOrderId,
    /// The client order ID for the order which closed the position.
    pub closing_order_id: Option<ClientOrderId>,
    /// The entry order side.
    pub entry: OrderSide,
    /// The current position side.
    pub side: PositionSide,
    /// The current signed quantity (positive for `LONG`, negative for `SHORT`).
    pub signed_qty: f64,
    /// The current open quantity.
    pub quantity: Quantity,
    /// The peak directional quantity reached by the position.
    pub peak_qty: Quantity,
    /// The cumulative quantity closed by reducing fills.
    pub closed_qty: Quantity,
    /// The contract multiplier.
    pub multiplier: Quantity,
    /// If the instrument costing is inverse.
    pub is_inverse: bool,
    /// The position quote currency.
    pub quote_currency: Currency,
    /// The position base currency.
    pub base_currency: Currency,
    /// The position settlement currency.
    pub settlement_currency: Currency,
    /// The average open price.
    pub avg_px_open: f64,
    /// The average closing price.
    pub avg_px_close: Option<f64>,
    /// The realized PnL for the position, net of accrued commissions in the
    /// settlement currency.
    pub realized_pnl: Option<Money>,
    /// The commissions accrued by the position, by currency.
    pub commissions: IndexMap<Currency, Money>,
    /// The venue trade match IDs of the position's fills.
    pub trade_ids: Vec<TradeId>,
    /// UNIX timestamp (nanoseconds) when the position was opened.
    pub ts_opened: UnixNanos,
    /// UNIX timestamp (nanoseconds) of the last fill.
    pub ts_last: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the position was closed.
    pub ts_closed: Option<UnixNanos>,
}

impl Position {
    /// Creates a new [`Position`] instance, opened by the given fill.
    ///
    /// # Panics
    ///
    /// Panics if the fill carries no position ID or a zero quantity.
    #[must_use]
    pub fn new(instrument: &Instrument, fill: &OrderFilled) -> Self {
        assert!(!fill.last_qty.is_zero(), "opening fill quantity was zero");
        let position_id = fill.position_id.expect("opening fill had no position ID");
        let side = match fill.order_side.as_specified() {
            crate::enums::OrderSideSpecified::Buy => PositionSide::Long,
            crate::enums::OrderSideSpecified::Sell => PositionSide::Short,
        };
        let signed_qty = fill.last_qty.as_f64() * side.sign();

        let mut position = Self {
            id: position_id,
            trader_id: fill.trader_id,
            strategy_id: fill.strategy_id,
            instrument_id: fill.instrument_id,
            account_id: fill.account_id,
            opening_order_id: fill.client_order_id,
            closing_order_id: None,
            entry: fill.order_side,
            side,
            signed_qty,
            quantity: fill.last_qty,
            peak_qty: fill.last_qty,
            closed_qty: Quantity::zero(fill.last_qty.precision),
            multiplier: instrument.multiplier,
            is_inverse: instrument.is_inverse,
            quote_currency: instrument.quote_currency,
            base_currency: instrument.base_currency,
            settlement_currency: instrument.settlement_currency,
            avg_px_open: fill.last_px.as_f64(),
            avg_px_close: None,
            realized_pnl: None,
            commissions: IndexMap::new(),
            trade_ids: vec![fill.trade_id],
            ts_opened: fill.ts_event,
            ts_last: fill.ts_event,
            ts_closed: None,
        };
        position.accrue_commission(fill.commission);
        position
    }

    /// Applies the given fill to this position, returning the realized price
    /// PnL of the reduced portion (gross of commissions) for a reducing fill.
    ///
    /// # Panics
    ///
    /// Panics if a reducing fill exceeds the open quantity (the ledger must
    /// split such fills), or if the position is already closed.
    pub fn apply(&mut self, fill: &OrderFilled) -> Option<Money> {
        assert!(
            self.ts_closed.is_none(),
            "Position invariant failed: fill applied to closed position {}",
            self.id,
        );
        self.trade_ids.push(fill.trade_id);
        self.accrue_commission(fill.commission);
        self.ts_last = fill.ts_event;

        let fill_qty = fill.last_qty.as_f64();
        let fill_px = fill.last_px.as_f64();
        let is_increasing = match fill.order_side.as_specified() {
            crate::enums::OrderSideSpecified::Buy => self.side == PositionSide::Long,
            crate::enums::OrderSideSpecified::Sell => self.side == PositionSide::Short,
        };

        if is_increasing {
            let open_qty = self.quantity.as_f64();
            self.avg_px_open =
                (self.avg_px_open * open_qty + fill_px * fill_qty) / (open_qty + fill_qty);
            self.quantity += fill.last_qty;
            self.signed_qty = self.quantity.as_f64() * self.side.sign();
            if self.quantity > self.peak_qty {
                self.peak_qty = self.quantity;
            }
            return None;
        }

        assert!(
            fill.last_qty <= self.quantity,
            "Position invariant failed: reducing fill {} exceeded open quantity {}",
            fill.last_qty,
            self.quantity,
        );

        let pnl = self.calculate_pnl(self.avg_px_open, fill_px, fill.last_qty);
        self.realized_pnl = Some(match self.realized_pnl {
            Some(realized) => realized + pnl,
            None => pnl,
        });

        let closed_qty = self.closed_qty.as_f64();
        self.avg_px_close = Some(match self.avg_px_close {
            Some(avg) => (avg * closed_qty + fill_px * fill_qty) / (closed_qty + fill_qty),
            None => fill_px,
        });
        self.closed_qty += fill.last_qty;
        self.quantity -= fill.last_qty;
        self.signed_qty = self.quantity.as_f64() * self.side.sign();

        if self.quantity.is_zero() {
            self.side = PositionSide::Flat;
            self.signed_qty = 0.0;
            self.closing_order_id = Some(fill.client_order_id);
            self.ts_closed = Some(fill.ts_event);
        }

        Some(pnl)
    }

    fn accrue_commission(&mut self, commission: Option<Money>) {
        let Some(commission) = commission else {
            return;
        };
        self.commissions
            .entry(commission.currency)
            .and_modify(|total| *total += commission)
            .or_insert(commission);
        if commission.currency == self.settlement_currency {
            let realized = self
                .realized_pnl
                .unwrap_or_else(|| Money::zero(self.settlement_currency));
            self.realized_pnl = Some(realized - commission);
        }
    }

    /// Calculates the PnL for the given quantity between two prices.
    ///
    /// Inverse instruments produce PnL in the base currency with prices
    /// entering reciprocally; linear instruments in the quote currency.
    #[must_use]
    pub fn calculate_pnl(&self, avg_px_open: f64, avg_px_close: f64, quantity: Quantity) -> Money {
        let qty = quantity.as_f64() * self.multiplier.as_f64();
        if self.is_inverse {
            let amount = qty * (1.0 / avg_px_open - 1.0 / avg_px_close) * self.side.sign();
            Money::new(amount, self.base_currency)
        } else {
            let amount = qty * (avg_px_close - avg_px_open) * self.side.sign();
            Money::new(amount, self.quote_currency)
        }
    }

    /// Returns the unrealized PnL at the given market price.
    #[must_use]
    pub fn unrealized_pnl(&self, last_px: Price) -> Money {
        if self.side == PositionSide::Flat {
            Money::zero(self.settlement_currency)
        } else {
            self.calculate_pnl(self.avg_px_open, last_px.as_f64(), self.quantity)
        }
    }

    /// Returns the sum of realized and unrealized PnL at the given market price.
    #[must_use]
    pub fn total_pnl(&self, last_px: Price) -> Money {
        let unrealized = self.unrealized_pnl(last_px);
        match self.realized_pnl {
            Some(realized) => realized + unrealized,
            None => unrealized,
        }
    }

    /// Returns the accrued commissions as a list of money values.
    #[must_use]
    pub fn commissions(&self) -> Vec<Money> {
        self.commissions.values().copied().collect()
    }

    /// Returns `true` if the position is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.ts_closed.is_none()
    }

    /// Returns `true` if the position is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.ts_closed.is_some()
    }

    /// Returns `true` if the position side is `LONG`.
    #[must_use]
    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }

    /// Returns `true` if the position side is `SHORT`.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.side == PositionSide::Short
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({} {} {}, id={})",
            stringify!(Position),
            self.side,
            self.quantity,
            self.instrument_id,
            self.id,
        )
    }
}
