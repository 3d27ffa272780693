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

//! Top-of-book state per instrument, and the set of working orders.

use ahash::AHashMap;
use indexmap::IndexMap;
use tradesim_core::UnixNanos;
use tradesim_model::{
    data::{QuoteTick, TradeTick},
    enums::OrderSideSpecified,
    identifiers::{ClientOrderId, InstrumentId},
    orders::Order,
    types::Price,
};

/// The current top-of-book state for a single instrument.
///
/// A trade tick collapses the book to the trade price (bid = ask = last),
/// which is the only depth a top-of-book simulation can honor.
#[derive(Clone, Debug)]
pub struct BookSideState {
    /// The instrument ID for the book state.
    pub instrument_id: InstrumentId,
    /// The current best bid price.
    pub bid: Option<Price>,
    /// The current best ask price.
    pub ask: Option<Price>,
    /// The last traded price.
    pub last: Option<Price>,
    /// UNIX timestamp (nanoseconds) of the last applied tick.
    pub ts_last: UnixNanos,
}

impl BookSideState {
    /// Creates a new [`BookSideState`] instance.
    #[must_use]
    pub fn new(instrument_id: InstrumentId) -> Self {
        Self {
            instrument_id,
            bid: None,
            ask: None,
            last: None,
            ts_last: UnixNanos::default(),
        }
    }

    /// Applies the given quote tick to the book state.
    pub fn apply_quote(&mut self, quote: &QuoteTick) {
        self.bid = Some(quote.bid_price);
        self.ask = Some(quote.ask_price);
        self.ts_last = quote.ts_event;
    }

    /// Applies the given trade tick to the book state.
    pub fn apply_trade(&mut self, trade: &TradeTick) {
        self.bid = Some(trade.price);
        self.ask = Some(trade.price);
        self.last = Some(trade.price);
        self.ts_last = trade.ts_event;
    }

    /// Returns `true` if market data has been seen for the aggressing side.
    #[must_use]
    pub const fn has_market(&self, side: OrderSideSpecified) -> bool {
        match side {
            OrderSideSpecified::Buy => self.ask.is_some(),
            OrderSideSpecified::Sell => self.bid.is_some(),
        }
    }

    /// Returns `true` if a limit order at `price` would cross the market as a
    /// taker.
    #[must_use]
    pub fn is_limit_crossed(&self, side: OrderSideSpecified, price: Price) -> bool {
        match side {
            OrderSideSpecified::Buy => self.ask.is_some_and(|a| a <= price),
            OrderSideSpecified::Sell => self.bid.is_some_and(|b| b >= price),
        }
    }

    /// Returns `true` if a resting limit order at `price` is matched by the
    /// market having traded to (or through) its level.
    #[must_use]
    pub fn is_limit_matched(&self, side: OrderSideSpecified, price: Price) -> bool {
        match side {
            OrderSideSpecified::Buy => self.bid.is_some_and(|b| b <= price),
            OrderSideSpecified::Sell => self.ask.is_some_and(|a| a >= price),
        }
    }

    /// Returns `true` if the market rests exactly on the given limit price
    /// without having traded through it.
    #[must_use]
    pub fn is_limit_at_touch(&self, side: OrderSideSpecified, price: Price) -> bool {
        match side {
            OrderSideSpecified::Buy => self.bid.is_some_and(|b| b == price),
            OrderSideSpecified::Sell => self.ask.is_some_and(|a| a == price),
        }
    }

    /// Returns `true` if a stop order trigger at `price` is breached.
    #[must_use]
    pub fn is_stop_triggered(&self, side: OrderSideSpecified, price: Price) -> bool {
        match side {
            OrderSideSpecified::Buy => self.ask.is_some_and(|a| a >= price),
            OrderSideSpecified::Sell => self.bid.is_some_and(|b| b <= price),
        }
    }

    /// Returns `true` if the market rests exactly on the given trigger price.
    #[must_use]
    pub fn is_stop_at_touch(&self, side: OrderSideSpecified, price: Price) -> bool {
        match side {
            OrderSideSpecified::Buy => self.ask.is_some_and(|a| a == price),
            OrderSideSpecified::Sell => self.bid.is_some_and(|b| b == price),
        }
    }
}

/// The set of currently-working orders, indexed by client order ID and by
/// instrument, preserving insertion order per instrument.
#[derive(Clone, Debug, Default)]
pub struct WorkingOrderBook {
    orders: IndexMap<ClientOrderId, Order>,
    by_instrument: AHashMap<InstrumentId, Vec<ClientOrderId>>,
}

impl WorkingOrderBook {
    /// Creates a new [`WorkingOrderBook`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of working orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Returns `true` if there are no working orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Returns `true` if the given client order ID is working.
    #[must_use]
    pub fn contains(&self, client_order_id: &ClientOrderId) -> bool {
        self.orders.contains_key(client_order_id)
    }

    /// Returns a reference to the working order with the given ID.
    #[must_use]
    pub fn get(&self, client_order_id: &ClientOrderId) -> Option<&Order> {
        self.orders.get(client_order_id)
    }

    /// Adds the given order to the working set.
    ///
    /// # Panics
    ///
    /// Panics if an order with the same client order ID is already working
    /// (the engine validates before insertion).
    pub fn add(&mut self, order: Order) {
        let client_order_id = order.client_order_id;
        let instrument_id = order.instrument_id;
        let existing = self.orders.insert(client_order_id, order);
        assert!(
            existing.is_none(),
            "Book invariant failed: order {client_order_id} already working",
        );
        self.by_instrument
            .entry(instrument_id)
            .or_default()
            .push(client_order_id);
    }

    /// Removes and returns the working order with the given ID.
    pub fn remove(&mut self, client_order_id: &ClientOrderId) -> Option<Order> {
        let order = self.orders.shift_remove(client_order_id)?;
        if let Some(ids) = self.by_instrument.get_mut(&order.instrument_id) {
            ids.retain(|id| id != client_order_id);
        }
        Some(order)
    }

    /// Returns the working client order IDs for the given instrument, in
    /// insertion order.
    #[must_use]
    pub fn client_order_ids_for(&self, instrument_id: &InstrumentId) -> Vec<ClientOrderId> {
        self.by_instrument
            .get(instrument_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns an iterator over all working orders in insertion order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Returns a snapshot of the working orders, indexed by client order ID.
    #[must_use]
    pub fn snapshot(&self) -> IndexMap<ClientOrderId, Order> {
        self.orders.clone()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tradesim_core::UnixNanos;
    use tradesim_model::{
        data::QuoteTick,
        enums::{OrderSide, TimeInForce},
        identifiers::{StrategyId, TraderId},
        types::Quantity,
    };

    use super::*;

    fn book_with_market(bid: &str, ask: &str) -> BookSideState {
        let mut book = BookSideState::new(InstrumentId::from("USD/JPY.SIM"));
        book.apply_quote(&QuoteTick::new(
            book.instrument_id,
            Price::from(bid),
            Price::from(ask),
            Quantity::from(100_000),
            Quantity::from(100_000),
            UnixNanos::from(1),
            UnixNanos::from(1),
        ));
        book
    }

    fn limit_order(id: &str, instrument: &str, price: &str) -> Order {
        Order::limit(
            TraderId::default(),
            StrategyId::default(),
            InstrumentId::from(instrument),
            ClientOrderId::from(id),
            OrderSide::Buy,
            Quantity::from(100_000),
            Price::from(price),
            false,
            TimeInForce::Gtc,
            None,
            UnixNanos::default(),
        )
    }

    #[rstest]
    fn test_apply_quote_sets_top_of_book() {
        let book = book_with_market("90.002", "90.005");
        assert_eq!(book.bid, Some(Price::from("90.002")));
        assert_eq!(book.ask, Some(Price::from("90.005")));
        assert_eq!(book.ts_last, UnixNanos::from(1));
    }

    #[rstest]
    fn test_apply_trade_collapses_book() {
        let mut book = book_with_market("90.002", "90.005");
        book.apply_trade(&TradeTick::new(
            book.instrument_id,
            Price::from("90.003"),
            Quantity::from(1),
            tradesim_model::enums::AggressorSide::Buyer,
            tradesim_model::identifiers::TradeId::from("1"),
            UnixNanos::from(2),
            UnixNanos::from(2),
        ));
        assert_eq!(book.bid, Some(Price::from("90.003")));
        assert_eq!(book.ask, Some(Price::from("90.003")));
        assert_eq!(book.last, Some(Price::from("90.003")));
    }

    #[rstest]
    #[case(OrderSideSpecified::Buy, "90.005", true)] // at the ask
    #[case(OrderSideSpecified::Buy, "90.006", true)] // above the ask
    #[case(OrderSideSpecified::Buy, "90.004", false)] // below the ask
    #[case(OrderSideSpecified::Sell, "90.002", true)] // at the bid
    #[case(OrderSideSpecified::Sell, "90.001", true)] // below the bid
    #[case(OrderSideSpecified::Sell, "90.003", false)] // above the bid
    fn test_is_limit_crossed(
        #[case] side: OrderSideSpecified,
        #[case] price: &str,
        #[case] expected: bool,
    ) {
        let book = book_with_market("90.002", "90.005");
        assert_eq!(book.is_limit_crossed(side, Price::from(price)), expected);
    }

    #[rstest]
    #[case(OrderSideSpecified::Buy, "90.002", true)] // bid at limit
    #[case(OrderSideSpecified::Buy, "90.003", true)] // bid below limit
    #[case(OrderSideSpecified::Buy, "90.001", false)] // bid above limit
    #[case(OrderSideSpecified::Sell, "90.005", true)] // ask at limit
    #[case(OrderSideSpecified::Sell, "90.004", true)] // ask above limit
    #[case(OrderSideSpecified::Sell, "90.006", false)] // ask below limit
    fn test_is_limit_matched(
        #[case] side: OrderSideSpecified,
        #[case] price: &str,
        #[case] expected: bool,
    ) {
        let book = book_with_market("90.002", "90.005");
        assert_eq!(book.is_limit_matched(side, Price::from(price)), expected);
    }

    #[rstest]
    #[case(OrderSideSpecified::Buy, "90.005", true)] // trigger at ask
    #[case(OrderSideSpecified::Buy, "90.004", true)] // trigger below ask
    #[case(OrderSideSpecified::Buy, "90.006", false)] // trigger above ask
    #[case(OrderSideSpecified::Sell, "90.002", true)] // trigger at bid
    #[case(OrderSideSpecified::Sell, "90.003", true)] // trigger above bid
    #[case(OrderSideSpecified::Sell, "90.001", false)] // trigger below bid
    fn test_is_stop_triggered(
        #[case] side: OrderSideSpecified,
        #[case] price: &str,
        #[case] expected: bool,
    ) {
        let book = book_with_market("90.002", "90.005");
        assert_eq!(book.is_stop_triggered(side, Price::from(price)), expected);
    }

    #[rstest]
    fn test_working_orders_insertion_order() {
        let mut working = WorkingOrderBook::new();
        working.add(limit_order("O-1", "USD/JPY.SIM", "90.001"));
        working.add(limit_order("O-2", "USD/JPY.SIM", "90.000"));
        working.add(limit_order("O-3", "AUD/USD.SIM", "0.80000"));

        let ids = working.client_order_ids_for(&InstrumentId::from("USD/JPY.SIM"));
        assert_eq!(ids, vec![ClientOrderId::from("O-1"), ClientOrderId::from("O-2")]);
        assert_eq!(working.len(), 3);

        let removed = working.remove(&ClientOrderId::from("O-1")).unwrap();
        assert_eq!(removed.client_order_id, ClientOrderId::from("O-1"));
        assert_eq!(
            working.client_order_ids_for(&InstrumentId::from("USD/JPY.SIM")),
            vec![ClientOrderId::from("O-2")]
        );
    }

    #[rstest]
    #[should_panic(expected = "Book invariant failed: order O-1 already working")]
    fn test_duplicate_add_panics() {
        let mut working = WorkingOrderBook::new();
        working.add(limit_order("O-1", "USD/JPY.SIM", "90.001"));
        working.add(limit_order("O-1", "USD/JPY.SIM", "90.002"));
    }
}
