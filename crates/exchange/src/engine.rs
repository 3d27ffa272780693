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

//! The simulated venue matching engine.
//!
//! The engine owns all venue state (instruments, book states, working orders,
//! brackets, positions, account) and is driven by market ticks and trading
//! commands. Every operation returns only after all consequent events have
//! been emitted to the bus, in exact causal order.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use tradesim_core::{
    UUID4, UnixNanos,
    correctness::{FAILED, check_equal},
};
use tradesim_model::{
    accounts::Account,
    data::{QuoteTick, TradeTick},
    enums::{LiquiditySide, OrderSideSpecified, OrderStatus, RejectReason, OmsType, TimeInForce},
    events::{
        EventAny, OrderAccepted, OrderCancelRejected, OrderCanceled, OrderDenied, OrderEventAny,
        OrderExpired, OrderFilled, OrderModifyRejected, OrderRejected, OrderSubmitted,
        OrderTriggered, OrderUpdated,
    },
    identifiers::{ClientOrderId, InstrumentId, PositionId, VenueOrderId},
    instruments::Instrument,
    orders::{Order, OrderKind},
    position::Position,
    types::{Currency, Money, Price, Quantity},
};
use ustr::Ustr;

use crate::{
    book::{BookSideState, WorkingOrderBook},
    brackets::BracketManager,
    bus::EventBus,
    clock::Clock,
    config::ExchangeConfig,
    ids::IdsGenerator,
    ledger::PositionLedger,
    messages::{CancelOrder, ModifyOrder, SubmitBracket, TradingCommand},
    models::{FeeModel, FeeModelAny, FillModel},
};

/// A deterministic matching engine simulating a single venue.
pub struct MatchingEngine {
    config: ExchangeConfig,
    instruments: AHashMap<InstrumentId, Instrument>,
    books: AHashMap<InstrumentId, BookSideState>,
    working: WorkingOrderBook,
    brackets: BracketManager,
    ledger: PositionLedger,
    account: Account,
    margin_currencies: AHashSet<Currency>,
    fill_model: FillModel,
    fee_model: FeeModelAny,
    ids: IdsGenerator,
    seen_order_ids: AHashSet<ClientOrderId>,
    message_queue: VecDeque<TradingCommand>,
    clock: Rc<RefCell<dyn Clock>>,
    bus: Rc<RefCell<dyn EventBus>>,
}

impl MatchingEngine {
    /// Creates a new [`MatchingEngine`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured starting balances are empty.
    pub fn new(
        config: ExchangeConfig,
        fill_model: FillModel,
        fee_model: FeeModelAny,
        clock: Rc<RefCell<dyn Clock>>,
        bus: Rc<RefCell<dyn EventBus>>,
    ) -> anyhow::Result<Self> {
        let account = Account::new(
            config.account_id,
            config.starting_balances.clone(),
            config.is_frozen_account,
        )?;
        let margin_currencies = config
            .starting_balances
            .iter()
            .map(|money| money.currency)
            .collect();
        let ids = IdsGenerator::new(config.venue);

        Ok(Self {
            config,
            instruments: AHashMap::new(),
            books: AHashMap::new(),
            working: WorkingOrderBook::new(),
            brackets: BracketManager::new(),
            ledger: PositionLedger::new(),
            account,
            margin_currencies,
            fill_model,
            fee_model,
            ids,
            seen_order_ids: AHashSet::new(),
            message_queue: VecDeque::new(),
            clock,
            bus,
        })
    }

    /// Registers the given instrument with the venue.
    ///
    /// # Errors
    ///
    /// Returns an error if the instrument venue does not match this venue.
    ///
    /// # Panics
    ///
    /// Panics if the venue equality check fails.
    pub fn register_instrument(&mut self, instrument: Instrument) -> anyhow::Result<()> {
        check_equal(
            instrument.id.venue,
            self.config.venue,
            "Venue of instrument id",
            "Venue of simulated exchange",
        )
        .expect(FAILED);

        self.books
            .insert(instrument.id, BookSideState::new(instrument.id));
        self.instruments.insert(instrument.id, instrument);
        log::info!("Registered instrument {}", instrument.id);
        Ok(())
    }

    /// Emits the initial account state snapshot.
    pub fn initialize_account(&mut self) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let snapshot = self.account.snapshot(true, ts_now, ts_now);
        self.bus.borrow_mut().publish(EventAny::Account(snapshot));
    }

    /// Replaces the venue fill model.
    pub fn set_fill_model(&mut self, fill_model: FillModel) {
        log::info!("Setting fill model for {} to {fill_model}", self.config.venue);
        self.fill_model = fill_model;
    }

    /// Returns the venue account.
    #[must_use]
    pub const fn account(&self) -> &Account {
        &self.account
    }

    /// Returns the venue position ledger.
    #[must_use]
    pub const fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Returns the current best bid price for the given instrument.
    #[must_use]
    pub fn best_bid_price(&self, instrument_id: InstrumentId) -> Option<Price> {
        self.books.get(&instrument_id).and_then(|book| book.bid)
    }

    /// Returns the current best ask price for the given instrument.
    #[must_use]
    pub fn best_ask_price(&self, instrument_id: InstrumentId) -> Option<Price> {
        self.books.get(&instrument_id).and_then(|book| book.ask)
    }

    /// Returns a snapshot of the working orders, indexed by client order ID.
    #[must_use]
    pub fn get_working_orders(&self) -> IndexMap<ClientOrderId, Order> {
        self.working.snapshot()
    }

    /// Returns the open position with the given ID.
    #[must_use]
    pub fn position(&self, position_id: &PositionId) -> Option<&Position> {
        self.ledger.position(position_id)
    }

    /// Logs all still-working orders and dormant bracket children.
    ///
    /// Never modifies state.
    pub fn check_residuals(&self) {
        log::info!("Checking residuals for {}", self.config.venue);
        for order in self.working.orders() {
            log::warn!("Residual working order {order}");
        }
        for child in self.brackets.dormant_orders() {
            log::warn!("Residual dormant bracket child {child}");
        }
    }

    /// Applies the given adjustment to the account and emits the new state.
    pub fn adjust_account(&mut self, adjustment: Money) {
        if self.account.is_frozen {
            // Nothing to adjust
            return;
        }
        self.account.adjust(adjustment);
        let ts_now = self.clock.borrow().timestamp_ns();
        let snapshot = self.account.snapshot(true, ts_now, ts_now);
        self.bus.borrow_mut().publish(EventAny::Account(snapshot));
    }

    // -- COMMAND SINK ----------------------------------------------------------------------------

    /// Enqueues the given trading command.
    pub fn send(&mut self, command: TradingCommand) {
        self.message_queue.push_back(command);
    }

    /// Processes all enqueued trading commands in FIFO order.
    pub fn process(&mut self, _ts_now: UnixNanos) {
        while let Some(command) = self.message_queue.pop_front() {
            match command {
                TradingCommand::SubmitOrder(command) => {
                    self.submit_order(command.order, command.position_id);
                }
                TradingCommand::SubmitBracket(command) => self.submit_bracket(command),
                TradingCommand::ModifyOrder(command) => self.modify_order(&command),
                TradingCommand::CancelOrder(command) => self.cancel_order(&command),
            }
        }
    }

    // -- DATA PROCESSING -------------------------------------------------------------------------

    /// Processes the venue market for the given quote tick.
    ///
    /// # Panics
    ///
    /// Panics if no instrument is registered for the tick.
    pub fn process_quote_tick(&mut self, quote: &QuoteTick) {
        log::debug!("Processing {quote}");
        let book = self
            .books
            .get_mut(&quote.instrument_id)
            .unwrap_or_else(|| panic!("No book initialized for {}", quote.instrument_id));
        book.apply_quote(quote);
        self.iterate(quote.instrument_id, quote.ts_event);
    }

    /// Processes the venue market for the given trade tick.
    ///
    /// # Panics
    ///
    /// Panics if no instrument is registered for the tick.
    pub fn process_trade_tick(&mut self, trade: &TradeTick) {
        log::debug!("Processing {trade}");
        let book = self
            .books
            .get_mut(&trade.instrument_id)
            .unwrap_or_else(|| panic!("No book initialized for {}", trade.instrument_id));
        book.apply_trade(trade);
        self.iterate(trade.instrument_id, trade.ts_event);
    }

    // -- TRADING COMMANDS ------------------------------------------------------------------------

    /// Submits the given order, validating and potentially matching it
    /// against the current top-of-book.
    pub fn submit_order(&mut self, mut order: Order, position_id: Option<PositionId>) {
        let ts_now = self.clock.borrow().timestamp_ns();

        if !self.seen_order_ids.insert(order.client_order_id) {
            let client_order_id = order.client_order_id;
            self.generate_order_denied(
                &mut order,
                format!(
                    "{}: order {} already submitted",
                    RejectReason::DuplicateClientOrderId,
                    client_order_id
                ),
                ts_now,
            );
            return;
        }

        if position_id.is_some() {
            order.position_id = position_id;
        }

        self.generate_order_submitted(&mut order, ts_now);
        self.process_submitted_order(order, ts_now);
    }

    /// Submits a bracket order family: the entry through the normal path,
    /// with the stop-loss and take-profit children held dormant until the
    /// entry fills.
    pub fn submit_bracket(&mut self, command: SubmitBracket) {
        let ts_now = self.clock.borrow().timestamp_ns();
        let mut entry = command.entry;

        for client_order_id in [
            entry.client_order_id,
            command.stop_loss_client_order_id,
            command.take_profit_client_order_id,
        ] {
            if !self.seen_order_ids.insert(client_order_id) {
                self.generate_order_denied(
                    &mut entry,
                    format!(
                        "{}: order {} already submitted",
                        RejectReason::DuplicateClientOrderId,
                        client_order_id
                    ),
                    ts_now,
                );
                return;
            }
        }

        let child_side = entry.order_side_specified().opposite().as_order_side();
        let mut stop_loss = Order::stop_market(
            entry.trader_id,
            entry.strategy_id,
            entry.instrument_id,
            command.stop_loss_client_order_id,
            child_side,
            entry.quantity,
            command.stop_loss_price,
            TimeInForce::Gtc,
            None,
            ts_now,
        );
        let mut take_profit = Order::limit(
            entry.trader_id,
            entry.strategy_id,
            entry.instrument_id,
            command.take_profit_client_order_id,
            child_side,
            entry.quantity,
            command.take_profit_price,
            false,
            TimeInForce::Gtc,
            None,
            ts_now,
        );

        entry.order_list_id = Some(command.order_list_id);
        entry.linked_order_ids = Some(vec![
            stop_loss.client_order_id,
            take_profit.client_order_id,
        ]);
        let stop_loss_id = stop_loss.client_order_id;
        let take_profit_id = take_profit.client_order_id;
        for (child, sibling_id) in [
            (&mut stop_loss, take_profit_id),
            (&mut take_profit, stop_loss_id),
        ] {
            child.parent_order_id = Some(entry.client_order_id);
            child.order_list_id = Some(command.order_list_id);
            child.linked_order_ids = Some(vec![sibling_id]);
        }

        self.generate_order_submitted(&mut entry, ts_now);
        self.generate_order_submitted(&mut stop_loss, ts_now);
        self.generate_order_submitted(&mut take_profit, ts_now);

        if self.config.support_contingent_orders {
            self.brackets
                .register(entry.client_order_id, stop_loss, take_profit);
        }

        self.process_submitted_order(entry, ts_now);
    }

    /// Amends a working order per the given command, re-validating against
    /// the current market before applying atomically.
    pub fn modify_order(&mut self, command: &ModifyOrder) {
        let ts_now = self.clock.borrow().timestamp_ns();

        let Some(order) = self.working.get(&command.client_order_id) else {
            self.generate_order_modify_rejected(
                command,
                format!(
                    "{}: order {} not found",
                    RejectReason::OrderNotFound,
                    command.client_order_id
                ),
                None,
                ts_now,
            );
            return;
        };
        let order = order.clone();

        // A zero or equal value is the sentinel for "do not change this field"
        let new_qty = command
            .quantity
            .filter(|qty| !qty.is_zero() && *qty != order.quantity);
        let new_price = command.price.filter(|price| Some(*price) != order.price());
        let new_trigger = command
            .trigger_price
            .filter(|trigger| Some(*trigger) != order.trigger_price());

        if new_qty.is_none() && new_price.is_none() && new_trigger.is_none() {
            self.generate_order_modify_rejected(
                command,
                format!(
                    "{}: amendment for {} changed no fields",
                    RejectReason::ZeroAmendment,
                    command.client_order_id
                ),
                order.venue_order_id,
                ts_now,
            );
            return;
        }

        if let Err(reason) = self.validate_amendment(&order, new_qty, new_price, new_trigger) {
            self.generate_order_modify_rejected(command, reason, order.venue_order_id, ts_now);
            return;
        }

        self.apply_amendment(order, new_qty, new_price, new_trigger, ts_now);
    }

    /// Cancels a working order per the given command.
    ///
    /// Bracket children are canceled with the parent, and an OCO sibling
    /// with its pair.
    pub fn cancel_order(&mut self, command: &CancelOrder) {
        let ts_now = self.clock.borrow().timestamp_ns();
        match self.working.remove(&command.client_order_id) {
            Some(mut order) => {
                self.generate_order_canceled(&mut order, ts_now);
                self.cancel_contingencies_for(&order, ts_now);
            }
            None => {
                self.generate_order_cancel_rejected(
                    command,
                    format!(
                        "{}: order {} not found",
                        RejectReason::OrderNotFound,
                        command.client_order_id
                    ),
                    ts_now,
                );
            }
        }
    }

    // -- VALIDATION ------------------------------------------------------------------------------

    fn validate_submission(&self, order: &Order) -> Result<(), String> {
        let Some(instrument) = self.instruments.get(&order.instrument_id) else {
            return Err(format!(
                "{}: no instrument registered for {}",
                RejectReason::InstrumentUnknown,
                order.instrument_id
            ));
        };

        if order.quantity.precision != instrument.size_precision
            || order.quantity < instrument.min_quantity
            || order.quantity > instrument.max_quantity
        {
            return Err(format!(
                "{}: quantity {} outside [{}, {}] for {}",
                RejectReason::QuantityOutOfBounds,
                order.quantity,
                instrument.min_quantity,
                instrument.max_quantity,
                instrument.id
            ));
        }

        for price in [order.price(), order.trigger_price()].into_iter().flatten() {
            if price.precision != instrument.price_precision
                || !instrument.is_price_aligned(price)
            {
                return Err(format!(
                    "{}: price {price} not aligned to tick size {} for {}",
                    RejectReason::PriceInvalid,
                    instrument.price_increment,
                    instrument.id
                ));
            }
        }

        let book = self
            .books
            .get(&order.instrument_id)
            .expect("book exists for every registered instrument");
        let side = order.order_side_specified();

        if !matches!(order.kind, OrderKind::Limit { .. }) && !book.has_market(side) {
            return Err(format!(
                "{}: no market for {}",
                RejectReason::NoMarket,
                order.instrument_id
            ));
        }

        match order.kind {
            OrderKind::Limit { price, post_only } => {
                if post_only && book.is_limit_crossed(side, price) {
                    return Err(format!(
                        "{}: POST_ONLY {} {} order limit px of {price} would have been a TAKER: bid={}, ask={}",
                        RejectReason::PostOnlyWouldCross,
                        order.order_type(),
                        order.side,
                        book.bid.map_or("None".to_string(), |p| p.to_string()),
                        book.ask.map_or("None".to_string(), |p| p.to_string()),
                    ));
                }
            }
            OrderKind::StopMarket { trigger_price }
            | OrderKind::StopLimit { trigger_price, .. } => {
                if self.config.reject_stop_orders && book.is_stop_triggered(side, trigger_price) {
                    return Err(format!(
                        "{}: {} {} order stop px of {trigger_price} was in the market: bid={}, ask={}",
                        RejectReason::StopInsideMarket,
                        order.order_type(),
                        order.side,
                        book.bid.map_or("None".to_string(), |p| p.to_string()),
                        book.ask.map_or("None".to_string(), |p| p.to_string()),
                    ));
                }
            }
            OrderKind::Market => {}
        }

        self.validate_margin(order, instrument, book)
    }

    fn validate_margin(
        &self,
        order: &Order,
        instrument: &Instrument,
        book: &BookSideState,
    ) -> Result<(), String> {
        if !self.margin_currencies.contains(&instrument.settlement_currency) {
            return Ok(());
        }
        let Some(balance) = self.account.balance(instrument.settlement_currency) else {
            return Ok(());
        };
        let est_price = match order.kind {
            OrderKind::Market => match order.order_side_specified() {
                OrderSideSpecified::Buy => book.ask,
                OrderSideSpecified::Sell => book.bid,
            },
            OrderKind::Limit { price, .. } => Some(price),
            OrderKind::StopMarket { trigger_price }
            | OrderKind::StopLimit { trigger_price, .. } => Some(trigger_price),
        };
        let Some(est_price) = est_price else {
            return Ok(());
        };
        let required = instrument.calculate_notional_value(order.quantity, est_price);
        if required > balance.free {
            return Err(format!(
                "{}: notional {required} exceeds free balance {}",
                RejectReason::InsufficientMargin,
                balance.free
            ));
        }
        Ok(())
    }

    fn validate_amendment(
        &self,
        order: &Order,
        new_qty: Option<Quantity>,
        new_price: Option<Price>,
        new_trigger: Option<Price>,
    ) -> Result<(), String> {
        let instrument = self
            .instruments
            .get(&order.instrument_id)
            .expect("working orders reference registered instruments");
        let book = self
            .books
            .get(&order.instrument_id)
            .expect("book exists for every registered instrument");
        let side = order.order_side_specified();

        if let Some(quantity) = new_qty {
            if quantity.precision != instrument.size_precision
                || quantity < instrument.min_quantity
                || quantity > instrument.max_quantity
                || quantity < order.filled_qty
            {
                return Err(format!(
                    "{}: new quantity {quantity} invalid for {}",
                    RejectReason::QuantityOutOfBounds,
                    order.client_order_id
                ));
            }
        }

        for price in [new_price, new_trigger].into_iter().flatten() {
            if price.precision != instrument.price_precision
                || !instrument.is_price_aligned(price)
            {
                return Err(format!(
                    "{}: price {price} not aligned to tick size {} for {}",
                    RejectReason::PriceInvalid,
                    instrument.price_increment,
                    instrument.id
                ));
            }
        }

        match order.kind {
            OrderKind::Limit { price, post_only } => {
                let price = new_price.unwrap_or(price);
                if post_only && book.is_limit_crossed(side, price) {
                    return Err(format!(
                        "{}: POST_ONLY {} {} order with new limit px of {price} would have been a TAKER: bid={}, ask={}",
                        RejectReason::PostOnlyWouldCross,
                        order.order_type(),
                        order.side,
                        book.bid.map_or("None".to_string(), |p| p.to_string()),
                        book.ask.map_or("None".to_string(), |p| p.to_string()),
                    ));
                }
            }
            OrderKind::StopMarket { trigger_price } => {
                let trigger_price = new_trigger.unwrap_or(trigger_price);
                if book.is_stop_triggered(side, trigger_price) {
                    return Err(format!(
                        "{}: {} {} order new stop px of {trigger_price} was in the market: bid={}, ask={}",
                        RejectReason::StopInsideMarket,
                        order.order_type(),
                        order.side,
                        book.bid.map_or("None".to_string(), |p| p.to_string()),
                        book.ask.map_or("None".to_string(), |p| p.to_string()),
                    ));
                }
            }
            OrderKind::StopLimit {
                price,
                trigger_price,
                post_only,
                is_triggered,
            } => {
                if is_triggered {
                    // Only price and quantity may change once triggered
                    let price = new_price.unwrap_or(price);
                    if post_only && book.is_limit_crossed(side, price) {
                        return Err(format!(
                            "{}: POST_ONLY {} {} order with new limit px of {price} would have been a TAKER: bid={}, ask={}",
                            RejectReason::PostOnlyWouldCross,
                            order.order_type(),
                            order.side,
                            book.bid.map_or("None".to_string(), |p| p.to_string()),
                            book.ask.map_or("None".to_string(), |p| p.to_string()),
                        ));
                    }
                } else {
                    let trigger_price = new_trigger.unwrap_or(trigger_price);
                    if book.is_stop_triggered(side, trigger_price) {
                        return Err(format!(
                            "{}: {} {} order new stop px of {trigger_price} was in the market: bid={}, ask={}",
                            RejectReason::StopInsideMarket,
                            order.order_type(),
                            order.side,
                            book.bid.map_or("None".to_string(), |p| p.to_string()),
                            book.ask.map_or("None".to_string(), |p| p.to_string()),
                        ));
                    }
                }
            }
            OrderKind::Market => {}
        }

        Ok(())
    }

    // -- ORDER PROCESSING ------------------------------------------------------------------------

    fn process_submitted_order(&mut self, mut order: Order, ts_now: UnixNanos) {
        if let Err(reason) = self.validate_submission(&order) {
            self.generate_order_rejected(&mut order, reason, ts_now);
            self.cancel_contingencies_for(&order, ts_now);
            return;
        }

        self.accept_order(&mut order, ts_now);

        let book = self
            .books
            .get(&order.instrument_id)
            .expect("book exists for every registered instrument")
            .clone();
        let instrument = *self
            .instruments
            .get(&order.instrument_id)
            .expect("instrument was validated");
        let side = order.order_side_specified();

        match order.kind {
            OrderKind::Market => {
                let touch = match side {
                    OrderSideSpecified::Buy => book.ask,
                    OrderSideSpecified::Sell => book.bid,
                }
                .expect("market order validated against market data");
                let fill_px = self.maybe_slip(side, touch, &instrument);
                self.fill_order(order, fill_px, LiquiditySide::Taker, ts_now);
            }
            OrderKind::Limit { price, .. } => {
                if book.is_limit_crossed(side, price) {
                    // Filling as liquidity taker
                    let fill_px = match side {
                        OrderSideSpecified::Buy => price.min(book.ask.unwrap_or(price)),
                        OrderSideSpecified::Sell => price.max(book.bid.unwrap_or(price)),
                    };
                    self.fill_order(order, fill_px, LiquiditySide::Taker, ts_now);
                } else if matches!(order.time_in_force, TimeInForce::Ioc | TimeInForce::Fok) {
                    self.generate_order_canceled(&mut order, ts_now);
                } else {
                    self.working.add(order);
                }
            }
            OrderKind::StopMarket { trigger_price } => {
                if !self.config.reject_stop_orders
                    && book.is_stop_triggered(side, trigger_price)
                {
                    let fill_px = self.maybe_slip(side, trigger_price, &instrument);
                    self.fill_order(order, fill_px, LiquiditySide::Taker, ts_now);
                } else {
                    self.working.add(order);
                }
            }
            OrderKind::StopLimit { .. } => {
                self.working.add(order);
            }
        }
    }

    /// Iterates the matching engine, attempting to progress every working
    /// order on the ticked instrument in insertion order.
    fn iterate(&mut self, instrument_id: InstrumentId, ts: UnixNanos) {
        for client_order_id in self.working.client_order_ids_for(&instrument_id) {
            if !self.working.contains(&client_order_id) {
                // Removed earlier in this step (e.g. an OCO sibling)
                continue;
            }

            // Check expiration before matching
            if self.config.support_gtd_orders {
                let order = self.working.get(&client_order_id).expect("just checked");
                if order.time_in_force == TimeInForce::Gtd
                    && order.expire_time.is_some_and(|expire| ts >= expire)
                {
                    let mut order = self.working.remove(&client_order_id).expect("just checked");
                    self.generate_order_expired(&mut order, ts);
                    self.cancel_contingencies_for(&order, ts);
                    continue;
                }
            }

            self.match_working_order(client_order_id, ts);
        }
    }

    fn match_working_order(&mut self, client_order_id: ClientOrderId, ts: UnixNanos) {
        let order = self
            .working
            .get(&client_order_id)
            .expect("order is working")
            .clone();
        let book = self
            .books
            .get(&order.instrument_id)
            .expect("book exists for every registered instrument")
            .clone();
        let instrument = *self
            .instruments
            .get(&order.instrument_id)
            .expect("working orders reference registered instruments");
        let side = order.order_side_specified();

        match order.kind {
            OrderKind::Limit { price, .. } => {
                if book.is_limit_matched(side, price) {
                    if book.is_limit_at_touch(side, price) && !self.fill_model.is_limit_filled() {
                        return;
                    }
                    let order = self.working.remove(&client_order_id).expect("order is working");
                    self.fill_order(order, price, LiquiditySide::Maker, ts);
                }
            }
            OrderKind::StopMarket { trigger_price } => {
                if book.is_stop_triggered(side, trigger_price) {
                    if book.is_stop_at_touch(side, trigger_price)
                        && !self.fill_model.is_stop_filled()
                    {
                        return;
                    }
                    let order = self.working.remove(&client_order_id).expect("order is working");
                    let fill_px = self.maybe_slip(side, trigger_price, &instrument);
                    self.fill_order(order, fill_px, LiquiditySide::Taker, ts);
                }
            }
            OrderKind::StopLimit {
                price,
                trigger_price,
                post_only,
                is_triggered,
            } => {
                if is_triggered {
                    // Equivalent to a resting limit order at `price`
                    if book.is_limit_matched(side, price) {
                        if book.is_limit_at_touch(side, price)
                            && !self.fill_model.is_limit_filled()
                        {
                            return;
                        }
                        let order =
                            self.working.remove(&client_order_id).expect("order is working");
                        self.fill_order(order, price, LiquiditySide::Maker, ts);
                    }
                } else if book.is_stop_triggered(side, trigger_price) {
                    if book.is_stop_at_touch(side, trigger_price)
                        && !self.fill_model.is_stop_filled()
                    {
                        return;
                    }
                    let mut order =
                        self.working.remove(&client_order_id).expect("order is working");
                    self.generate_order_triggered(&mut order, ts);

                    // Check for immediate fill of the now-effective limit
                    if book.is_limit_crossed(side, price) {
                        if post_only {
                            let order_type = order.order_type();
                            let order_side = order.side;
                            self.generate_order_rejected(
                                &mut order,
                                format!(
                                    "{}: POST_ONLY {} {} order limit px of {price} would have been a TAKER: bid={}, ask={}",
                                    RejectReason::PostOnlyWouldCross,
                                    order_type,
                                    order_side,
                                    book.bid.map_or("None".to_string(), |p| p.to_string()),
                                    book.ask.map_or("None".to_string(), |p| p.to_string()),
                                ),
                                ts,
                            );
                            self.cancel_contingencies_for(&order, ts);
                            return;
                        }
                        let fill_px = match side {
                            OrderSideSpecified::Buy => price.max(book.ask.unwrap_or(price)),
                            OrderSideSpecified::Sell => price.min(book.bid.unwrap_or(price)),
                        };
                        self.fill_order(order, fill_px, LiquiditySide::Taker, ts);
                        return;
                    }

                    self.working.add(order);
                }
            }
            OrderKind::Market => unreachable!("market orders never rest in the working book"),
        }
    }

    fn apply_amendment(
        &mut self,
        order: Order,
        new_qty: Option<Quantity>,
        new_price: Option<Price>,
        new_trigger: Option<Price>,
        ts_now: UnixNanos,
    ) {
        let mut order = self
            .working
            .remove(&order.client_order_id)
            .expect("amended order is working");
        let quantity = new_qty.unwrap_or(order.quantity);
        let book = self
            .books
            .get(&order.instrument_id)
            .expect("book exists for every registered instrument")
            .clone();
        let side = order.order_side_specified();

        // The trigger has already fired for a triggered stop-limit, trigger
        // changes are silently ignored
        let effective_trigger = if order.is_triggered() { None } else { new_trigger };

        self.generate_order_updated(&mut order, quantity, new_price, effective_trigger, ts_now);

        // Re-evaluate matching against the current top-of-book
        let limit_px = match order.kind {
            OrderKind::Limit { price, .. } => Some(price),
            OrderKind::StopLimit {
                price,
                is_triggered: true,
                ..
            } => Some(price),
            _ => None,
        };
        if let Some(price) = limit_px
            && book.is_limit_crossed(side, price)
        {
            let fill_px = match side {
                OrderSideSpecified::Buy => price.min(book.ask.unwrap_or(price)),
                OrderSideSpecified::Sell => price.max(book.bid.unwrap_or(price)),
            };
            self.fill_order(order, fill_px, LiquiditySide::Taker, ts_now);
            return;
        }

        self.working.add(order);
    }

    // -- FILLS -----------------------------------------------------------------------------------

    fn maybe_slip(
        &mut self,
        side: OrderSideSpecified,
        price: Price,
        instrument: &Instrument,
    ) -> Price {
        if self.fill_model.is_slipped() {
            match side {
                OrderSideSpecified::Buy => price + instrument.price_increment,
                OrderSideSpecified::Sell => price - instrument.price_increment,
            }
        } else {
            price
        }
    }

    fn resolve_position_id(&mut self, order: &Order) -> PositionId {
        match self.config.oms_type {
            OmsType::Netting => {
                PositionId::new(format!("{}-{}", order.instrument_id, order.strategy_id))
            }
            OmsType::Hedging => order.position_id.unwrap_or_else(|| {
                if self.config.generate_position_ids {
                    self.ids.generate_position_id()
                } else {
                    PositionId::new(format!("{}-{}", order.instrument_id, order.strategy_id))
                }
            }),
        }
    }

    fn fill_order(
        &mut self,
        mut order: Order,
        fill_px: Price,
        liquidity_side: LiquiditySide,
        ts: UnixNanos,
    ) {
        let instrument = *self
            .instruments
            .get(&order.instrument_id)
            .expect("filled orders reference registered instruments");

        order.liquidity_side = Some(liquidity_side);
        let fill_qty = order.leaves_qty;
        let commission = self
            .fee_model
            .get_commission(&order, fill_qty, fill_px, &instrument)
            .expect("liquidity side assigned prior to commission");
        let venue_order_id = order
            .venue_order_id
            .unwrap_or_else(|| self.ids.generate_venue_order_id());
        let position_id = self.resolve_position_id(&order);
        let trade_id = self.ids.generate_trade_id();

        let fill = OrderFilled::new(
            order.trader_id,
            order.strategy_id,
            order.instrument_id,
            order.client_order_id,
            venue_order_id,
            self.config.account_id,
            trade_id,
            order.side,
            order.order_type(),
            fill_qty,
            fill_px,
            instrument.quote_currency,
            liquidity_side,
            UUID4::new(),
            ts,
            ts,
            Some(position_id),
            Some(commission),
        );
        order
            .apply(&OrderEventAny::Filled(fill))
            .expect(FAILED);
        self.publish_order(OrderEventAny::Filled(fill));

        let outcome = self.ledger.apply_fill(&fill, &instrument, ts);
        for posting in &outcome.postings {
            self.account.adjust(*posting);
        }
        for event in outcome.events {
            self.bus.borrow_mut().publish(EventAny::Position(event));
        }
        let snapshot = self.account.snapshot(false, ts, ts);
        self.bus.borrow_mut().publish(EventAny::Account(snapshot));

        if self.config.support_contingent_orders {
            self.handle_contingencies_after_fill(&order, position_id, ts);
        }
    }

    fn handle_contingencies_after_fill(
        &mut self,
        order: &Order,
        position_id: PositionId,
        ts: UnixNanos,
    ) {
        if order.status != OrderStatus::Filled {
            return;
        }

        // Activate dormant bracket children on entry fill
        if let Some(children) = self.brackets.take_children(&order.client_order_id) {
            for mut child in children {
                child.position_id = Some(position_id);
                self.accept_order(&mut child, ts);
                self.working.add(child);
            }
        }

        // OCO: the fill of one child cancels its sibling
        if let Some(sibling_id) = self.brackets.sibling_of(&order.client_order_id) {
            self.brackets.unlink(&order.client_order_id);
            if let Some(mut sibling) = self.working.remove(&sibling_id) {
                self.generate_order_canceled(&mut sibling, ts);
            }
        }
    }

    fn cancel_contingencies_for(&mut self, order: &Order, ts: UnixNanos) {
        if !self.config.support_contingent_orders {
            return;
        }

        // Dormant children are canceled with a failed or canceled entry
        if let Some(children) = self.brackets.take_children(&order.client_order_id) {
            for mut child in children {
                self.brackets.unlink(&child.client_order_id);
                self.generate_order_canceled(&mut child, ts);
            }
        }

        // A canceled OCO child takes its working sibling with it
        if let Some(sibling_id) = self.brackets.sibling_of(&order.client_order_id) {
            self.brackets.unlink(&order.client_order_id);
            if let Some(mut sibling) = self.working.remove(&sibling_id) {
                self.generate_order_canceled(&mut sibling, ts);
            }
        }
    }

    // -- EVENT GENERATORS ------------------------------------------------------------------------

    fn publish_order(&self, event: OrderEventAny) {
        self.bus.borrow_mut().publish(EventAny::Order(event));
    }

    fn accept_order(&mut self, order: &mut Order, ts: UnixNanos) {
        let venue_order_id = self.ids.generate_venue_order_id();
        self.generate_order_accepted(order, venue_order_id, ts);
    }

    fn generate_order_submitted(&mut self, order: &mut Order, ts: UnixNanos) {
        let event = OrderSubmitted::new(
            order.trader_id,
            order.strategy_id,
            order.instrument_id,
            order.client_order_id,
            self.config.account_id,
            UUID4::new(),
            ts,
            ts,
        );
        order
            .apply(&OrderEventAny::Submitted(event))
            .expect(FAILED);
        self.publish_order(OrderEventAny::Submitted(event));
    }

    fn generate_order_denied(&mut self, order: &mut Order, reason: String, ts: UnixNanos) {
        let event = OrderDenied::new(
            order.trader_id,
            order.strategy_id,
            order.instrument_id,
            order.client_order_id,
            Ustr::from(reason.as_str()),
            UUID4::new(),
            ts,
            ts,
        );
        order.apply(&OrderEventAny::Denied(event)).expect(FAILED);
        self.publish_order(OrderEventAny::Denied(event));
    }

    fn generate_order_accepted(
        &mut self,
        order: &mut Order,
        venue_order_id: VenueOrderId,
        ts: UnixNanos,
    ) {
        let event = OrderAccepted::new(
            order.trader_id,
            order.strategy_id,
            order.instrument_id,
            order.client_order_id,
            venue_order_id,
            self.config.account_id,
            UUID4::new(),
            ts,
            ts,
        );
        order.apply(&OrderEventAny::Accepted(event)).expect(FAILED);
        self.publish_order(OrderEventAny::Accepted(event));
    }

    fn generate_order_rejected(&mut self, order: &mut Order, reason: String, ts: UnixNanos) {
        let event = OrderRejected::new(
            order.trader_id,
            order.strategy_id,
            order.instrument_id,
            order.client_order_id,
            self.config.account_id,
            Ustr::from(reason.as_str()),
            UUID4::new(),
            ts,
            ts,
        );
        order.apply(&OrderEventAny::Rejected(event)).expect(FAILED);
        self.publish_order(OrderEventAny::Rejected(event));
    }

    fn generate_order_canceled(&mut self, order: &mut Order, ts: UnixNanos) {
        let event = OrderCanceled::new(
            order.trader_id,
            order.strategy_id,
            order.instrument_id,
            order.client_order_id,
            UUID4::new(),
            ts,
            ts,
            order.venue_order_id,
            order.account_id,
        );
        order.apply(&OrderEventAny::Canceled(event)).expect(FAILED);
        self.publish_order(OrderEventAny::Canceled(event));
    }

    fn generate_order_expired(&mut self, order: &mut Order, ts: UnixNanos) {
        let event = OrderExpired::new(
            order.trader_id,
            order.strategy_id,
            order.instrument_id,
            order.client_order_id,
            UUID4::new(),
            ts,
            ts,
            order.venue_order_id,
            order.account_id,
        );
        order.apply(&OrderEventAny::Expired(event)).expect(FAILED);
        self.publish_order(OrderEventAny::Expired(event));
    }

    fn generate_order_triggered(&mut self, order: &mut Order, ts: UnixNanos) {
        let event = OrderTriggered::new(
            order.trader_id,
            order.strategy_id,
            order.instrument_id,
            order.client_order_id,
            UUID4::new(),
            ts,
            ts,
            order.venue_order_id,
            order.account_id,
        );
        order
            .apply(&OrderEventAny::Triggered(event))
            .expect(FAILED);
        self.publish_order(OrderEventAny::Triggered(event));
    }

    fn generate_order_updated(
        &mut self,
        order: &mut Order,
        quantity: Quantity,
        price: Option<Price>,
        trigger_price: Option<Price>,
        ts: UnixNanos,
    ) {
        let event = OrderUpdated::new(
            order.trader_id,
            order.strategy_id,
            order.instrument_id,
            order.client_order_id,
            quantity,
            UUID4::new(),
            ts,
            ts,
            order.venue_order_id,
            order.account_id,
            price,
            trigger_price,
        );
        order.apply(&OrderEventAny::Updated(event)).expect(FAILED);
        self.publish_order(OrderEventAny::Updated(event));
    }

    fn generate_order_modify_rejected(
        &mut self,
        command: &ModifyOrder,
        reason: String,
        venue_order_id: Option<VenueOrderId>,
        ts: UnixNanos,
    ) {
        let event = OrderModifyRejected::new(
            command.trader_id,
            command.strategy_id,
            command.instrument_id,
            command.client_order_id,
            Ustr::from(reason.as_str()),
            UUID4::new(),
            ts,
            ts,
            venue_order_id,
            Some(self.config.account_id),
        );
        self.publish_order(OrderEventAny::ModifyRejected(event));
    }

    fn generate_order_cancel_rejected(
        &mut self,
        command: &CancelOrder,
        reason: String,
        ts: UnixNanos,
    ) {
        let event = OrderCancelRejected::new(
            command.trader_id,
            command.strategy_id,
            command.instrument_id,
            command.client_order_id,
            Ustr::from(reason.as_str()),
            UUID4::new(),
            ts,
            ts,
            None,
            Some(self.config.account_id),
        );
        self.publish_order(OrderEventAny::CancelRejected(event));
    }
}

impl std::fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(MatchingEngine))
            .field("venue", &self.config.venue)
            .field("oms_type", &self.config.oms_type)
            .field("instruments", &self.instruments.len())
            .field("working_orders", &self.working.len())
            .finish()
    }
}
