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

//! Represents orders and their lifecycle state machine.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tradesim_core::{
    UUID4, UnixNanos,
    correctness::{FAILED, check_predicate_true},
};
use ustr::Ustr;

use crate::{
    enums::{LiquiditySide, OrderSide, OrderSideSpecified, OrderStatus, OrderType, TimeInForce},
    events::order::OrderEventAny,
    identifiers::{
        AccountId, ClientOrderId, InstrumentId, OrderListId, PositionId, StrategyId, TraderId,
        VenueOrderId,
    },
    types::{Price, Quantity, quantity::check_positive_quantity},
};

/// An error from applying an event to an order's state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// The event is not valid for the order's current status.
    #[error("invalid state transition from {status} on {event}")]
    InvalidStateTransition {
        /// The order status when the event was applied.
        status: OrderStatus,
        /// The kind of event which was applied.
        event: &'static str,
    },
    /// The order was not found.
    #[error("order {0} not found")]
    NotFound(ClientOrderId),
}

/// The order type variant, carrying the type-specific fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "order_type")]
pub enum OrderKind {
    /// Executes at the best available price in the current market.
    Market,
    /// Executes at a specific price or better.
    Limit {
        /// The order limit price.
        price: Price,
        /// If the order will only provide liquidity (make a market).
        post_only: bool,
    },
    /// Becomes a market order once the trigger price is breached.
    StopMarket {
        /// The order trigger (stop) price.
        trigger_price: Price,
    },
    /// Becomes a limit order once the trigger price is breached.
    StopLimit {
        /// The order limit price, effective once triggered.
        price: Price,
        /// The order trigger (stop) price.
        trigger_price: Price,
        /// If the order will only provide liquidity once triggered.
        post_only: bool,
        /// If the trigger price has been breached.
        is_triggered: bool,
    },
}

/// Represents an order in a market with a tagged type variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// The trader ID associated with the order.
    pub trader_id: TraderId,
    /// The strategy ID associated with the order.
    pub strategy_id: StrategyId,
    /// The order instrument ID.
    pub instrument_id: InstrumentId,
    /// The client order ID (globally unique within a strategy).
    pub client_order_id: ClientOrderId,
    /// The venue-assigned order ID (issued on accept).
    pub venue_order_id: Option<VenueOrderId>,
    /// The account ID associated with the order (set on accept).
    pub account_id: Option<AccountId>,
    /// The position ID to apply fills against.
    pub position_id: Option<PositionId>,
    /// The order side.
    pub side: OrderSide,
    /// The order type variant.
    pub kind: OrderKind,
    /// The order quantity.
    pub quantity: Quantity,
    /// The quantity filled so far.
    pub filled_qty: Quantity,
    /// The quantity remaining to be filled.
    pub leaves_qty: Quantity,
    /// The volume-weighted average fill price.
    pub avg_px: Option<f64>,
    /// The order lifecycle status.
    pub status: OrderStatus,
    /// The liquidity side of the last execution.
    pub liquidity_side: Option<LiquiditySide>,
    /// The order time in force.
    pub time_in_force: TimeInForce,
    /// The order expiration (required for GTD).
    pub expire_time: Option<UnixNanos>,
    /// The parent (entry) order ID for bracket children.
    pub parent_order_id: Option<ClientOrderId>,
    /// The client order IDs of contingent (OCO sibling) orders.
    pub linked_order_ids: Option<Vec<ClientOrderId>>,
    /// The order list ID of the bracket family.
    pub order_list_id: Option<OrderListId>,
    /// Arbitrary user tags.
    pub tags: Option<Ustr>,
    /// The unique identifier of the initialization event.
    pub init_id: UUID4,
    /// UNIX timestamp (nanoseconds) when the order was initialized.
    pub ts_init: UnixNanos,
    /// UNIX timestamp (nanoseconds) of the last order event.
    pub ts_last: UnixNanos,
}

impl Order {
    /// Creates a new [`Order`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// Returns an error if `quantity` is not positive, or if the time in
    /// force is GTD without an expire time.
    #[allow(clippy::too_many_arguments)]
    pub fn new_checked(
        trader_id: TraderId,
        strategy_id: StrategyId,
        instrument_id: InstrumentId,
        client_order_id: ClientOrderId,
        side: OrderSide,
        kind: OrderKind,
        quantity: Quantity,
        time_in_force: TimeInForce,
        expire_time: Option<UnixNanos>,
        ts_init: UnixNanos,
    ) -> anyhow::Result<Self> {
        check_positive_quantity(quantity, stringify!(quantity))?;
        check_predicate_true(
            time_in_force != TimeInForce::Gtd || expire_time.is_some(),
            "`expire_time` is required for GTD orders",
        )?;
        Ok(Self {
            trader_id,
            strategy_id,
            instrument_id,
            client_order_id,
            venue_order_id: None,
            account_id: None,
            position_id: None,
            side,
            kind,
            quantity,
            filled_qty: Quantity::zero(quantity.precision),
            leaves_qty: quantity,
            avg_px: None,
            status: OrderStatus::Initialized,
            liquidity_side: None,
            time_in_force,
            expire_time,
            parent_order_id: None,
            linked_order_ids: None,
            order_list_id: None,
            tags: None,
            init_id: UUID4::new(),
            ts_init,
            ts_last: ts_init,
        })
    }

    /// Creates a new MARKET [`Order`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    #[allow(clippy::too_many_arguments)]
    pub fn market(
        trader_id: TraderId,
        strategy_id: StrategyId,
        instrument_id: InstrumentId,
        client_order_id: ClientOrderId,
        side: OrderSide,
        quantity: Quantity,
        ts_init: UnixNanos,
    ) -> Self {
        Self::new_checked(
            trader_id,
            strategy_id,
            instrument_id,
            client_order_id,
            side,
            OrderKind::Market,
            quantity,
            TimeInForce::Gtc,
            None,
            ts_init,
        )
        .expect(FAILED)
    }

    /// Creates a new LIMIT [`Order`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    #[allow(clippy::too_many_arguments)]
    pub fn limit(
        trader_id: TraderId,
        strategy_id: StrategyId,
        instrument_id: InstrumentId,
        client_order_id: ClientOrderId,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
        post_only: bool,
        time_in_force: TimeInForce,
        expire_time: Option<UnixNanos>,
        ts_init: UnixNanos,
    ) -> Self {
        Self::new_checked(
            trader_id,
            strategy_id,
            instrument_id,
            client_order_id,
            side,
            OrderKind::Limit { price, post_only },
            quantity,
            time_in_force,
            expire_time,
            ts_init,
        )
        .expect(FAILED)
    }

    /// Creates a new STOP_MARKET [`Order`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    #[allow(clippy::too_many_arguments)]
    pub fn stop_market(
        trader_id: TraderId,
        strategy_id: StrategyId,
        instrument_id: InstrumentId,
        client_order_id: ClientOrderId,
        side: OrderSide,
        quantity: Quantity,
        trigger_price: Price,
        time_in_force: TimeInForce,
        expire_time: Option<UnixNanos>,
        ts_init: UnixNanos,
    ) -> Self {
        Self::new_checked(
            trader_id,
            strategy_id,
            instrument_id,
            client_order_id,
            side,
            OrderKind::StopMarket { trigger_price },
            quantity,
            time_in_force,
            expire_time,
            ts_init,
        )
        .expect(FAILED)
    }

    /// Creates a new STOP_LIMIT [`Order`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    #[allow(clippy::too_many_arguments)]
    pub fn stop_limit(
        trader_id: TraderId,
        strategy_id: StrategyId,
        instrument_id: InstrumentId,
        client_order_id: ClientOrderId,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
        trigger_price: Price,
        post_only: bool,
        time_in_force: TimeInForce,
        expire_time: Option<UnixNanos>,
        ts_init: UnixNanos,
    ) -> Self {
        Self::new_checked(
            trader_id,
            strategy_id,
            instrument_id,
            client_order_id,
            side,
            OrderKind::StopLimit {
                price,
                trigger_price,
                post_only,
                is_triggered: false,
            },
            quantity,
            time_in_force,
            expire_time,
            ts_init,
        )
        .expect(FAILED)
    }

    // -- QUERIES ---------------------------------------------------------------------------------

    /// Returns the order type for this order's kind.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        match self.kind {
            OrderKind::Market => OrderType::Market,
            OrderKind::Limit { .. } => OrderType::Limit,
            OrderKind::StopMarket { .. } => OrderType::StopMarket,
            OrderKind::StopLimit { .. } => OrderType::StopLimit,
        }
    }

    /// Returns the limit price, if this order has one.
    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        match self.kind {
            OrderKind::Limit { price, .. } | OrderKind::StopLimit { price, .. } => Some(price),
            _ => None,
        }
    }

    /// Returns the trigger (stop) price, if this order has one.
    #[must_use]
    pub const fn trigger_price(&self) -> Option<Price> {
        match self.kind {
            OrderKind::StopMarket { trigger_price }
            | OrderKind::StopLimit { trigger_price, .. } => Some(trigger_price),
            _ => None,
        }
    }

    /// Returns `true` if this order must not execute as a taker.
    #[must_use]
    pub const fn is_post_only(&self) -> bool {
        match self.kind {
            OrderKind::Limit { post_only, .. } | OrderKind::StopLimit { post_only, .. } => {
                post_only
            }
            _ => false,
        }
    }

    /// Returns `true` if this order's trigger price has been breached.
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        matches!(
            self.kind,
            OrderKind::StopLimit {
                is_triggered: true,
                ..
            }
        )
    }

    /// Returns the specified order side.
    #[must_use]
    pub fn order_side_specified(&self) -> OrderSideSpecified {
        self.side.as_specified()
    }

    /// Returns `true` if this order is a BUY.
    #[must_use]
    pub fn is_buy(&self) -> bool {
        self.side == OrderSide::Buy
    }

    /// Returns `true` if this order is a SELL.
    #[must_use]
    pub fn is_sell(&self) -> bool {
        self.side == OrderSide::Sell
    }

    /// Returns `true` if this order can rest in the working book.
    #[must_use]
    pub const fn is_passive(&self) -> bool {
        !matches!(self.kind, OrderKind::Market)
    }

    /// Returns `true` if this order is working at the venue.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Accepted | OrderStatus::Triggered | OrderStatus::PartiallyFilled
        )
    }

    /// Returns `true` if this order is in a terminal state.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Denied
                | OrderStatus::Rejected
                | OrderStatus::Canceled
                | OrderStatus::Expired
                | OrderStatus::Filled
        )
    }

    // -- STATE MACHINE ---------------------------------------------------------------------------

    /// Applies the given event to this order's state machine.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderError::InvalidStateTransition`] if the event is not
    /// valid for the current status.
    ///
    /// # Panics
    ///
    /// Panics if a fill breaches the order quantity invariant (a programmer
    /// error in the engine, never recoverable as an event).
    pub fn apply(&mut self, event: &OrderEventAny) -> Result<(), OrderError> {
        match event {
            OrderEventAny::Submitted(_) => {
                self.transition(&[OrderStatus::Initialized], OrderStatus::Submitted, "OrderSubmitted")?;
            }
            OrderEventAny::Denied(_) => {
                self.transition(&[OrderStatus::Initialized], OrderStatus::Denied, "OrderDenied")?;
            }
            OrderEventAny::Accepted(accepted) => {
                self.transition(&[OrderStatus::Submitted], OrderStatus::Accepted, "OrderAccepted")?;
                self.venue_order_id = Some(accepted.venue_order_id);
                self.account_id = Some(accepted.account_id);
            }
            OrderEventAny::Rejected(_) => {
                self.transition(
                    &[
                        OrderStatus::Submitted,
                        OrderStatus::Accepted,
                        OrderStatus::Triggered,
                    ],
                    OrderStatus::Rejected,
                    "OrderRejected",
                )?;
            }
            OrderEventAny::Canceled(_) => {
                self.transition(
                    &[
                        OrderStatus::Submitted,
                        OrderStatus::Accepted,
                        OrderStatus::Triggered,
                        OrderStatus::PartiallyFilled,
                    ],
                    OrderStatus::Canceled,
                    "OrderCanceled",
                )?;
            }
            OrderEventAny::Expired(_) => {
                self.transition(
                    &[OrderStatus::Accepted, OrderStatus::Triggered],
                    OrderStatus::Expired,
                    "OrderExpired",
                )?;
            }
            OrderEventAny::Triggered(_) => {
                self.transition(&[OrderStatus::Accepted], OrderStatus::Triggered, "OrderTriggered")?;
                if let OrderKind::StopLimit { is_triggered, .. } = &mut self.kind {
                    *is_triggered = true;
                }
            }
            OrderEventAny::Updated(updated) => {
                if self.is_closed() {
                    return Err(OrderError::InvalidStateTransition {
                        status: self.status,
                        event: "OrderUpdated",
                    });
                }
                if !updated.quantity.is_zero() {
                    self.quantity = updated.quantity;
                    self.leaves_qty = self.quantity - self.filled_qty;
                }
                if let Some(new_price) = updated.price {
                    match &mut self.kind {
                        OrderKind::Limit { price, .. } | OrderKind::StopLimit { price, .. } => {
                            *price = new_price;
                        }
                        _ => {}
                    }
                }
                if let Some(new_trigger) = updated.trigger_price {
                    match &mut self.kind {
                        OrderKind::StopMarket { trigger_price } => *trigger_price = new_trigger,
                        OrderKind::StopLimit {
                            trigger_price,
                            is_triggered: false,
                            ..
                        } => *trigger_price = new_trigger,
                        // The trigger has already fired, the change is ignored
                        _ => {}
                    }
                }
            }
            OrderEventAny::Filled(filled) => {
                self.transition(
                    &[
                        OrderStatus::Accepted,
                        OrderStatus::Triggered,
                        OrderStatus::PartiallyFilled,
                    ],
                    OrderStatus::Filled,
                    "OrderFilled",
                )?;
                let prev_filled = self.filled_qty.as_f64();
                self.filled_qty += filled.last_qty;
                assert!(
                    self.filled_qty <= self.quantity,
                    "Order invariant failed: filled_qty {} exceeded quantity {}",
                    self.filled_qty,
                    self.quantity,
                );
                self.leaves_qty = self.quantity - self.filled_qty;
                let total = self.filled_qty.as_f64();
                let last = filled.last_qty.as_f64();
                self.avg_px = Some(match self.avg_px {
                    Some(avg) => (avg * prev_filled + filled.last_px.as_f64() * last) / total,
                    None => filled.last_px.as_f64(),
                });
                self.liquidity_side = Some(filled.liquidity_side);
                if !self.leaves_qty.is_zero() {
                    self.status = OrderStatus::PartiallyFilled;
                }
            }
            OrderEventAny::CancelRejected(_) | OrderEventAny::ModifyRejected(_) => {
                // No state change, the original order stands
            }
        }
        self.ts_last = event.ts_event();
        Ok(())
    }

    fn transition(
        &mut self,
        allowed: &[OrderStatus],
        target: OrderStatus,
        event: &'static str,
    ) -> Result<(), OrderError> {
        if !allowed.contains(&self.status) {
            return Err(OrderError::InvalidStateTransition {
                status: self.status,
                event,
            });
        }
        self.status = target;
        Ok(())
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({} {} {} {}, status={}, client_order_id={})",
            stringify!(Order),
            self.side,
            self.quantity,
            self.instrument_id,
            self.order_type(),
            self.status,
            self.client_order_id,
        )
    }
}
