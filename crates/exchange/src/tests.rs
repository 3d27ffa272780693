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

//! Scenario tests driving the simulated venue end-to-end.

use std::{cell::RefCell, rc::Rc};

use rstest::rstest;
use tradesim_core::{UUID4, UnixNanos};
use tradesim_model::{
    data::QuoteTick,
    enums::{LiquiditySide, OmsType, OrderSide, PositionSide, TimeInForce},
    events::{EventAny, OrderEventAny, PositionEventAny},
    identifiers::{
        AccountId, ClientOrderId, InstrumentId, OrderListId, StrategyId, TraderId, Venue,
    },
    instruments::{
        Instrument,
        stubs::{audusd_sim, usdjpy_sim, xbtusd_bitmex},
    },
    types::{Currency, Money, Price, Quantity},
};

use crate::{
    bus::EventRecorder,
    clock::TestClock,
    config::ExchangeConfig,
    engine::MatchingEngine,
    messages::{CancelOrder, ModifyOrder, SubmitBracket},
    models::{FeeModelAny, FillModel},
};
use tradesim_model::orders::Order;

struct TestVenue {
    engine: MatchingEngine,
    clock: Rc<RefCell<TestClock>>,
    recorder: Rc<RefCell<EventRecorder>>,
}

fn venue_with(
    config: ExchangeConfig,
    instruments: Vec<Instrument>,
    fill_model: FillModel,
) -> TestVenue {
    let clock = Rc::new(RefCell::new(TestClock::new()));
    let recorder = Rc::new(RefCell::new(EventRecorder::new()));
    let mut engine = MatchingEngine::new(
        config,
        fill_model,
        FeeModelAny::default(),
        clock.clone(),
        recorder.clone(),
    )
    .unwrap();
    for instrument in instruments {
        engine.register_instrument(instrument).unwrap();
    }
    engine.initialize_account();
    TestVenue {
        engine,
        clock,
        recorder,
    }
}

fn sim_venue() -> TestVenue {
    venue_with(
        ExchangeConfig::default(),
        vec![usdjpy_sim(), audusd_sim()],
        certain_fill_model(),
    )
}

fn bitmex_venue() -> TestVenue {
    venue_with(
        ExchangeConfig::new(
            Venue::new("BITMEX"),
            OmsType::Hedging,
            AccountId::from("BITMEX-001"),
            vec![Money::from("1000000 USD")],
        ),
        vec![xbtusd_bitmex()],
        certain_fill_model(),
    )
}

fn certain_fill_model() -> FillModel {
    FillModel::new(1.0, 1.0, 0.0, Some(42)).unwrap()
}

fn quote(instrument_id: &str, bid: &str, ask: &str, ts: u64) -> QuoteTick {
    QuoteTick::new(
        InstrumentId::from(instrument_id),
        Price::from(bid),
        Price::from(ask),
        Quantity::from(100_000),
        Quantity::from(100_000),
        UnixNanos::from(ts),
        UnixNanos::from(ts),
    )
}

fn market_order(id: &str, instrument_id: &str, side: OrderSide, qty: u64) -> Order {
    Order::market(
        TraderId::default(),
        StrategyId::default(),
        InstrumentId::from(instrument_id),
        ClientOrderId::from(id),
        side,
        Quantity::from(qty),
        UnixNanos::default(),
    )
}

fn limit_order(
    id: &str,
    instrument_id: &str,
    side: OrderSide,
    qty: u64,
    price: &str,
    post_only: bool,
) -> Order {
    Order::limit(
        TraderId::default(),
        StrategyId::default(),
        InstrumentId::from(instrument_id),
        ClientOrderId::from(id),
        side,
        Quantity::from(qty),
        Price::from(price),
        post_only,
        TimeInForce::Gtc,
        None,
        UnixNanos::default(),
    )
}

fn stop_market_order(
    id: &str,
    instrument_id: &str,
    side: OrderSide,
    qty: u64,
    trigger: &str,
) -> Order {
    Order::stop_market(
        TraderId::default(),
        StrategyId::default(),
        InstrumentId::from(instrument_id),
        ClientOrderId::from(id),
        side,
        Quantity::from(qty),
        Price::from(trigger),
        TimeInForce::Gtc,
        None,
        UnixNanos::default(),
    )
}

fn stop_limit_order(
    id: &str,
    instrument_id: &str,
    side: OrderSide,
    qty: u64,
    price: &str,
    trigger: &str,
    post_only: bool,
) -> Order {
    Order::stop_limit(
        TraderId::default(),
        StrategyId::default(),
        InstrumentId::from(instrument_id),
        ClientOrderId::from(id),
        side,
        Quantity::from(qty),
        Price::from(price),
        Price::from(trigger),
        post_only,
        TimeInForce::Gtc,
        None,
        UnixNanos::default(),
    )
}

fn modify_command(
    instrument_id: &str,
    client_order_id: &str,
    quantity: Option<Quantity>,
    price: Option<Price>,
    trigger_price: Option<Price>,
) -> ModifyOrder {
    ModifyOrder {
        trader_id: TraderId::default(),
        strategy_id: StrategyId::default(),
        command_id: UUID4::new(),
        instrument_id: InstrumentId::from(instrument_id),
        client_order_id: ClientOrderId::from(client_order_id),
        quantity,
        price,
        trigger_price,
        ts_init: UnixNanos::default(),
    }
}

fn cancel_command(instrument_id: &str, client_order_id: &str) -> CancelOrder {
    CancelOrder {
        trader_id: TraderId::default(),
        strategy_id: StrategyId::default(),
        command_id: UUID4::new(),
        instrument_id: InstrumentId::from(instrument_id),
        client_order_id: ClientOrderId::from(client_order_id),
        ts_init: UnixNanos::default(),
    }
}

fn bracket_command(entry: Order, sl_price: &str, tp_price: &str) -> SubmitBracket {
    let entry_id = entry.client_order_id;
    SubmitBracket {
        trader_id: entry.trader_id,
        strategy_id: entry.strategy_id,
        command_id: UUID4::new(),
        entry,
        stop_loss_client_order_id: ClientOrderId::new(format!("{entry_id}-SL")),
        stop_loss_price: Price::from(sl_price),
        take_profit_client_order_id: ClientOrderId::new(format!("{entry_id}-TP")),
        take_profit_price: Price::from(tp_price),
        order_list_id: OrderListId::new("OL-1"),
        ts_init: UnixNanos::default(),
    }
}

fn last_order_event(venue: &TestVenue, client_order_id: &str) -> OrderEventAny {
    let id = ClientOrderId::from(client_order_id);
    venue
        .recorder
        .borrow()
        .order_events()
        .into_iter()
        .filter(|event| event.client_order_id() == id)
        .next_back()
        .expect("no events for client order id")
}

fn fills_for(venue: &TestVenue, client_order_id: &str) -> Vec<tradesim_model::events::OrderFilled> {
    let id = ClientOrderId::from(client_order_id);
    venue
        .recorder
        .borrow()
        .order_events()
        .into_iter()
        .filter_map(|event| match event {
            OrderEventAny::Filled(fill) if fill.client_order_id == id => Some(fill),
            _ => None,
        })
        .collect()
}

////////////////////////////////////////////////////////////////////////////////
// Submission and validation
////////////////////////////////////////////////////////////////////////////////

#[rstest]
fn test_get_working_orders_when_no_orders_returns_empty() {
    let venue = sim_venue();
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_submit_order_with_no_market_rejects_order() {
    let mut venue = sim_venue();
    let order = stop_market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "80.000");

    venue.engine.submit_order(order, None);

    let event = last_order_event(&venue, "O-1");
    let OrderEventAny::Rejected(rejected) = event else {
        panic!("expected OrderRejected, was {event:?}");
    };
    assert!(rejected.reason.as_str().starts_with("NO_MARKET"));
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_submit_order_with_invalid_price_precision_rejects_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let order = limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.0015", false);
    venue.engine.submit_order(order, None);

    let OrderEventAny::Rejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderRejected");
    };
    assert!(rejected.reason.as_str().starts_with("PRICE_INVALID"));
}

#[rstest]
#[case(1)] // below min
#[case(100_000_000)] // above max
fn test_submit_order_with_quantity_out_of_bounds_rejects_order(#[case] qty: u64) {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let order = market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, qty);
    venue.engine.submit_order(order, None);

    let OrderEventAny::Rejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderRejected");
    };
    assert!(rejected.reason.as_str().starts_with("QUANTITY_OUT_OF_BOUNDS"));
}

#[rstest]
fn test_submit_order_with_unknown_instrument_rejects_order() {
    let mut venue = sim_venue();
    let order = market_order("O-1", "GBP/USD.SIM", OrderSide::Buy, 100_000);

    venue.engine.submit_order(order, None);

    let OrderEventAny::Rejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderRejected");
    };
    assert!(rejected.reason.as_str().starts_with("INSTRUMENT_UNKNOWN"));
}

#[rstest]
fn test_submit_duplicate_client_order_id_denies_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue
        .engine
        .submit_order(market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000), None);
    venue
        .engine
        .submit_order(market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000), None);

    let OrderEventAny::Denied(denied) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderDenied");
    };
    assert!(denied.reason.as_str().starts_with("DUPLICATE_CLIENT_ORDER_ID"));
}

#[rstest]
fn test_submit_market_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue
        .engine
        .submit_order(market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000), None);

    let fills = fills_for(&venue, "O-1");
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].last_px, Price::from("90.005")); // No slippage
    assert_eq!(fills[0].liquidity_side, LiquiditySide::Taker);
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_submit_market_order_with_slippage_fill_model_slips_order() {
    let mut venue = venue_with(
        ExchangeConfig::default(),
        vec![usdjpy_sim()],
        FillModel::new(1.0, 1.0, 1.0, Some(42)).unwrap(),
    );
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue
        .engine
        .submit_order(market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000), None);

    let fills = fills_for(&venue, "O-1");
    assert_eq!(fills[0].last_px, Price::from("90.006")); // Slipped one tick
}

#[rstest]
fn test_submit_post_only_limit_order_when_marketable_then_rejects() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let order = limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.005", true);
    venue.engine.submit_order(order, None);

    let OrderEventAny::Rejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderRejected");
    };
    assert!(rejected.reason.as_str().starts_with("POST_ONLY_WOULD_CROSS"));
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_submit_limit_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let order = limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.001", true);
    venue.engine.submit_order(order, None);

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Accepted(_)));
    let working = venue.engine.get_working_orders();
    assert_eq!(working.len(), 1);
    assert!(working.contains_key(&ClientOrderId::from("O-1")));
}

#[rstest]
fn test_submit_limit_order_when_marketable_then_fills() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let order = limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.005", false);
    venue.engine.submit_order(order, None);

    let fills = fills_for(&venue, "O-1");
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].liquidity_side, LiquiditySide::Taker);
    assert_eq!(fills[0].last_px, Price::from("90.005"));
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_submit_ioc_limit_order_when_not_marketable_cancels() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let mut order = limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.001", false);
    order.time_in_force = TimeInForce::Ioc;
    venue.engine.submit_order(order, None);

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Canceled(_)));
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_submit_stop_market_order_inside_market_rejects() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let order = stop_market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.005");
    venue.engine.submit_order(order, None);

    let OrderEventAny::Rejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderRejected");
    };
    assert!(rejected.reason.as_str().starts_with("STOP_INSIDE_MARKET"));
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_submit_stop_market_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let order = stop_market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.010");
    venue.engine.submit_order(order, None);

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Accepted(_)));
    assert_eq!(venue.engine.get_working_orders().len(), 1);
}

#[rstest]
fn test_submit_stop_limit_order_when_inside_market_rejects() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let order = stop_limit_order(
        "O-1",
        "USD/JPY.SIM",
        OrderSide::Sell,
        100_000,
        "90.010",
        "90.020",
        false,
    );
    venue.engine.submit_order(order, None);

    let OrderEventAny::Rejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderRejected");
    };
    assert!(rejected.reason.as_str().starts_with("STOP_INSIDE_MARKET"));
}

#[rstest]
fn test_submit_stop_limit_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let order = stop_limit_order(
        "O-1",
        "USD/JPY.SIM",
        OrderSide::Buy,
        100_000,
        "90.000",
        "90.010",
        false,
    );
    venue.engine.submit_order(order, None);

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Accepted(_)));
    assert_eq!(venue.engine.get_working_orders().len(), 1);
}

////////////////////////////////////////////////////////////////////////////////
// Cancels and amendments
////////////////////////////////////////////////////////////////////////////////

#[rstest]
fn test_cancel_stop_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        stop_market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.010"),
        None,
    );
    venue.engine.cancel_order(&cancel_command("USD/JPY.SIM", "O-1"));

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Canceled(_)));
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_cancel_order_when_order_does_not_exist_generates_cancel_reject() {
    let mut venue = sim_venue();
    venue.engine.cancel_order(&cancel_command("USD/JPY.SIM", "O-404"));

    let OrderEventAny::CancelRejected(rejected) = last_order_event(&venue, "O-404") else {
        panic!("expected OrderCancelRejected");
    };
    assert!(rejected.reason.as_str().starts_with("ORDER_NOT_FOUND"));
}

#[rstest]
fn test_amend_order_when_order_does_not_exist_generates_modify_reject() {
    let mut venue = sim_venue();
    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-404",
        Some(Quantity::from(100_000)),
        Some(Price::from("1.00000")),
        None,
    ));

    let OrderEventAny::ModifyRejected(rejected) = last_order_event(&venue, "O-404") else {
        panic!("expected OrderModifyRejected");
    };
    assert!(rejected.reason.as_str().starts_with("ORDER_NOT_FOUND"));
}

#[rstest]
fn test_amend_order_with_no_changes_rejects_amendment() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.001", true),
        None,
    );

    // Zero quantity and an unchanged price are both "no change" sentinels
    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-1",
        Some(Quantity::zero(0)),
        Some(Price::from("90.001")),
        None,
    ));

    let OrderEventAny::ModifyRejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderModifyRejected");
    };
    assert!(rejected.reason.as_str().starts_with("ZERO_AMENDMENT"));

    // Original order untouched and still working
    let working = venue.engine.get_working_orders();
    let order = working.get(&ClientOrderId::from("O-1")).unwrap();
    assert_eq!(order.price(), Some(Price::from("90.001")));
    assert!(order.is_open());
}

#[rstest]
fn test_amend_post_only_limit_order_when_marketable_then_rejects_amendment() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.001", true),
        None,
    );
    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-1",
        None,
        Some(Price::from("90.005")),
        None,
    ));

    let OrderEventAny::ModifyRejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderModifyRejected");
    };
    assert!(rejected.reason.as_str().starts_with("POST_ONLY_WOULD_CROSS"));

    let working = venue.engine.get_working_orders();
    let order = working.get(&ClientOrderId::from("O-1")).unwrap();
    assert_eq!(order.price(), Some(Price::from("90.001"))); // Did not amend
}

#[rstest]
fn test_amend_limit_order_when_marketable_then_fills_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.001", false),
        None,
    );
    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-1",
        None,
        Some(Price::from("90.005")),
        None,
    ));

    let fills = fills_for(&venue, "O-1");
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].last_px, Price::from("90.005"));
    assert_eq!(fills[0].liquidity_side, LiquiditySide::Taker);
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_amend_stop_market_order_when_price_inside_market_then_rejects_amendment() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        stop_market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.010"),
        None,
    );
    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-1",
        None,
        None,
        Some(Price::from("90.005")),
    ));

    let OrderEventAny::ModifyRejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderModifyRejected");
    };
    assert!(rejected.reason.as_str().starts_with("STOP_INSIDE_MARKET"));
}

#[rstest]
fn test_amend_stop_market_order_when_price_valid_then_amends() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        stop_market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.010"),
        None,
    );
    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-1",
        None,
        None,
        Some(Price::from("90.011")),
    ));

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Updated(_)));
    let working = venue.engine.get_working_orders();
    let order = working.get(&ClientOrderId::from("O-1")).unwrap();
    assert_eq!(order.trigger_price(), Some(Price::from("90.011")));
}

#[rstest]
fn test_amend_untriggered_stop_limit_order_when_trigger_inside_market_then_rejects_amendment() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        stop_limit_order(
            "O-1",
            "USD/JPY.SIM",
            OrderSide::Buy,
            100_000,
            "90.000",
            "90.010",
            false,
        ),
        None,
    );
    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-1",
        None,
        None,
        Some(Price::from("90.005")),
    ));

    let OrderEventAny::ModifyRejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderModifyRejected");
    };
    assert!(rejected.reason.as_str().starts_with("STOP_INSIDE_MARKET"));
}

#[rstest]
fn test_amend_untriggered_stop_limit_order_when_trigger_valid_then_amends() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        stop_limit_order(
            "O-1",
            "USD/JPY.SIM",
            OrderSide::Buy,
            100_000,
            "90.000",
            "90.010",
            false,
        ),
        None,
    );
    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-1",
        None,
        None,
        Some(Price::from("90.011")),
    ));

    let working = venue.engine.get_working_orders();
    let order = working.get(&ClientOrderId::from("O-1")).unwrap();
    assert_eq!(order.trigger_price(), Some(Price::from("90.011")));
}

fn venue_with_triggered_stop_limit(post_only: bool) -> TestVenue {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));
    venue.engine.submit_order(
        stop_limit_order(
            "O-1",
            "USD/JPY.SIM",
            OrderSide::Buy,
            100_000,
            "90.000",
            "90.010",
            post_only,
        ),
        None,
    );
    // Trigger the stop without crossing the limit
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.010", "90.011", 1));
    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Triggered(_)));
    venue
}

#[rstest]
fn test_amend_triggered_post_only_stop_limit_order_when_price_inside_market_then_rejects() {
    let mut venue = venue_with_triggered_stop_limit(true);

    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-1",
        None,
        Some(Price::from("90.011")),
        None,
    ));

    let OrderEventAny::ModifyRejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderModifyRejected");
    };
    assert!(rejected.reason.as_str().starts_with("POST_ONLY_WOULD_CROSS"));
}

#[rstest]
fn test_amend_triggered_stop_limit_order_when_price_inside_market_then_fills() {
    let mut venue = venue_with_triggered_stop_limit(false);

    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-1",
        None,
        Some(Price::from("90.011")),
        None,
    ));

    let fills = fills_for(&venue, "O-1");
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].last_px, Price::from("90.011"));
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_amend_triggered_stop_limit_order_ignores_trigger_change() {
    let mut venue = venue_with_triggered_stop_limit(false);

    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-1",
        None,
        Some(Price::from("90.001")),
        Some(Price::from("90.050")),
    ));

    let working = venue.engine.get_working_orders();
    let order = working.get(&ClientOrderId::from("O-1")).unwrap();
    assert_eq!(order.price(), Some(Price::from("90.001")));
    assert_eq!(order.trigger_price(), Some(Price::from("90.010"))); // Unchanged
}

////////////////////////////////////////////////////////////////////////////////
// Tick-driven matching
////////////////////////////////////////////////////////////////////////////////

#[rstest]
fn test_expire_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let order = Order::stop_market(
        TraderId::default(),
        StrategyId::default(),
        InstrumentId::from("USD/JPY.SIM"),
        ClientOrderId::from("O-1"),
        OrderSide::Buy,
        Quantity::from(100_000),
        Price::from("96.711"),
        TimeInForce::Gtd,
        Some(UnixNanos::from(60_000_000_000)),
        UnixNanos::default(),
    );
    venue.engine.submit_order(order, None);

    // A non-triggering tick at the expire time
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "96.709", "96.710", 60_000_000_000));

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Expired(_)));
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_process_quote_tick_fills_buy_stop_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        stop_market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "96.711"),
        None,
    );

    // A different market does not touch the working order
    venue
        .engine
        .process_quote_tick(&quote("AUD/USD.SIM", "0.80010", "0.80011", 0));
    assert_eq!(venue.engine.get_working_orders().len(), 1);

    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "96.710", "96.712", 0));

    let fills = fills_for(&venue, "O-1");
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].last_px, Price::from("96.711")); // Filled at the trigger
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_process_quote_tick_fills_sell_stop_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        stop_market_order("O-1", "USD/JPY.SIM", OrderSide::Sell, 100_000, "90.000"),
        None,
    );
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "89.997", "89.999", 0));

    let fills = fills_for(&venue, "O-1");
    assert_eq!(fills[0].last_px, Price::from("90.000"));
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_process_quote_tick_triggers_buy_stop_limit_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        stop_limit_order(
            "O-1",
            "USD/JPY.SIM",
            OrderSide::Buy,
            100_000,
            "96.500",
            "96.710",
            false,
        ),
        None,
    );
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "96.710", "96.712", 0));

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Triggered(_)));
    let working = venue.engine.get_working_orders();
    assert_eq!(working.len(), 1);
    assert!(working.get(&ClientOrderId::from("O-1")).unwrap().is_triggered());
}

#[rstest]
fn test_process_quote_tick_rejects_triggered_post_only_buy_stop_limit_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        stop_limit_order(
            "O-1",
            "USD/JPY.SIM",
            OrderSide::Buy,
            100_000,
            "90.006",
            "90.006",
            true,
        ),
        None,
    );
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.005", "90.006", 1_000_000_000));

    let OrderEventAny::Rejected(rejected) = last_order_event(&venue, "O-1") else {
        panic!("expected OrderRejected");
    };
    assert!(rejected.reason.as_str().starts_with("POST_ONLY_WOULD_CROSS"));
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_process_quote_tick_fills_triggered_buy_stop_limit_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        stop_limit_order(
            "O-1",
            "USD/JPY.SIM",
            OrderSide::Buy,
            100_000,
            "90.000",
            "90.006",
            false,
        ),
        None,
    );
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.006", "90.007", 0));
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.000", "90.001", 0));

    let fills = fills_for(&venue, "O-1");
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].last_px, Price::from("90.000"));
    assert_eq!(fills[0].liquidity_side, LiquiditySide::Maker);
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_process_quote_tick_fills_buy_limit_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.001", true),
        None,
    );
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.000", "90.001", 0));

    let fills = fills_for(&venue, "O-1");
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].last_px, Price::from("90.001"));
    assert_eq!(fills[0].liquidity_side, LiquiditySide::Maker);
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_process_quote_tick_fills_sell_limit_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        limit_order("O-1", "USD/JPY.SIM", OrderSide::Sell, 100_000, "90.100", true),
        None,
    );
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.101", "90.102", 0));

    let fills = fills_for(&venue, "O-1");
    assert_eq!(fills[0].last_px, Price::from("90.100"));
    assert!(venue.engine.get_working_orders().is_empty());
}

////////////////////////////////////////////////////////////////////////////////
// Brackets and OCO
////////////////////////////////////////////////////////////////////////////////

#[rstest]
fn test_submit_bracket_market_order_activates_children() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let entry = market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000);
    venue
        .engine
        .submit_bracket(bracket_command(entry, "89.950", "90.050"));

    assert_eq!(fills_for(&venue, "O-1").len(), 1);
    assert!(matches!(last_order_event(&venue, "O-1-SL"), OrderEventAny::Accepted(_)));
    assert!(matches!(last_order_event(&venue, "O-1-TP"), OrderEventAny::Accepted(_)));
    assert_eq!(venue.engine.get_working_orders().len(), 2);
}

#[rstest]
fn test_submit_stop_market_order_with_bracket_holds_children_dormant() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let entry = stop_market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.020");
    venue
        .engine
        .submit_bracket(bracket_command(entry, "90.000", "90.040"));

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Accepted(_)));
    assert!(matches!(last_order_event(&venue, "O-1-SL"), OrderEventAny::Submitted(_)));
    assert!(matches!(last_order_event(&venue, "O-1-TP"), OrderEventAny::Submitted(_)));
    let working = venue.engine.get_working_orders();
    assert_eq!(working.len(), 1);
    assert!(working.contains_key(&ClientOrderId::from("O-1")));
}

#[rstest]
fn test_cancel_bracket_entry_cancels_children() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let entry = stop_market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.020");
    venue
        .engine
        .submit_bracket(bracket_command(entry, "90.000", "90.040"));
    venue.engine.cancel_order(&cancel_command("USD/JPY.SIM", "O-1"));

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Canceled(_)));
    assert!(matches!(last_order_event(&venue, "O-1-SL"), OrderEventAny::Canceled(_)));
    assert!(matches!(last_order_event(&venue, "O-1-TP"), OrderEventAny::Canceled(_)));
    assert!(venue.engine.get_working_orders().is_empty());
}

#[rstest]
fn test_rejected_bracket_entry_cancels_children() {
    let mut venue = sim_venue();
    // No market data, the stop entry is rejected with NO_MARKET
    let entry = stop_market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.020");
    venue
        .engine
        .submit_bracket(bracket_command(entry, "90.000", "90.040"));

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Rejected(_)));
    assert!(matches!(last_order_event(&venue, "O-1-SL"), OrderEventAny::Canceled(_)));
    assert!(matches!(last_order_event(&venue, "O-1-TP"), OrderEventAny::Canceled(_)));
}

#[rstest]
fn test_filling_oco_sell_cancels_other_order() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let entry = limit_order("O-1", "USD/JPY.SIM", OrderSide::Sell, 100_000, "91.100", false);
    venue
        .engine
        .submit_bracket(bracket_command(entry, "91.200", "90.000"));

    // Entry fills, activating the SL/TP pair
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "91.101", "91.102", 0));
    assert_eq!(fills_for(&venue, "O-1").len(), 1);
    assert_eq!(venue.engine.get_working_orders().len(), 2);

    // SL (BUY STOP 91.200) fills, which must cancel the TP within the same step
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "91.201", "91.203", 0));

    assert_eq!(fills_for(&venue, "O-1-SL").len(), 1);
    assert!(matches!(last_order_event(&venue, "O-1-TP"), OrderEventAny::Canceled(_)));
    assert!(venue.engine.get_working_orders().is_empty());

    // Causal order on the bus: OrderFilled(SL) -> PositionClosed -> OrderCanceled(TP)
    let events = venue.recorder.borrow().events().to_vec();
    let fill_idx = events
        .iter()
        .position(|e| {
            matches!(e, EventAny::Order(OrderEventAny::Filled(f)) if f.client_order_id == ClientOrderId::from("O-1-SL"))
        })
        .unwrap();
    let closed_idx = events
        .iter()
        .position(|e| matches!(e, EventAny::Position(PositionEventAny::Closed(_))))
        .unwrap();
    let canceled_idx = events
        .iter()
        .position(|e| {
            matches!(e, EventAny::Order(OrderEventAny::Canceled(c)) if c.client_order_id == ClientOrderId::from("O-1-TP"))
        })
        .unwrap();
    assert!(fill_idx < closed_idx);
    assert!(closed_idx < canceled_idx);
}

#[rstest]
fn test_check_residuals_with_working_and_dormant_orders() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    let entry1 = limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.000", false);
    venue
        .engine
        .submit_bracket(bracket_command(entry1, "89.900", "91.000"));

    let entry2 = limit_order("O-2", "USD/JPY.SIM", OrderSide::Buy, 100_000, "89.900", false);
    venue
        .engine
        .submit_bracket(bracket_command(entry2, "89.800", "91.000"));

    // Entry 1 fills and activates its children; entry 2 still working with
    // dormant children
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "89.998", "89.999", 0));

    venue.engine.check_residuals();
    let working = venue.engine.get_working_orders();
    assert_eq!(working.len(), 3);
    assert!(working.contains_key(&ClientOrderId::from("O-1-SL")));
    assert!(working.contains_key(&ClientOrderId::from("O-1-TP")));
    assert!(working.contains_key(&ClientOrderId::from("O-2")));
}

////////////////////////////////////////////////////////////////////////////////
// Positions and accounting
////////////////////////////////////////////////////////////////////////////////

#[rstest]
fn test_order_fills_gets_commissioned() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue
        .engine
        .submit_order(market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000), None);
    let position_id = fills_for(&venue, "O-1")[0].position_id.unwrap();

    venue.engine.submit_order(
        market_order("O-2", "USD/JPY.SIM", OrderSide::Buy, 100_000),
        Some(position_id),
    );
    venue.engine.submit_order(
        market_order("O-3", "USD/JPY.SIM", OrderSide::Sell, 50_000),
        Some(position_id),
    );

    assert_eq!(fills_for(&venue, "O-1")[0].commission, Some(Money::from("180.01 JPY")));
    assert_eq!(fills_for(&venue, "O-2")[0].commission, Some(Money::from("180.01 JPY")));
    // 50_000 * 90.002 * 0.00002 = 90.002, rounded at currency precision
    assert_eq!(fills_for(&venue, "O-3")[0].commission, Some(Money::from("90.00 JPY")));
}

#[rstest]
fn test_realized_pnl_contains_commission() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue
        .engine
        .submit_order(market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000), None);

    let position_id = fills_for(&venue, "O-1")[0].position_id.unwrap();
    let position = venue.engine.position(&position_id).unwrap();
    assert_eq!(position.realized_pnl, Some(Money::from("-180.01 JPY")));
    assert_eq!(position.commissions(), vec![Money::from("180.01 JPY")]);
}

#[rstest]
fn test_unrealized_pnl() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue
        .engine
        .submit_order(market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000), None);
    let position_id = fills_for(&venue, "O-1")[0].position_id.unwrap();

    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "100.003", "100.003", 0));
    venue.engine.submit_order(
        market_order("O-2", "USD/JPY.SIM", OrderSide::Sell, 50_000),
        Some(position_id),
    );

    let position = venue.engine.position(&position_id).unwrap();
    assert_eq!(position.quantity, Quantity::from(50_000));
    assert_eq!(
        position.unrealized_pnl(Price::from("100.003")),
        Money::from("499900.00 JPY")
    );
}

#[rstest]
fn test_position_flipped_when_reduce_order_exceeds_original_quantity() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.003", 0));

    venue
        .engine
        .submit_order(market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000), None);
    let position_id = fills_for(&venue, "O-1")[0].position_id.unwrap();

    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "100.003", "100.003", 0));
    venue.engine.submit_order(
        market_order("O-2", "USD/JPY.SIM", OrderSide::Sell, 150_000),
        Some(position_id),
    );

    let open_positions = venue.engine.ledger().positions_open();
    let closed_positions = venue.engine.ledger().positions_closed();
    assert_eq!(open_positions.len(), 1);
    assert_eq!(closed_positions.len(), 1);

    let closed = closed_positions[0];
    assert_eq!(closed.realized_pnl, Some(Money::from("999619.98 JPY")));
    assert_eq!(closed.commissions(), vec![Money::from("380.02 JPY")]);

    let flipped = open_positions[0];
    assert_ne!(flipped.id, closed.id); // Two distinct position ids
    assert_eq!(flipped.side, PositionSide::Short);
    assert_eq!(flipped.quantity, Quantity::from(50_000));
    assert_eq!(flipped.commissions(), vec![Money::from("100.00 JPY")]);
}

#[rstest]
fn test_commission_maker_taker_order() {
    let mut venue = bitmex_venue();
    venue
        .engine
        .process_quote_tick(&quote("XBT/USD.BITMEX", "11493.70", "11493.75", 0));

    venue.engine.submit_order(
        market_order("O-1", "XBT/USD.BITMEX", OrderSide::Buy, 100_000),
        None,
    );
    venue.engine.submit_order(
        limit_order("O-2", "XBT/USD.BITMEX", OrderSide::Buy, 100_000, "11493.65", false),
        None,
    );
    venue
        .engine
        .process_quote_tick(&quote("XBT/USD.BITMEX", "11493.60", "11493.64", 0));

    let taker_fill = fills_for(&venue, "O-1")[0];
    assert_eq!(taker_fill.liquidity_side, LiquiditySide::Taker);
    assert_eq!(
        taker_fill.commission,
        Some(Money::new(0.00652529, Currency::BTC()))
    );

    let maker_fill = fills_for(&venue, "O-2")[0];
    assert_eq!(maker_fill.liquidity_side, LiquiditySide::Maker);
    assert_eq!(
        maker_fill.commission,
        Some(Money::new(-0.00217511, Currency::BTC()))
    );
}

#[rstest]
fn test_adjust_account_changes_balance() {
    let mut venue = sim_venue();
    venue.engine.adjust_account(Money::from("1000 USD"));

    let balance = venue.engine.account().balance(Currency::USD()).unwrap();
    assert_eq!(balance.total, Money::from("1001000.00 USD"));
}

#[rstest]
fn test_adjust_account_when_account_frozen_does_not_change_balance() {
    let mut config = ExchangeConfig::default();
    config.is_frozen_account = true;
    let mut venue = venue_with(config, vec![usdjpy_sim()], certain_fill_model());

    venue.engine.adjust_account(Money::from("1000 USD"));

    let balance = venue.engine.account().balance(Currency::USD()).unwrap();
    assert_eq!(balance.total, Money::from("1000000.00 USD"));
}

#[rstest]
fn test_frozen_account_receives_no_balance_mutation_from_fills() {
    let mut config = ExchangeConfig::default();
    config.is_frozen_account = true;
    let mut venue = venue_with(config, vec![usdjpy_sim()], certain_fill_model());
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue
        .engine
        .submit_order(market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000), None);

    // The fill happened, position accounting continues for reporting
    assert_eq!(fills_for(&venue, "O-1").len(), 1);
    assert!(venue.engine.account().balance(Currency::JPY()).is_none());
    let balance = venue.engine.account().balance(Currency::USD()).unwrap();
    assert_eq!(balance.total, Money::from("1000000.00 USD"));
}

#[rstest]
fn test_account_postings_reconcile_with_position_pnl() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.003", 0));

    venue
        .engine
        .submit_order(market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000), None);
    let position_id = fills_for(&venue, "O-1")[0].position_id.unwrap();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "100.003", "100.003", 0));
    venue.engine.submit_order(
        market_order("O-2", "USD/JPY.SIM", OrderSide::Sell, 100_000),
        Some(position_id),
    );

    // Net JPY account change equals the closed position's realized PnL
    // (price PnL minus commissions)
    let closed = venue.engine.ledger().positions_closed()[0];
    let jpy_balance = venue.engine.account().balance(Currency::JPY()).unwrap();
    assert_eq!(jpy_balance.total, closed.realized_pnl.unwrap());
}

////////////////////////////////////////////////////////////////////////////////
// Command queue, determinism and serialization
////////////////////////////////////////////////////////////////////////////////

#[rstest]
fn test_command_queue_processes_in_fifo_order() {
    let mut venue = sim_venue();
    venue.clock.borrow_mut().set_time(UnixNanos::from(1));
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.send(crate::messages::TradingCommand::SubmitOrder(
        crate::messages::SubmitOrder {
            trader_id: TraderId::default(),
            strategy_id: StrategyId::default(),
            command_id: UUID4::new(),
            order: limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.000", false),
            position_id: None,
            ts_init: UnixNanos::default(),
        },
    ));
    venue.engine.send(crate::messages::TradingCommand::CancelOrder(
        cancel_command("USD/JPY.SIM", "O-1"),
    ));

    venue.engine.process(UnixNanos::from(1));

    assert!(matches!(last_order_event(&venue, "O-1"), OrderEventAny::Canceled(_)));
    assert!(venue.engine.get_working_orders().is_empty());
}

fn run_replay_scenario(venue: &mut TestVenue) {
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));
    venue
        .engine
        .submit_order(market_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000), None);
    venue.engine.submit_order(
        limit_order("O-2", "USD/JPY.SIM", OrderSide::Sell, 100_000, "91.100", false),
        None,
    );
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "91.101", "91.102", 1));
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "91.050", "91.052", 2));
}

/// Strips the random event identifiers, leaving the deterministic content.
fn normalized(events: &[EventAny]) -> Vec<serde_json::Value> {
    fn strip(value: &mut serde_json::Value) {
        match value {
            serde_json::Value::Object(map) => {
                map.remove("event_id");
                for nested in map.values_mut() {
                    strip(nested);
                }
            }
            serde_json::Value::Array(values) => {
                for nested in values.iter_mut() {
                    strip(nested);
                }
            }
            _ => {}
        }
    }
    events
        .iter()
        .map(|event| {
            let mut value = serde_json::to_value(event).unwrap();
            strip(&mut value);
            value
        })
        .collect()
}

#[rstest]
fn test_replaying_identical_inputs_reproduces_event_stream() {
    let mut venue1 = sim_venue();
    let mut venue2 = sim_venue();

    run_replay_scenario(&mut venue1);
    run_replay_scenario(&mut venue2);

    let events1 = normalized(venue1.recorder.borrow().events());
    let events2 = normalized(venue2.recorder.borrow().events());
    assert!(!events1.is_empty());
    assert_eq!(events1, events2);
}

#[rstest]
fn test_every_emitted_event_serializes_round_trip() {
    let mut venue = sim_venue();
    run_replay_scenario(&mut venue);
    venue.engine.submit_order(
        stop_market_order("O-3", "USD/JPY.SIM", OrderSide::Buy, 100_000, "95.000"),
        None,
    );
    venue.engine.modify_order(&modify_command(
        "USD/JPY.SIM",
        "O-3",
        None,
        None,
        Some(Price::from("95.001")),
    ));
    venue.engine.cancel_order(&cancel_command("USD/JPY.SIM", "O-3"));
    venue.engine.cancel_order(&cancel_command("USD/JPY.SIM", "O-404"));

    for event in venue.recorder.borrow().events() {
        let json = serde_json::to_string(event).unwrap();
        let deserialized: EventAny = serde_json::from_str(&json).unwrap();
        assert_eq!(&deserialized, event);
    }
}

#[rstest]
fn test_working_orders_are_always_in_open_states() {
    let mut venue = sim_venue();
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.002", "90.005", 0));

    venue.engine.submit_order(
        limit_order("O-1", "USD/JPY.SIM", OrderSide::Buy, 100_000, "90.000", false),
        None,
    );
    venue.engine.submit_order(
        stop_limit_order(
            "O-2",
            "USD/JPY.SIM",
            OrderSide::Buy,
            100_000,
            "90.010",
            "90.020",
            false,
        ),
        None,
    );
    venue
        .engine
        .process_quote_tick(&quote("USD/JPY.SIM", "90.020", "90.021", 1));

    for order in venue.engine.get_working_orders().values() {
        assert!(order.is_open(), "working order {order} not in an open state");
    }
}
