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

//! Represents a tradable instrument and its venue constraints.

use std::fmt::Display;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradesim_core::{
    UnixNanos,
    correctness::{FAILED, check_equal_u8, check_predicate_true},
};

use crate::{
    identifiers::{InstrumentId, Symbol},
    types::{
        Currency, Money, Price, Quantity,
        price::check_positive_price,
        quantity::check_positive_quantity,
    },
};

/// Represents a tradable instrument, immutable once registered with a venue.
///
/// Inverse instruments (e.g. XBT/USD style contracts) settle in the base
/// currency, with the price entering notional and PnL reciprocally.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// The instrument ID.
    pub id: InstrumentId,
    /// The raw/local/native symbol for the instrument, assigned by the venue.
    pub raw_symbol: Symbol,
    /// The price decimal precision.
    pub price_precision: u8,
    /// The trading size decimal precision.
    pub size_precision: u8,
    /// The minimum price increment (tick size).
    pub price_increment: Price,
    /// The minimum size increment.
    pub size_increment: Quantity,
    /// The minimum allowable order quantity.
    pub min_quantity: Quantity,
    /// The maximum allowable order quantity.
    pub max_quantity: Quantity,
    /// The fee rate for liquidity makers as a percentage of order value.
    pub maker_fee: Decimal,
    /// The fee rate for liquidity takers as a percentage of order value.
    pub taker_fee: Decimal,
    /// The base currency of the instrument.
    pub base_currency: Currency,
    /// The quote currency of the instrument.
    pub quote_currency: Currency,
    /// The settlement currency (base for inverse contracts, quote otherwise).
    pub settlement_currency: Currency,
    /// If the instrument costing is inverse (quantity expressed in quote currency units).
    pub is_inverse: bool,
    /// The contract multiplier.
    pub multiplier: Quantity,
    /// UNIX timestamp (nanoseconds) when the data event occurred.
    pub ts_event: UnixNanos,
    /// UNIX timestamp (nanoseconds) when the data object was initialized.
    pub ts_init: UnixNanos,
}

impl Instrument {
    /// Creates a new [`Instrument`] instance with correctness checking.
    ///
    /// # Errors
    ///
    /// Returns an error if any precision, increment or quantity bound is
    /// inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn new_checked(
        id: InstrumentId,
        raw_symbol: Symbol,
        price_precision: u8,
        size_precision: u8,
        price_increment: Price,
        size_increment: Quantity,
        min_quantity: Quantity,
        max_quantity: Quantity,
        maker_fee: Decimal,
        taker_fee: Decimal,
        base_currency: Currency,
        quote_currency: Currency,
        is_inverse: bool,
        multiplier: Quantity,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> anyhow::Result<Self> {
        check_equal_u8(
            price_precision,
            price_increment.precision,
            stringify!(price_precision),
            stringify!(price_increment.precision),
        )?;
        check_equal_u8(
            size_precision,
            size_increment.precision,
            stringify!(size_precision),
            stringify!(size_increment.precision),
        )?;
        check_positive_price(price_increment, stringify!(price_increment))?;
        check_positive_quantity(size_increment, stringify!(size_increment))?;
        check_positive_quantity(min_quantity, stringify!(min_quantity))?;
        check_positive_quantity(multiplier, stringify!(multiplier))?;
        check_predicate_true(
            min_quantity <= max_quantity,
            &format!("`min_quantity` {min_quantity} exceeded `max_quantity` {max_quantity}"),
        )?;

        let settlement_currency = if is_inverse {
            base_currency
        } else {
            quote_currency
        };

        Ok(Self {
            id,
            raw_symbol,
            price_precision,
            size_precision,
            price_increment,
            size_increment,
            min_quantity,
            max_quantity,
            maker_fee,
            taker_fee,
            base_currency,
            quote_currency,
            settlement_currency,
            is_inverse,
            multiplier,
            ts_event,
            ts_init,
        })
    }

    /// Creates a new [`Instrument`] instance.
    ///
    /// # Panics
    ///
    /// Panics if a correctness check fails.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: InstrumentId,
        raw_symbol: Symbol,
        price_precision: u8,
        size_precision: u8,
        price_increment: Price,
        size_increment: Quantity,
        min_quantity: Quantity,
        max_quantity: Quantity,
        maker_fee: Decimal,
        taker_fee: Decimal,
        base_currency: Currency,
        quote_currency: Currency,
        is_inverse: bool,
        multiplier: Quantity,
        ts_event: UnixNanos,
        ts_init: UnixNanos,
    ) -> Self {
        Self::new_checked(
            id,
            raw_symbol,
            price_precision,
            size_precision,
            price_increment,
            size_increment,
            min_quantity,
            max_quantity,
            maker_fee,
            taker_fee,
            base_currency,
            quote_currency,
            is_inverse,
            multiplier,
            ts_event,
            ts_init,
        )
        .expect(FAILED)
    }

    /// Creates a new price with this instruments price precision.
    #[must_use]
    pub fn make_price(&self, value: f64) -> Price {
        Price::new(value, self.price_precision)
    }

    /// Creates a new quantity with this instruments size precision.
    #[must_use]
    pub fn make_qty(&self, value: f64) -> Quantity {
        Quantity::new(value, self.size_precision)
    }

    /// Returns `true` if the given price is aligned to this instruments tick size.
    #[must_use]
    pub const fn is_price_aligned(&self, price: Price) -> bool {
        price.raw % self.price_increment.raw == 0
    }

    /// Calculates the notional value of the given quantity at the given price.
    ///
    /// For inverse instruments the notional is expressed in the base currency,
    /// with the price entering reciprocally; otherwise in the quote currency.
    #[must_use]
    pub fn calculate_notional_value(&self, quantity: Quantity, price: Price) -> Money {
        if self.is_inverse {
            let amount =
                quantity.as_f64() * self.multiplier.as_f64() * (1.0 / price.as_f64());
            Money::new(amount, self.base_currency)
        } else {
            let amount = quantity.as_f64() * self.multiplier.as_f64() * price.as_f64();
            Money::new(amount, self.quote_currency)
        }
    }
}

impl Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", stringify!(Instrument), self.id)
    }
}

pub mod stubs {
    //! Instrument stubs mirroring common test instruments.

    use rust_decimal_macros::dec;
    use tradesim_core::UnixNanos;

    use super::Instrument;
    use crate::{
        identifiers::{InstrumentId, Symbol},
        types::{Currency, Price, Quantity},
    };

    /// Returns the default AUD/USD spot FX instrument on the `SIM` venue.
    #[must_use]
    pub fn audusd_sim() -> Instrument {
        Instrument::new(
            InstrumentId::from("AUD/USD.SIM"),
            Symbol::new("AUD/USD"),
            5,
            0,
            Price::from("0.00001"),
            Quantity::from(1),
            Quantity::from(1_000),
            Quantity::from(10_000_000),
            dec!(0.00002),
            dec!(0.00002),
            Currency::AUD(),
            Currency::USD(),
            false,
            Quantity::from(1),
            UnixNanos::default(),
            UnixNanos::default(),
        )
    }

    /// Returns the default USD/JPY spot FX instrument on the `SIM` venue.
    #[must_use]
    pub fn usdjpy_sim() -> Instrument {
        Instrument::new(
            InstrumentId::from("USD/JPY.SIM"),
            Symbol::new("USD/JPY"),
            3,
            0,
            Price::from("0.001"),
            Quantity::from(1),
            Quantity::from(1_000),
            Quantity::from(10_000_000),
            dec!(0.00002),
            dec!(0.00002),
            Currency::USD(),
            Currency::JPY(),
            false,
            Quantity::from(1),
            UnixNanos::default(),
            UnixNanos::default(),
        )
    }

    /// Returns the XBT/USD inverse perpetual on the `BITMEX` venue.
    #[must_use]
    pub fn xbtusd_bitmex() -> Instrument {
        Instrument::new(
            InstrumentId::from("XBT/USD.BITMEX"),
            Symbol::new("XBTUSD"),
            2,
            0,
            Price::from("0.01"),
            Quantity::from(1),
            Quantity::from(1),
            Quantity::from(10_000_000),
            dec!(-0.00025),
            dec!(0.00075),
            Currency::BTC(),
            Currency::USD(),
            true,
            Quantity::from(1),
            UnixNanos::default(),
            UnixNanos::default(),
        )
    }
}
