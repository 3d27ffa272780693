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

//! Commission models for the simulated venue.

use rust_decimal::prelude::ToPrimitive;
use tradesim_model::{
    enums::LiquiditySide,
    instruments::Instrument,
    orders::Order,
    types::{Money, Price, Quantity},
};

/// A model producing the commission for a fill.
pub trait FeeModel {
    /// Returns the commission for the given fill.
    ///
    /// # Errors
    ///
    /// Returns an error if the commission cannot be computed (e.g. no
    /// liquidity side has been assigned to the order).
    fn get_commission(
        &self,
        order: &Order,
        fill_quantity: Quantity,
        fill_px: Price,
        instrument: &Instrument,
    ) -> anyhow::Result<Money>;
}

/// A dispatch enum over the supported fee models.
#[derive(Clone, Debug)]
pub enum FeeModelAny {
    /// A fixed per-order commission.
    Fixed(FixedFeeModel),
    /// Commission as the instrument maker/taker rate applied to notional.
    MakerTaker(MakerTakerFeeModel),
}

impl FeeModel for FeeModelAny {
    fn get_commission(
        &self,
        order: &Order,
        fill_quantity: Quantity,
        fill_px: Price,
        instrument: &Instrument,
    ) -> anyhow::Result<Money> {
        match self {
            Self::Fixed(model) => model.get_commission(order, fill_quantity, fill_px, instrument),
            Self::MakerTaker(model) => {
                model.get_commission(order, fill_quantity, fill_px, instrument)
            }
        }
    }
}

impl Default for FeeModelAny {
    fn default() -> Self {
        Self::MakerTaker(MakerTakerFeeModel)
    }
}

/// A fee model charging a fixed commission, by default only on the first fill
/// of an order.
#[derive(Debug, Clone)]
pub struct FixedFeeModel {
    commission: Money,
    zero_commission: Money,
    charge_commission_once: bool,
}

impl FixedFeeModel {
    /// Creates a new [`FixedFeeModel`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if `commission` is negative.
    pub fn new(commission: Money, charge_commission_once: Option<bool>) -> anyhow::Result<Self> {
        if commission.as_f64() < 0.0 {
            anyhow::bail!("Commission must be greater than or equal to zero.")
        }
        let zero_commission = Money::zero(commission.currency);
        Ok(Self {
            commission,
            zero_commission,
            charge_commission_once: charge_commission_once.unwrap_or(true),
        })
    }
}

impl FeeModel for FixedFeeModel {
    fn get_commission(
        &self,
        order: &Order,
        _fill_quantity: Quantity,
        _fill_px: Price,
        _instrument: &Instrument,
    ) -> anyhow::Result<Money> {
        if !self.charge_commission_once || order.filled_qty.is_zero() {
            Ok(self.commission)
        } else {
            Ok(self.zero_commission)
        }
    }
}

/// A fee model applying the instrument maker/taker rate to the fill notional.
///
/// Inverse instruments are commissioned in the base currency.
#[derive(Debug, Clone)]
pub struct MakerTakerFeeModel;

impl FeeModel for MakerTakerFeeModel {
    fn get_commission(
        &self,
        order: &Order,
        fill_quantity: Quantity,
        fill_px: Price,
        instrument: &Instrument,
    ) -> anyhow::Result<Money> {
        let rate = match order.liquidity_side {
            Some(LiquiditySide::Maker) => instrument.maker_fee,
            Some(LiquiditySide::Taker) => instrument.taker_fee,
            Some(LiquiditySide::NoLiquiditySide) | None => {
                anyhow::bail!("Liquidity side not set.")
            }
        };

        // Exact decimal notional, rounded half-even at the currency precision
        let (notional, currency) = if instrument.is_inverse {
            (
                fill_quantity.as_decimal() * instrument.multiplier.as_decimal()
                    / fill_px.as_decimal(),
                instrument.base_currency,
            )
        } else {
            (
                fill_quantity.as_decimal()
                    * instrument.multiplier.as_decimal()
                    * fill_px.as_decimal(),
                instrument.quote_currency,
            )
        };
        let commission = (notional * rate).round_dp(u32::from(currency.precision));
        Ok(Money::new(commission.to_f64().unwrap(), currency))
    }
}
