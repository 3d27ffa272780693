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

//! A deterministic simulated venue matching engine for backtesting on
//! historical data.
//!
//! The engine is single-threaded and cooperative. It is driven entirely by
//! two externally-delivered sequences (market ticks and trading commands) and
//! emits a totally-ordered event stream to an injected [`bus::EventBus`].
//! Replaying identical inputs with an identically-seeded fill model
//! reproduces the same fills, positions and account balances.

pub mod book;
pub mod brackets;
pub mod bus;
pub mod clock;
pub mod config;
pub mod engine;
pub mod ids;
pub mod ledger;
pub mod messages;
pub mod models;

#[cfg(test)]
mod tests;

pub use crate::{config::ExchangeConfig, engine::MatchingEngine};
