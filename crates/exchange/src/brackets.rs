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

//! Bookkeeping for bracket (OCO/contingent) order families.

use ahash::AHashMap;
use indexmap::IndexMap;
use tradesim_model::{identifiers::ClientOrderId, orders::Order};

/// Tracks bracket order families: dormant children indexed by parent, and
/// OCO sibling links between activated children.
///
/// Dormant children are in `SUBMITTED` state and not in the working book;
/// they activate when the parent entry fills.
#[derive(Clone, Debug, Default)]
pub struct BracketManager {
    dormant: IndexMap<ClientOrderId, Vec<Order>>,
    siblings: AHashMap<ClientOrderId, ClientOrderId>,
}

impl BracketManager {
    /// Creates a new [`BracketManager`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the given children as dormant under their parent entry, and
    /// links them as OCO siblings.
    pub fn register(&mut self, parent_id: ClientOrderId, stop_loss: Order, take_profit: Order) {
        self.siblings
            .insert(stop_loss.client_order_id, take_profit.client_order_id);
        self.siblings
            .insert(take_profit.client_order_id, stop_loss.client_order_id);
        self.dormant
            .insert(parent_id, vec![stop_loss, take_profit]);
    }

    /// Returns `true` if the given order ID has dormant children.
    #[must_use]
    pub fn has_children(&self, parent_id: &ClientOrderId) -> bool {
        self.dormant.contains_key(parent_id)
    }

    /// Removes and returns the dormant children of the given parent, for
    /// activation on entry fill (or cancellation on entry failure).
    pub fn take_children(&mut self, parent_id: &ClientOrderId) -> Option<Vec<Order>> {
        self.dormant.shift_remove(parent_id)
    }

    /// Returns the OCO sibling of the given child order ID.
    #[must_use]
    pub fn sibling_of(&self, client_order_id: &ClientOrderId) -> Option<ClientOrderId> {
        self.siblings.get(client_order_id).copied()
    }

    /// Removes the OCO links for the given child and its sibling, once the
    /// pair has resolved.
    pub fn unlink(&mut self, client_order_id: &ClientOrderId) {
        if let Some(sibling) = self.siblings.remove(client_order_id) {
            self.siblings.remove(&sibling);
        }
    }

    /// Returns an iterator over all dormant children.
    pub fn dormant_orders(&self) -> impl Iterator<Item = &Order> {
        self.dormant.values().flatten()
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
        enums::{OrderSide, TimeInForce},
        identifiers::{InstrumentId, StrategyId, TraderId},
        types::{Price, Quantity},
    };

    use super::*;

    fn child(id: &str, side: OrderSide) -> Order {
        Order::limit(
            TraderId::default(),
            StrategyId::default(),
            InstrumentId::from("USD/JPY.SIM"),
            ClientOrderId::from(id),
            side,
            Quantity::from(100_000),
            Price::from("90.000"),
            false,
            TimeInForce::Gtc,
            None,
            UnixNanos::default(),
        )
    }

    #[rstest]
    fn test_register_take_and_unlink() {
        let mut brackets = BracketManager::new();
        let parent = ClientOrderId::from("O-entry");
        let sl = child("O-sl", OrderSide::Sell);
        let tp = child("O-tp", OrderSide::Sell);
        brackets.register(parent, sl, tp);

        assert!(brackets.has_children(&parent));
        assert_eq!(
            brackets.sibling_of(&ClientOrderId::from("O-sl")),
            Some(ClientOrderId::from("O-tp"))
        );

        let children = brackets.take_children(&parent).unwrap();
        assert_eq!(children.len(), 2);
        assert!(!brackets.has_children(&parent));

        brackets.unlink(&ClientOrderId::from("O-sl"));
        assert_eq!(brackets.sibling_of(&ClientOrderId::from("O-tp")), None);
    }
}
