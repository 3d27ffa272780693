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

//! The event sink the venue emits to, in exact causal order.

use tradesim_model::events::{EventAny, OrderEventAny};

/// A sink for events emitted by the matching engine.
///
/// Implementations receive events by value, in the exact causal order they
/// occurred. The engine never reads events back.
pub trait EventBus {
    /// Publishes the given event to the bus.
    fn publish(&mut self, event: EventAny);
}

/// An event bus which records every published event, for tests and replay
/// verification.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Vec<EventAny>,
}

impl EventRecorder {
    /// Creates a new [`EventRecorder`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events in publication order.
    #[must_use]
    pub fn events(&self) -> &[EventAny] {
        &self.events
    }

    /// Returns only the recorded order events, in publication order.
    #[must_use]
    pub fn order_events(&self) -> Vec<OrderEventAny> {
        self.events
            .iter()
            .filter_map(|event| match event {
                EventAny::Order(order_event) => Some(*order_event),
                _ => None,
            })
            .collect()
    }

    /// Clears all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventBus for EventRecorder {
    fn publish(&mut self, event: EventAny) {
        self.events.push(event);
    }
}
