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

//! Virtual clock interfaces for deterministic timestamping.

use std::fmt::Debug;

use tradesim_core::UnixNanos;

/// A monotonic virtual timestamp source.
///
/// The engine never reads wall-clock time; command-origin events are stamped
/// from the injected clock, reactive events from the causing tick.
pub trait Clock: Debug {
    /// Returns the current UNIX timestamp (nanoseconds).
    fn timestamp_ns(&self) -> UnixNanos;
}

/// A controllable clock for backtesting and testing.
#[derive(Debug, Clone, Default)]
pub struct TestClock {
    time: UnixNanos,
}

impl TestClock {
    /// Creates a new [`TestClock`] instance at the UNIX epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the clock to the given time.
    pub fn set_time(&mut self, to_time_ns: UnixNanos) {
        self.time = to_time_ns;
    }

    /// Advances the clock by the given number of nanoseconds.
    pub fn advance_time(&mut self, by_ns: u64) {
        self.time += by_ns;
    }
}

impl Clock for TestClock {
    fn timestamp_ns(&self) -> UnixNanos {
        self.time
    }
}
