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

//! Represents a valid client order ID (assigned by the trading system).

use ustr::Ustr;

/// Represents a valid client order ID (assigned by the trading system).
#[repr(C)]
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClientOrderId(Ustr);

impl_identifier_common!(ClientOrderId);
impl_serialization_for_identifier!(ClientOrderId);
impl_from_str_for_identifier!(ClientOrderId);
impl_as_ref_for_identifier!(ClientOrderId);

impl Default for ClientOrderId {
    /// Creates a new default [`ClientOrderId`] instance for testing.
    fn default() -> Self {
        Self::new("O-19700101-000000-001-001-1")
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::ClientOrderId;

    #[rstest]
    fn test_string_reprs() {
        let client_order_id = ClientOrderId::default();
        assert_eq!(client_order_id.as_str(), "O-19700101-000000-001-001-1");
    }
}
