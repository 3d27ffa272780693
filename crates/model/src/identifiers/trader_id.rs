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

//! Represents a valid trader ID.

use ustr::Ustr;

/// Represents a valid trader ID.
///
/// The value takes the form of `{name}-{tag}` where the tag uniquely
/// distinguishes multiple instances of the same trader name.
#[repr(C)]
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TraderId(Ustr);

impl_identifier_common!(TraderId);
impl_serialization_for_identifier!(TraderId);
impl_from_str_for_identifier!(TraderId);
impl_as_ref_for_identifier!(TraderId);

impl Default for TraderId {
    /// Creates a new default [`TraderId`] instance for testing.
    fn default() -> Self {
        Self::new("TRADER-001")
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::TraderId;

    #[rstest]
    fn test_string_reprs() {
        let trader_id = TraderId::from("TESTER-000");
        assert_eq!(trader_id.as_str(), "TESTER-000");
        assert_eq!(format!("{trader_id}"), "TESTER-000");
    }

    #[rstest]
    #[should_panic(expected = "Condition failed: invalid string for 'value', was empty")]
    fn test_empty_value_panics() {
        let _ = TraderId::new("");
    }
}
