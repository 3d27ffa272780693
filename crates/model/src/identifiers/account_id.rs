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

//! Represents a valid account ID.

use ustr::Ustr;

/// Represents a valid account ID.
///
/// The value takes the form of `{issuer}-{number}` (e.g. `"SIM-001"`).
#[repr(C)]
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct AccountId(Ustr);

impl_identifier_common!(AccountId);
impl_serialization_for_identifier!(AccountId);
impl_from_str_for_identifier!(AccountId);
impl_as_ref_for_identifier!(AccountId);

impl Default for AccountId {
    /// Creates a new default [`AccountId`] instance for testing.
    fn default() -> Self {
        Self::new("SIM-001")
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::AccountId;

    #[rstest]
    fn test_issuer_number_form() {
        let account_id = AccountId::from("SIM-001");
        assert_eq!(account_id.as_str(), "SIM-001");
    }

    #[rstest]
    fn test_serde_round_trip() {
        let account_id = AccountId::from("SIM-001");
        let json = serde_json::to_string(&account_id).unwrap();
        assert_eq!(json, "\"SIM-001\"");
        let deserialized: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, account_id);
    }
}
