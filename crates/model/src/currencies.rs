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

//! Common `Currency` constants.

use std::{
    collections::HashMap,
    sync::{LazyLock, Mutex, OnceLock},
};

use crate::{enums::CurrencyType, types::Currency};

///////////////////////////////////////////////////////////////////////////////
// Fiat currencies
///////////////////////////////////////////////////////////////////////////////
static AUD_LOCK: OnceLock<Currency> = OnceLock::new();
static EUR_LOCK: OnceLock<Currency> = OnceLock::new();
static GBP_LOCK: OnceLock<Currency> = OnceLock::new();
static JPY_LOCK: OnceLock<Currency> = OnceLock::new();
static USD_LOCK: OnceLock<Currency> = OnceLock::new();

///////////////////////////////////////////////////////////////////////////////
// Crypto currencies
///////////////////////////////////////////////////////////////////////////////
static BTC_LOCK: OnceLock<Currency> = OnceLock::new();
static ETH_LOCK: OnceLock<Currency> = OnceLock::new();
static USDT_LOCK: OnceLock<Currency> = OnceLock::new();

#[allow(non_snake_case)]
impl Currency {
    /// Returns the Australian dollar currency.
    pub fn AUD() -> Self {
        *AUD_LOCK
            .get_or_init(|| Self::new("AUD", 2, 36, "Australian dollar", CurrencyType::Fiat))
    }

    /// Returns the Euro currency.
    pub fn EUR() -> Self {
        *EUR_LOCK.get_or_init(|| Self::new("EUR", 2, 978, "Euro", CurrencyType::Fiat))
    }

    /// Returns the British pound currency.
    pub fn GBP() -> Self {
        *GBP_LOCK.get_or_init(|| Self::new("GBP", 2, 826, "British pound", CurrencyType::Fiat))
    }

    /// Returns the Japanese yen currency.
    pub fn JPY() -> Self {
        *JPY_LOCK.get_or_init(|| Self::new("JPY", 2, 392, "Japanese yen", CurrencyType::Fiat))
    }

    /// Returns the United States dollar currency.
    pub fn USD() -> Self {
        *USD_LOCK
            .get_or_init(|| Self::new("USD", 2, 840, "United States dollar", CurrencyType::Fiat))
    }

    /// Returns the Bitcoin currency.
    pub fn BTC() -> Self {
        *BTC_LOCK.get_or_init(|| Self::new("BTC", 8, 0, "Bitcoin", CurrencyType::Crypto))
    }

    /// Returns the Ether currency.
    pub fn ETH() -> Self {
        *ETH_LOCK.get_or_init(|| Self::new("ETH", 8, 0, "Ether", CurrencyType::Crypto))
    }

    /// Returns the Tether currency.
    pub fn USDT() -> Self {
        *USDT_LOCK.get_or_init(|| Self::new("USDT", 8, 0, "Tether", CurrencyType::Crypto))
    }
}

/// The global currency map, keyed by uppercase currency code.
pub static CURRENCY_MAP: LazyLock<Mutex<HashMap<String, Currency>>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for currency in [
        Currency::AUD(),
        Currency::EUR(),
        Currency::GBP(),
        Currency::JPY(),
        Currency::USD(),
        Currency::BTC(),
        Currency::ETH(),
        Currency::USDT(),
    ] {
        map.insert(currency.code.to_string(), currency);
    }
    Mutex::new(map)
});

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_fiat_precisions() {
        assert_eq!(Currency::USD().precision, 2);
        assert_eq!(Currency::JPY().precision, 2);
    }

    #[rstest]
    fn test_crypto_precisions() {
        assert_eq!(Currency::BTC().precision, 8);
        assert_eq!(Currency::ETH().precision, 8);
    }

    #[rstest]
    fn test_currency_map_contains_constants() {
        let map = CURRENCY_MAP.lock().unwrap();
        assert!(map.contains_key("USD"));
        assert!(map.contains_key("BTC"));
    }
}
