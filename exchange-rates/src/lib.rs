//! Fixed exchange rates for development and testing.
//!
//! Fiat currencies are defined declaratively with their USD rate; crypto
//! prices are a USD quote per coin. Conversion goes fiat → USD → crypto and
//! is rounded to the crypto currency's decimal precision.
//!
//! # Adding a New Fiat Currency
//! Add a line to the `define_fiat_currencies!` invocation:
//! ```ignore
//! define_fiat_currencies! {
//!     // ... existing currencies ...
//!     JPY => ("JPY", "¥", dec!(0.0067)),
//! }
//! ```
//!
//! # Example
//! ```
//! use exchange_rates::FixedRates;
//! use payments_types::CurrencyRegistry;
//! use rust_decimal_macros::dec;
//!
//! let registry = CurrencyRegistry::default();
//! let btc = registry.lookup("BTC").unwrap();
//! let amount = FixedRates::default().convert(dec!(100), "USD", btc).unwrap();
//! assert_eq!(amount, dec!(0.00166667));
//! ```

use std::collections::HashMap;

use payments_types::{CryptoCurrency, ExchangeError, ExchangeRateProvider};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Macro to define fiat currencies with their USD conversion rate.
///
/// # Syntax
/// ```ignore
/// define_fiat_currencies! {
///     Name => ("CODE", "SYMBOL", to_usd_rate),
/// }
/// ```
macro_rules! define_fiat_currencies {
    (
        $(
            $name:ident => ($code:literal, $symbol:literal, $to_usd:expr)
        ),* $(,)?
    ) => {
        /// Fiat currencies the fixed table can convert from.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "UPPERCASE")]
        pub enum FiatCode {
            $($name),*
        }

        impl FiatCode {
            pub fn code(&self) -> &'static str {
                match self {
                    $(FiatCode::$name => $code),*
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $(FiatCode::$name => $symbol),*
                }
            }

            /// USD value of one unit of this currency.
            pub fn to_usd_rate(&self) -> Decimal {
                match self {
                    $(FiatCode::$name => $to_usd),*
                }
            }

            pub fn all() -> &'static [FiatCode] {
                &[$(FiatCode::$name),*]
            }
        }

        impl std::fmt::Display for FiatCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.code())
            }
        }

        impl std::str::FromStr for FiatCode {
            type Err = ExchangeError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($code => Ok(FiatCode::$name),)*
                    _ => Err(ExchangeError::UnsupportedCurrency(s.to_string())),
                }
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// FIAT DEFINITIONS - Add new currencies here!
// ─────────────────────────────────────────────────────────────────────────────

define_fiat_currencies! {
    USD => ("USD", "$", dec!(1.0)),
    EUR => ("EUR", "€", dec!(1.087)),
    GBP => ("GBP", "£", dec!(1.266)),
    INR => ("INR", "₹", dec!(0.01203)),
}

/// USD price per coin used by [`FixedRates::default`].
const DEFAULT_CRYPTO_PRICES: [(&str, Decimal); 6] = [
    ("BTC", dec!(60000)),
    ("ETH", dec!(3000)),
    ("LTC", dec!(80)),
    ("BCH", dec!(400)),
    ("XRP", dec!(0.5)),
    ("DOGE", dec!(0.15)),
];

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// Exchange-rate provider backed by a fixed price table.
#[derive(Debug, Clone)]
pub struct FixedRates {
    usd_prices: HashMap<String, Decimal>,
}

impl FixedRates {
    /// Creates a provider with no crypto prices.
    pub fn empty() -> Self {
        Self {
            usd_prices: HashMap::new(),
        }
    }

    /// Sets the USD price of one coin of `symbol`.
    pub fn with_price(mut self, symbol: &str, usd_price: Decimal) -> Self {
        self.usd_prices
            .insert(symbol.trim().to_uppercase(), usd_price);
        self
    }

    pub fn usd_price(&self, symbol: &str) -> Option<Decimal> {
        self.usd_prices.get(&symbol.trim().to_uppercase()).copied()
    }

    /// Synchronous conversion used by the async port implementation.
    pub fn convert(
        &self,
        amount: Decimal,
        fiat: &str,
        crypto: &CryptoCurrency,
    ) -> Result<Decimal, ExchangeError> {
        let fiat_code: FiatCode = fiat.parse()?;
        let price = self
            .usd_price(crypto.symbol())
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| {
                ExchangeError::RateNotAvailable(fiat_code.to_string(), crypto.symbol().to_string())
            })?;

        let overflow =
            || ExchangeError::Overflow(fiat_code.to_string(), crypto.symbol().to_string());
        let usd = amount
            .checked_mul(fiat_code.to_usd_rate())
            .ok_or_else(overflow)?;
        let converted = usd.checked_div(price).ok_or_else(overflow)?;
        Ok(crypto.format_amount(converted))
    }
}

impl Default for FixedRates {
    fn default() -> Self {
        DEFAULT_CRYPTO_PRICES
            .into_iter()
            .fold(Self::empty(), |rates, (symbol, price)| {
                rates.with_price(symbol, price)
            })
    }
}

#[async_trait::async_trait]
impl ExchangeRateProvider for FixedRates {
    async fn fiat_to_crypto(
        &self,
        amount: Decimal,
        fiat: &str,
        crypto: &CryptoCurrency,
    ) -> Result<Decimal, ExchangeError> {
        self.convert(amount, fiat, crypto)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use payments_types::CurrencyRegistry;

    fn currency(symbol: &str) -> CryptoCurrency {
        CurrencyRegistry::default().lookup(symbol).unwrap().clone()
    }

    #[test]
    fn test_usd_to_btc() {
        let rates = FixedRates::default();
        let amount = rates.convert(dec!(100), "USD", &currency("BTC")).unwrap();
        assert_eq!(amount, dec!(0.00166667));
    }

    #[test]
    fn test_eur_to_eth() {
        let rates = FixedRates::default();
        let amount = rates.convert(dec!(300), "eur", &currency("ETH")).unwrap();
        assert_eq!(amount, dec!(0.1087));
    }

    #[test]
    fn test_result_uses_currency_precision() {
        let rates = FixedRates::default();
        let amount = rates.convert(dec!(1), "INR", &currency("XRP")).unwrap();
        assert_eq!(amount, dec!(0.02406));
        assert!(amount.scale() <= 6);
    }

    #[test]
    fn test_unknown_fiat() {
        let rates = FixedRates::default();
        assert_eq!(
            rates.convert(dec!(1), "JPY", &currency("BTC")),
            Err(ExchangeError::UnsupportedCurrency("JPY".into()))
        );
    }

    #[test]
    fn test_missing_price() {
        let rates = FixedRates::empty().with_price("ETH", dec!(3000));
        assert_eq!(
            rates.convert(dec!(1), "USD", &currency("BTC")),
            Err(ExchangeError::RateNotAvailable("USD".into(), "BTC".into()))
        );
    }

    #[test]
    fn test_amount_too_large_to_convert() {
        let rates = FixedRates::default();
        let amount = Decimal::from_str_exact("70000000000000000000000000000").unwrap();
        assert_eq!(
            rates.convert(amount, "GBP", &currency("DOGE")),
            Err(ExchangeError::Overflow("GBP".into(), "DOGE".into()))
        );
    }

    #[test]
    fn test_tiny_price_overflows_on_division() {
        let rates = FixedRates::empty().with_price("BTC", dec!(0.0000000000000000000000000001));
        let result = rates.convert(Decimal::MAX, "USD", &currency("BTC"));
        assert!(matches!(result, Err(ExchangeError::Overflow(..))));
    }

    #[test]
    fn test_fiat_code_parse_and_display() {
        assert_eq!("gbp".parse::<FiatCode>().unwrap(), FiatCode::GBP);
        assert_eq!(FiatCode::EUR.to_string(), "EUR");
        assert_eq!(FiatCode::EUR.symbol(), "€");
        assert_eq!(FiatCode::all().len(), 4);
    }

    #[tokio::test]
    async fn test_port_implementation() {
        let rates = FixedRates::default();
        let amount = rates
            .fiat_to_crypto(dec!(60000), "USD", &currency("BTC"))
            .await
            .unwrap();
        assert_eq!(amount, dec!(1));
    }
}
