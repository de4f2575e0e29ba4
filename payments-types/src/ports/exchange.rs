//! Exchange rate provider port.
//!
//! Implementations can be HTTP clients, fixed tables, mocks, etc.

use rust_decimal::Decimal;

use crate::domain::CryptoCurrency;

/// Error type for exchange rate operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExchangeError {
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Rate not available for {0} -> {1}")]
    RateNotAvailable(String, String),

    #[error("Amount out of range converting {0} -> {1}")]
    Overflow(String, String),
}

/// Port trait for fiat → crypto conversion.
#[async_trait::async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Converts `amount` of the fiat currency `fiat` into `crypto`.
    ///
    /// The result is expected at the crypto currency's decimal precision.
    async fn fiat_to_crypto(
        &self,
        amount: Decimal,
        fiat: &str,
        crypto: &CryptoCurrency,
    ) -> Result<Decimal, ExchangeError>;
}
