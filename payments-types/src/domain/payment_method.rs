//! Payment method value object.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::currency::{CryptoCurrency, CurrencyRegistry};
use crate::error::PaymentError;

/// Where and until when a payment can be made: a currency, a destination
/// wallet and an expiry instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    currency: CryptoCurrency,
    wallet_address: String,
    expires_at: DateTime<Utc>,
}

impl PaymentMethod {
    /// Creates a payment method that expires `expiry_minutes` after `now`.
    ///
    /// # Validation
    /// - Wallet address cannot be empty
    /// - Currency must be known to the registry and active
    pub fn create(
        registry: &CurrencyRegistry,
        symbol: &str,
        wallet_address: &str,
        expiry_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, PaymentError> {
        let wallet_address = wallet_address.trim();
        if wallet_address.is_empty() {
            return Err(PaymentError::InvalidWalletAddress);
        }

        let currency = registry.lookup(symbol)?.clone();

        Ok(Self {
            currency,
            wallet_address: wallet_address.to_string(),
            expires_at: now + Duration::minutes(i64::from(expiry_minutes)),
        })
    }

    pub fn currency(&self) -> &CryptoCurrency {
        &self.currency
    }

    pub fn crypto_symbol(&self) -> &str {
        self.currency.symbol()
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once `now` is strictly past the expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Time left before expiry, never negative.
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }

    pub fn validate_amount(&self, amount: Decimal) -> Result<(), PaymentError> {
        self.currency.validate_amount(amount)
    }

    /// Not expired and the currency is still accepted.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && self.currency.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    const WALLET: &str = "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_create_valid_method() {
        let registry = CurrencyRegistry::default();
        let method = PaymentMethod::create(&registry, "BTC", WALLET, 30, t0()).unwrap();

        assert_eq!(method.crypto_symbol(), "BTC");
        assert_eq!(method.wallet_address(), WALLET);
        assert_eq!(method.expires_at(), t0() + Duration::minutes(30));
        assert!(!method.is_expired(t0()));
        assert!(method.is_active(t0()));
    }

    #[test]
    fn test_empty_wallet_address_fails() {
        let registry = CurrencyRegistry::default();
        let result = PaymentMethod::create(&registry, "BTC", "   ", 30, t0());
        assert_eq!(result, Err(PaymentError::InvalidWalletAddress));
    }

    #[test]
    fn test_unsupported_currency_fails() {
        let registry = CurrencyRegistry::default();
        let result = PaymentMethod::create(&registry, "INVALID", "address123", 30, t0());
        assert!(matches!(result, Err(PaymentError::UnsupportedCrypto(_))));
    }

    #[test]
    fn test_zero_minute_method_expires_after_any_time() {
        let registry = CurrencyRegistry::default();
        let method = PaymentMethod::create(&registry, "BTC", "address123", 0, t0()).unwrap();

        assert!(!method.is_expired(t0()));
        let later = t0() + Duration::milliseconds(1);
        assert!(method.is_expired(later));
        assert!(!method.is_active(later));
        assert_eq!(method.time_until_expiry(later), Duration::zero());
    }

    #[test]
    fn test_time_until_expiry() {
        let registry = CurrencyRegistry::default();
        let method = PaymentMethod::create(&registry, "BTC", "address123", 30, t0()).unwrap();

        let remaining = method.time_until_expiry(t0() + Duration::seconds(90));
        assert_eq!(remaining, Duration::minutes(28) + Duration::seconds(30));
    }

    #[test]
    fn test_validate_amount_uses_currency_minimum() {
        let registry = CurrencyRegistry::default();
        let method = PaymentMethod::create(&registry, "BTC", WALLET, 30, t0()).unwrap();

        assert!(method.validate_amount(dec!(0.001)).is_ok());
        assert!(matches!(
            method.validate_amount(dec!(0.00001)),
            Err(PaymentError::InvalidCryptoAmount { .. })
        ));
    }
}
