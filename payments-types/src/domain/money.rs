//! Fiat amount with its currency code.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PaymentError;

/// The fiat side of a payment: what the order was priced at.
///
/// The currency code is stored trimmed and uppercased (`"usd "` → `"USD"`).
/// Which codes are convertible is the exchange-rate provider's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiatMoney {
    amount: Decimal,
    currency: String,
}

impl FiatMoney {
    /// Creates a new fiat amount.
    ///
    /// # Validation
    /// - Amount must be positive
    /// - Currency code cannot be empty
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, PaymentError> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount);
        }
        let currency = currency.trim();
        if currency.is_empty() {
            return Err(PaymentError::InvalidCurrency);
        }
        Ok(Self {
            amount,
            currency: currency.to_ascii_uppercase(),
        })
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl fmt::Display for FiatMoney {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}
