//! Supported cryptocurrencies and their confirmation policy.
//!
//! The registry is built once at startup and shared behind an `Arc`; nothing
//! in it is mutable after construction, so concurrent readers need no locking.

use std::collections::HashMap;
use std::num::NonZeroU32;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, PaymentError};

/// Confirmations required for symbols the policy does not list.
pub const DEFAULT_REQUIRED_CONFIRMATIONS: u32 = 6;

const DEFAULT_THRESHOLD: NonZeroU32 = NonZeroU32::new(DEFAULT_REQUIRED_CONFIRMATIONS).unwrap();

/// A cryptocurrency the service can accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoCurrency {
    symbol: String,
    name: String,
    decimals: u32,
    min_amount: Decimal,
    active: bool,
}

impl CryptoCurrency {
    /// Creates a registry entry. The symbol is normalized to uppercase.
    pub fn new(
        symbol: &str,
        name: impl Into<String>,
        decimals: u32,
        min_amount: Decimal,
        active: bool,
    ) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            name: name.into(),
            decimals,
            min_amount,
            active,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn min_amount(&self) -> Decimal {
        self.min_amount
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Checks that `amount` is positive and meets the transferable minimum.
    pub fn validate_amount(&self, amount: Decimal) -> Result<(), PaymentError> {
        if amount <= Decimal::ZERO || amount < self.min_amount {
            return Err(PaymentError::InvalidCryptoAmount {
                symbol: self.symbol.clone(),
                amount,
                minimum: self.min_amount,
            });
        }
        Ok(())
    }

    /// Rounds `amount` to this currency's decimal precision.
    pub fn format_amount(&self, amount: Decimal) -> Decimal {
        amount.round_dp(self.decimals)
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Required confirmation counts per currency symbol.
///
/// Loaded from configuration as a JSON object mapping symbols to positive
/// integers; an optional `"default"` key overrides the fallback used for
/// unlisted symbols:
///
/// ```json
/// { "BTC": 2, "ETH": 12, "XRP": 1, "default": 6 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    thresholds: HashMap<String, NonZeroU32>,
    default: NonZeroU32,
}

impl ConfirmationPolicy {
    const DEFAULT_KEY: &'static str = "default";

    /// Creates an empty policy where every symbol uses `default`.
    pub fn new(default: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            thresholds: HashMap::new(),
            default: positive(Self::DEFAULT_KEY, default.into())?,
        })
    }

    /// Sets the threshold for a single symbol.
    pub fn with_threshold(mut self, symbol: &str, required: u32) -> Result<Self, ConfigError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        let required = positive(&symbol, required.into())?;
        self.thresholds.insert(symbol, required);
        Ok(self)
    }

    /// Parses a policy table from its JSON representation.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let table: HashMap<String, u64> = serde_json::from_str(raw)?;

        let mut default = DEFAULT_THRESHOLD;
        let mut thresholds = HashMap::with_capacity(table.len());

        for (key, value) in table {
            if key.trim().eq_ignore_ascii_case(Self::DEFAULT_KEY) {
                default = positive(Self::DEFAULT_KEY, value)?;
                continue;
            }
            let symbol = normalize_symbol(&key);
            if symbol.is_empty() {
                return Err(ConfigError::EmptySymbol);
            }
            let required = positive(&symbol, value)?;
            if thresholds.insert(symbol.clone(), required).is_some() {
                return Err(ConfigError::DuplicateCurrency(symbol));
            }
        }

        Ok(Self {
            thresholds,
            default,
        })
    }

    /// Returns the confirmations required for `symbol`.
    pub fn required_for(&self, symbol: &str) -> u32 {
        self.thresholds
            .get(&normalize_symbol(symbol))
            .copied()
            .unwrap_or(self.default)
            .get()
    }

    pub fn default_required(&self) -> u32 {
        self.default.get()
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        let table = [
            ("BTC", 2),
            ("ETH", 12),
            ("LTC", 6),
            ("BCH", 6),
            ("XRP", 1),
            ("DOGE", 6),
        ];

        Self {
            thresholds: table
                .into_iter()
                .filter_map(|(symbol, n)| NonZeroU32::new(n).map(|n| (symbol.to_string(), n)))
                .collect(),
            default: DEFAULT_THRESHOLD,
        }
    }
}

fn positive(symbol: &str, value: u64) -> Result<NonZeroU32, ConfigError> {
    u32::try_from(value)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| ConfigError::InvalidThreshold {
            symbol: symbol.to_string(),
            value,
        })
}

/// Lookup table of supported cryptocurrencies plus the confirmation policy.
#[derive(Debug, Clone)]
pub struct CurrencyRegistry {
    currencies: Vec<CryptoCurrency>,
    policy: ConfirmationPolicy,
}

impl CurrencyRegistry {
    /// Builds a registry from an explicit currency table.
    ///
    /// # Validation
    /// - Symbols must be non-empty and unique
    pub fn new(
        currencies: Vec<CryptoCurrency>,
        policy: ConfirmationPolicy,
    ) -> Result<Self, ConfigError> {
        for (i, currency) in currencies.iter().enumerate() {
            if currency.symbol.is_empty() {
                return Err(ConfigError::EmptySymbol);
            }
            if currencies[..i].iter().any(|c| c.symbol == currency.symbol) {
                return Err(ConfigError::DuplicateCurrency(currency.symbol.clone()));
            }
        }
        Ok(Self { currencies, policy })
    }

    /// The built-in currency table with the given confirmation policy.
    pub fn with_policy(policy: ConfirmationPolicy) -> Self {
        Self {
            currencies: builtin_currencies(),
            policy,
        }
    }

    /// Finds an active currency by symbol (case-insensitive, whitespace-trimmed).
    pub fn lookup(&self, symbol: &str) -> Result<&CryptoCurrency, PaymentError> {
        let wanted = normalize_symbol(symbol);
        self.currencies
            .iter()
            .find(|c| c.active && c.symbol == wanted)
            .ok_or_else(|| PaymentError::UnsupportedCrypto(wanted.clone()))
    }

    pub fn is_supported(&self, symbol: &str) -> bool {
        self.lookup(symbol).is_ok()
    }

    /// Returns the confirmations a payment in `currency` needs to complete.
    pub fn required_confirmations(&self, currency: &CryptoCurrency) -> u32 {
        self.policy.required_for(&currency.symbol)
    }

    /// Iterates over all active currencies.
    pub fn supported(&self) -> impl Iterator<Item = &CryptoCurrency> {
        self.currencies.iter().filter(|c| c.active)
    }

    pub fn policy(&self) -> &ConfirmationPolicy {
        &self.policy
    }
}

impl Default for CurrencyRegistry {
    fn default() -> Self {
        Self::with_policy(ConfirmationPolicy::default())
    }
}

fn builtin_currencies() -> Vec<CryptoCurrency> {
    vec![
        CryptoCurrency::new("BTC", "Bitcoin", 8, dec!(0.0001), true),
        CryptoCurrency::new("ETH", "Ethereum", 18, dec!(0.001), true),
        CryptoCurrency::new("LTC", "Litecoin", 8, dec!(0.001), true),
        CryptoCurrency::new("BCH", "Bitcoin Cash", 8, dec!(0.001), true),
        CryptoCurrency::new("XRP", "Ripple", 6, dec!(1.0), true),
        CryptoCurrency::new("DOGE", "Dogecoin", 8, dec!(1.0), true),
    ]
}
