//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Payment, PaymentId, PaymentStatus};

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// Request to open a payment for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: String,
    /// Order total in fiat
    pub amount: Decimal,
    /// Fiat currency code, e.g. "USD"
    pub currency: String,
    /// Crypto symbol the payer will use, e.g. "BTC"
    pub crypto_symbol: String,
    pub wallet_address: String,
    /// Overrides the configured payment window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_address: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

/// Read model of a payment as seen at a given instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub id: PaymentId,
    pub order_id: String,
    pub status: PaymentStatus,
    pub is_completed: bool,
    pub fiat_amount: Decimal,
    pub fiat_currency: String,
    pub crypto_amount: Decimal,
    pub crypto_symbol: String,
    pub wallet_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    pub confirmations: u32,
    pub required_confirmations: u32,
    pub refunded_amount: Decimal,
    pub remaining_refundable_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_transaction_hash: Option<String>,
    pub expires_at: DateTime<Utc>,
    /// Whole seconds left in the payment window, zero once expired
    pub time_until_expiry_secs: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentSummary {
    pub fn from_payment(payment: &Payment, now: DateTime<Utc>) -> Self {
        Self {
            id: payment.id(),
            order_id: payment.order_id().to_string(),
            status: payment.status(),
            is_completed: payment.is_completed(),
            fiat_amount: payment.fiat().amount(),
            fiat_currency: payment.fiat().currency().to_string(),
            crypto_amount: payment.crypto_amount(),
            crypto_symbol: payment.crypto_symbol().to_string(),
            wallet_address: payment.wallet_address().to_string(),
            transaction_hash: payment.transaction_hash().map(str::to_string),
            confirmations: payment.confirmations(),
            required_confirmations: payment.required_confirmations(),
            refunded_amount: payment.refunded_amount(),
            remaining_refundable_amount: payment.remaining_refundable_amount(),
            refund_transaction_hash: payment.refund_transaction_hash().map(str::to_string),
            expires_at: payment.expires_at(),
            time_until_expiry_secs: payment.time_until_expiry(now).num_seconds(),
            created_at: payment.created_at(),
            updated_at: payment.updated_at(),
        }
    }
}
