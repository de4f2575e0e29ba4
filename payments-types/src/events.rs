//! Inbound blockchain/provider events.
//!
//! Confirmation polling and provider webhooks are both reduced to these
//! messages before they reach a payment.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Payment, PaymentId};
use crate::error::PaymentError;

/// An externally observed fact about one payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentEvent {
    /// A transaction paying the payment's wallet was seen on-chain.
    TransactionDetected {
        payment_id: PaymentId,
        transaction_hash: String,
    },
    /// The observed transaction's confirmation depth changed.
    ConfirmationUpdate {
        payment_id: PaymentId,
        confirmation_count: i64,
    },
    /// A refund was sent back to the payer. No amount means everything left.
    RefundSettlement {
        payment_id: PaymentId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<Decimal>,
        transaction_hash: String,
    },
}

impl PaymentEvent {
    pub fn payment_id(&self) -> PaymentId {
        match self {
            PaymentEvent::TransactionDetected { payment_id, .. }
            | PaymentEvent::ConfirmationUpdate { payment_id, .. }
            | PaymentEvent::RefundSettlement { payment_id, .. } => *payment_id,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            PaymentEvent::TransactionDetected { .. } => "transaction_detected",
            PaymentEvent::ConfirmationUpdate { .. } => "confirmation_update",
            PaymentEvent::RefundSettlement { .. } => "refund_settlement",
        }
    }

    /// Feeds the event into `payment`.
    pub fn apply(&self, payment: &mut Payment, now: DateTime<Utc>) -> Result<(), PaymentError> {
        match self {
            PaymentEvent::TransactionDetected {
                transaction_hash, ..
            } => payment.mark_confirming(transaction_hash, now),
            PaymentEvent::ConfirmationUpdate {
                confirmation_count, ..
            } => payment.update_confirmations(*confirmation_count, now),
            PaymentEvent::RefundSettlement {
                amount,
                transaction_hash,
                ..
            } => payment.settle_refund(*amount, transaction_hash, now),
        }
    }
}
