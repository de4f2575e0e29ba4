//! Payment aggregate root.
//!
//! All state changes go through the methods below. Each one checks its guards
//! before touching any field, so a rejected call leaves the payment exactly as
//! it was. Time is always supplied by the caller; the aggregate never reads the
//! clock.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::currency::{CryptoCurrency, CurrencyRegistry};
use super::money::FiatMoney;
use super::payment_method::PaymentMethod;
use super::status::{PaymentStatus, Transition};
use crate::error::PaymentError;

/// Relative tolerance applied when matching a received amount (0.01%).
pub const RECEIVED_AMOUNT_TOLERANCE: Decimal = dec!(0.0001);

/// Unique identifier for a Payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new random PaymentId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a PaymentId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PaymentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A cryptocurrency payment for one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    order_id: String,
    fiat: FiatMoney,
    crypto_amount: Decimal,
    status: PaymentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    method: PaymentMethod,
    transaction_hash: Option<String>,
    confirmations: u32,
    required_confirmations: u32,
    provider_id: Option<String>,
    callback_address: Option<String>,
    refunded_amount: Decimal,
    refund_transaction_hash: Option<String>,
    refunded_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Creates a pending payment.
    ///
    /// The crypto amount starts at zero and is set once the exchange rate is
    /// known. The required confirmation count is captured here from the
    /// registry's policy and never changes afterwards.
    ///
    /// # Validation
    /// - Order ID cannot be empty
    /// - Fiat amount must be positive and the fiat code non-empty
    /// - Wallet address cannot be empty and the crypto symbol must be supported
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: &CurrencyRegistry,
        order_id: &str,
        amount: Decimal,
        currency: &str,
        crypto_symbol: &str,
        wallet_address: &str,
        expiry_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, PaymentError> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(PaymentError::EmptyOrderId);
        }

        let fiat = FiatMoney::new(amount, currency)?;
        let method =
            PaymentMethod::create(registry, crypto_symbol, wallet_address, expiry_minutes, now)?;
        let required_confirmations = registry.required_confirmations(method.currency());

        Ok(Self {
            id: PaymentId::new(),
            order_id: order_id.to_string(),
            fiat,
            crypto_amount: Decimal::ZERO,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
            method,
            transaction_hash: None,
            confirmations: 0,
            required_confirmations,
            provider_id: None,
            callback_address: None,
            refunded_amount: Decimal::ZERO,
            refund_transaction_hash: None,
            refunded_at: None,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metadata
    // ─────────────────────────────────────────────────────────────────────────

    /// Sets the crypto amount the payer must send. Allowed until the payment
    /// is final; re-validated against the currency minimum on every call.
    pub fn set_crypto_amount(
        &mut self,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        self.ensure_not_final()?;
        self.method.validate_amount(amount)?;

        self.crypto_amount = amount;
        self.updated_at = now;
        Ok(())
    }

    /// Records the external provider's reference for this payment.
    pub fn set_provider_id(
        &mut self,
        provider_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        self.ensure_not_final()?;
        let provider_id = non_empty(provider_id).ok_or(PaymentError::EmptyProviderId)?;

        self.provider_id = Some(provider_id);
        self.updated_at = now;
        Ok(())
    }

    /// Sets (or clears, when blank) the address notified on status changes.
    pub fn set_callback_address(
        &mut self,
        callback_address: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        self.ensure_not_final()?;

        self.callback_address = non_empty(callback_address);
        self.updated_at = now;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blockchain progress
    // ─────────────────────────────────────────────────────────────────────────

    /// A transaction paying this payment was seen on-chain.
    pub fn mark_confirming(
        &mut self,
        transaction_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        let next = self.status.apply(Transition::DetectTransaction)?;
        if self.is_expired(now) {
            return Err(PaymentError::Expired {
                expired_at: self.expires_at(),
            });
        }
        let hash = non_empty(transaction_hash).ok_or(PaymentError::InvalidTransactionHash)?;

        self.status = next;
        self.transaction_hash = Some(hash);
        self.confirmations = 0;
        self.updated_at = now;
        Ok(())
    }

    /// Applies an observed confirmation count.
    ///
    /// Promotes to `Confirmed` once `count` reaches the required threshold.
    /// Repeating the current count is a no-op; a lower count is rejected.
    pub fn update_confirmations(
        &mut self,
        count: i64,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        if self.status != PaymentStatus::Confirming {
            return Err(PaymentError::InvalidStatusTransition {
                from: self.status,
                operation: "update confirmations",
            });
        }
        if count < 0 {
            return Err(PaymentError::NegativeConfirmations(count));
        }
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        if count < self.confirmations {
            return Err(PaymentError::ConfirmationRegression {
                current: self.confirmations,
                received: count,
            });
        }
        if count == self.confirmations {
            return Ok(());
        }

        let next = if count >= self.required_confirmations {
            self.status.apply(Transition::ReachThreshold)?
        } else {
            self.status
        };

        self.confirmations = count;
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status changes
    // ─────────────────────────────────────────────────────────────────────────

    /// Operator override: confirms from `Pending`, `Confirming` or `Failed`.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> Result<(), PaymentError> {
        self.transition(Transition::ManualConfirm, now)
    }

    pub fn mark_failed(&mut self, now: DateTime<Utc>) -> Result<(), PaymentError> {
        self.transition(Transition::Fail, now)
    }

    pub fn mark_expired(&mut self, now: DateTime<Utc>) -> Result<(), PaymentError> {
        self.transition(Transition::Expire, now)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), PaymentError> {
        self.transition(Transition::Cancel, now)
    }

    fn transition(&mut self, transition: Transition, now: DateTime<Utc>) -> Result<(), PaymentError> {
        self.status = self.status.apply(transition)?;
        self.updated_at = now;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Refunds
    // ─────────────────────────────────────────────────────────────────────────

    /// Refunds `amount`, or everything still refundable when `None`.
    ///
    /// A payment gets exactly one refund: a partial refund keeps it
    /// `Confirmed`, but any further refund is rejected.
    pub fn refund(&mut self, amount: Option<Decimal>, now: DateTime<Utc>) -> Result<(), PaymentError> {
        let (refunded, next) = self.plan_refund(amount)?;
        self.apply_refund(refunded, next, now);
        Ok(())
    }

    /// Refund plus the on-chain hash of the refund transaction, as one step.
    pub fn settle_refund(
        &mut self,
        amount: Option<Decimal>,
        transaction_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        let hash = non_empty(transaction_hash).ok_or(PaymentError::InvalidTransactionHash)?;
        let (refunded, next) = self.plan_refund(amount)?;

        self.apply_refund(refunded, next, now);
        self.refund_transaction_hash = Some(hash);
        Ok(())
    }

    /// Records the refund's transaction hash after the refund itself.
    pub fn set_refund_transaction_hash(
        &mut self,
        transaction_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        if self.refunded_amount <= Decimal::ZERO {
            return Err(PaymentError::NoRefundRecorded);
        }
        let hash = non_empty(transaction_hash).ok_or(PaymentError::InvalidTransactionHash)?;

        self.refund_transaction_hash = Some(hash);
        self.updated_at = now;
        Ok(())
    }

    fn plan_refund(&self, amount: Option<Decimal>) -> Result<(Decimal, PaymentStatus), PaymentError> {
        if !self.status.can_be_refunded() {
            return Err(PaymentError::CannotRefund(self.status));
        }

        let remaining = self.crypto_amount - self.refunded_amount;
        let amount = amount.unwrap_or(remaining);
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidRefundAmount);
        }
        if amount > remaining {
            return Err(PaymentError::RefundExceedsPayment {
                requested: amount,
                remaining,
            });
        }
        if self.refunded_amount > Decimal::ZERO {
            return Err(PaymentError::RefundAlreadyProcessed);
        }

        let refunded = self.refunded_amount + amount;
        let transition = if refunded == self.crypto_amount {
            Transition::FullRefund
        } else {
            Transition::PartialRefund
        };
        Ok((refunded, self.status.apply(transition)?))
    }

    fn apply_refund(&mut self, refunded: Decimal, next: PaymentStatus, now: DateTime<Utc>) {
        self.refunded_amount = refunded;
        self.refunded_at = Some(now);
        self.status = next;
        self.updated_at = now;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checks
    // ─────────────────────────────────────────────────────────────────────────

    /// Compares an on-chain amount with the expected crypto amount, allowing
    /// [`RECEIVED_AMOUNT_TOLERANCE`] of relative drift either way.
    pub fn validate_received_amount(&self, received: Decimal) -> Result<(), PaymentError> {
        let expected = self.crypto_amount;
        let tolerance = expected * RECEIVED_AMOUNT_TOLERANCE;

        if received < expected.saturating_sub(tolerance) {
            return Err(PaymentError::InsufficientAmount { expected, received });
        }
        if received > expected.saturating_add(tolerance) {
            return Err(PaymentError::ExcessiveAmount { expected, received });
        }
        Ok(())
    }

    fn ensure_not_final(&self) -> Result<(), PaymentError> {
        if self.status.is_final() {
            return Err(PaymentError::FinalPayment(self.status));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn fiat(&self) -> &FiatMoney {
        &self.fiat
    }

    pub fn crypto_amount(&self) -> Decimal {
        self.crypto_amount
    }

    pub fn crypto_currency(&self) -> &CryptoCurrency {
        self.method.currency()
    }

    pub fn crypto_symbol(&self) -> &str {
        self.method.crypto_symbol()
    }

    pub fn wallet_address(&self) -> &str {
        self.method.wallet_address()
    }

    pub fn method(&self) -> &PaymentMethod {
        &self.method
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.method.expires_at()
    }

    pub fn transaction_hash(&self) -> Option<&str> {
        self.transaction_hash.as_deref()
    }

    pub fn confirmations(&self) -> u32 {
        self.confirmations
    }

    pub fn required_confirmations(&self) -> u32 {
        self.required_confirmations
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.provider_id.as_deref()
    }

    pub fn callback_address(&self) -> Option<&str> {
        self.callback_address.as_deref()
    }

    pub fn refunded_amount(&self) -> Decimal {
        self.refunded_amount
    }

    pub fn refund_transaction_hash(&self) -> Option<&str> {
        self.refund_transaction_hash.as_deref()
    }

    pub fn refunded_at(&self) -> Option<DateTime<Utc>> {
        self.refunded_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.method.is_expired(now)
    }

    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.method.time_until_expiry(now)
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    pub fn is_confirming(&self) -> bool {
        self.status == PaymentStatus::Confirming
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_be_cancelled()
    }

    pub fn can_be_refunded(&self) -> bool {
        self.status.can_be_refunded()
    }

    /// Crypto amount that a refund could still return; zero unless refundable.
    pub fn remaining_refundable_amount(&self) -> Decimal {
        if !self.can_be_refunded() {
            return Decimal::ZERO;
        }
        self.crypto_amount - self.refunded_amount
    }

    pub fn is_fully_refunded(&self) -> bool {
        self.refunded_amount > Decimal::ZERO && self.refunded_amount >= self.crypto_amount
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
