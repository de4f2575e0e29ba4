//! Error types for the payment service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::PaymentStatus;
use crate::ports::{ExchangeError, OrderError};

/// Broad classification of a [`PaymentError`].
///
/// Callers that only care about *why* an operation was refused (surface to a
/// user, drop a duplicate webhook, alert on upstream drift) match on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    StateTransition,
    Temporal,
    Refund,
    External,
    AmountMismatch,
}

/// Domain-level errors returned by the payment aggregate and its value objects.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentError {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Order ID cannot be empty")]
    EmptyOrderId,

    #[error("Payment amount must be positive")]
    InvalidAmount,

    #[error("Fiat currency code cannot be empty")]
    InvalidCurrency,

    #[error("Provider payment ID cannot be empty")]
    EmptyProviderId,

    #[error("Wallet address cannot be empty")]
    InvalidWalletAddress,

    #[error("Transaction hash cannot be empty")]
    InvalidTransactionHash,

    #[error("Cryptocurrency not supported: {0}")]
    UnsupportedCrypto(String),

    #[error("Invalid {symbol} amount {amount}: must be at least {minimum}")]
    InvalidCryptoAmount {
        symbol: String,
        amount: Decimal,
        minimum: Decimal,
    },

    #[error("Refund amount must be positive")]
    InvalidRefundAmount,

    // ─────────────────────────────────────────────────────────────────────────
    // State transitions
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid status transition: cannot {operation} while {from}")]
    InvalidStatusTransition {
        from: PaymentStatus,
        operation: &'static str,
    },

    #[error("Payment is already confirmed")]
    AlreadyConfirmed,

    #[error("Payment cannot be confirmed from {0}")]
    CannotConfirm(PaymentStatus),

    #[error("Payment cannot be cancelled from {0}")]
    CannotCancel(PaymentStatus),

    #[error("Payment cannot be refunded from {0}")]
    CannotRefund(PaymentStatus),

    #[error("Cannot modify a finalized payment ({0})")]
    FinalPayment(PaymentStatus),

    // ─────────────────────────────────────────────────────────────────────────
    // Temporal
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Payment expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    // ─────────────────────────────────────────────────────────────────────────
    // Refunds
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Refund of {requested} exceeds refundable amount {remaining}")]
    RefundExceedsPayment {
        requested: Decimal,
        remaining: Decimal,
    },

    #[error("Refund already processed")]
    RefundAlreadyProcessed,

    #[error("No refund has been recorded for this payment")]
    NoRefundRecorded,

    // ─────────────────────────────────────────────────────────────────────────
    // Externally observed facts
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Confirmation count cannot be negative: {0}")]
    NegativeConfirmations(i64),

    #[error("Confirmation count regressed from {current} to {received}")]
    ConfirmationRegression { current: u32, received: u32 },

    // ─────────────────────────────────────────────────────────────────────────
    // Received amount checks
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Received amount {received} is below expected {expected}")]
    InsufficientAmount { expected: Decimal, received: Decimal },

    #[error("Received amount {received} exceeds expected {expected}")]
    ExcessiveAmount { expected: Decimal, received: Decimal },
}

impl PaymentError {
    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::EmptyOrderId
            | PaymentError::InvalidAmount
            | PaymentError::InvalidCurrency
            | PaymentError::EmptyProviderId
            | PaymentError::InvalidWalletAddress
            | PaymentError::InvalidTransactionHash
            | PaymentError::UnsupportedCrypto(_)
            | PaymentError::InvalidCryptoAmount { .. }
            | PaymentError::InvalidRefundAmount => ErrorKind::Validation,
            PaymentError::InvalidStatusTransition { .. }
            | PaymentError::AlreadyConfirmed
            | PaymentError::CannotConfirm(_)
            | PaymentError::CannotCancel(_)
            | PaymentError::CannotRefund(_)
            | PaymentError::FinalPayment(_) => ErrorKind::StateTransition,
            PaymentError::Expired { .. } => ErrorKind::Temporal,
            PaymentError::RefundExceedsPayment { .. }
            | PaymentError::RefundAlreadyProcessed
            | PaymentError::NoRefundRecorded => ErrorKind::Refund,
            PaymentError::NegativeConfirmations(_)
            | PaymentError::ConfirmationRegression { .. } => ErrorKind::External,
            PaymentError::InsufficientAmount { .. } | PaymentError::ExcessiveAmount { .. } => {
                ErrorKind::AmountMismatch
            }
        }
    }
}

/// Errors raised while building the currency registry or its confirmation policy.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Duplicate currency symbol in registry: {0}")]
    DuplicateCurrency(String),

    #[error("Currency symbol cannot be empty")]
    EmptySymbol,

    #[error("Required confirmations for {symbol} must be a positive integer, got {value}")]
    InvalidThreshold { symbol: String, value: u64 },

    #[error("Invalid confirmation policy: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] PaymentError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Application-level errors returned by the payment service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] PaymentError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Exchange rate error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Order callback failed: {0}")]
    Order(#[from] OrderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the domain error kind, if this error came from the aggregate.
    pub fn domain_kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Domain(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => AppError::Domain(e),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Conflict(e) => AppError::Conflict(e),
            RepoError::Storage(e) => AppError::Internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(PaymentError::EmptyOrderId.kind(), ErrorKind::Validation);
        assert_eq!(
            PaymentError::CannotCancel(PaymentStatus::Confirmed).kind(),
            ErrorKind::StateTransition
        );
        assert_eq!(
            PaymentError::Expired {
                expired_at: Utc::now()
            }
            .kind(),
            ErrorKind::Temporal
        );
        assert_eq!(
            PaymentError::RefundAlreadyProcessed.kind(),
            ErrorKind::Refund
        );
        assert_eq!(
            PaymentError::NegativeConfirmations(-1).kind(),
            ErrorKind::External
        );
    }

    #[test]
    fn test_repo_error_maps_to_app_error() {
        let app: AppError = RepoError::Conflict("stale version".into()).into();
        assert!(matches!(app, AppError::Conflict(_)));

        let app: AppError = RepoError::Domain(PaymentError::AlreadyConfirmed).into();
        assert_eq!(app.domain_kind(), Some(ErrorKind::StateTransition));
    }

    #[test]
    fn test_transition_error_message() {
        let err = PaymentError::InvalidStatusTransition {
            from: PaymentStatus::Expired,
            operation: "detect a transaction",
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition: cannot detect a transaction while EXPIRED"
        );
    }
}
