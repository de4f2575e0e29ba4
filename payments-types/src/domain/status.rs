//! Payment status and the transition table.

use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// Lifecycle state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Payment initiated, waiting for funds
    Pending,
    /// Transaction detected on-chain, waiting for confirmations
    Confirming,
    /// Required confirmations reached (or confirmed by an operator)
    Confirmed,
    /// Payment failed or was rejected upstream
    Failed,
    /// Payment window elapsed without settlement
    Expired,
    /// Crypto amount fully returned to the payer
    Refunded,
    /// Payment cancelled before settlement
    Cancelled,
}

/// Status-changing events the aggregate can request.
///
/// Every variant is resolved against every status in [`PaymentStatus::apply`]
/// without wildcard arms, so adding a status forces each guard to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    DetectTransaction,
    ReachThreshold,
    ManualConfirm,
    Fail,
    Expire,
    Cancel,
    PartialRefund,
    FullRefund,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 7] = [
        PaymentStatus::Pending,
        PaymentStatus::Confirming,
        PaymentStatus::Confirmed,
        PaymentStatus::Failed,
        PaymentStatus::Expired,
        PaymentStatus::Refunded,
        PaymentStatus::Cancelled,
    ];

    /// Terminal states. Only refunds (from `Confirmed`) and an operator
    /// confirmation (from `Failed`) leave them.
    pub fn is_final(&self) -> bool {
        match self {
            PaymentStatus::Pending | PaymentStatus::Confirming => false,
            PaymentStatus::Confirmed
            | PaymentStatus::Failed
            | PaymentStatus::Expired
            | PaymentStatus::Refunded
            | PaymentStatus::Cancelled => true,
        }
    }

    pub fn is_completed(&self) -> bool {
        match self {
            PaymentStatus::Confirmed => true,
            PaymentStatus::Pending
            | PaymentStatus::Confirming
            | PaymentStatus::Failed
            | PaymentStatus::Expired
            | PaymentStatus::Refunded
            | PaymentStatus::Cancelled => false,
        }
    }

    pub fn can_be_cancelled(&self) -> bool {
        match self {
            PaymentStatus::Pending | PaymentStatus::Confirming => true,
            PaymentStatus::Confirmed
            | PaymentStatus::Failed
            | PaymentStatus::Expired
            | PaymentStatus::Refunded
            | PaymentStatus::Cancelled => false,
        }
    }

    pub fn can_be_refunded(&self) -> bool {
        match self {
            PaymentStatus::Confirmed => true,
            PaymentStatus::Pending
            | PaymentStatus::Confirming
            | PaymentStatus::Failed
            | PaymentStatus::Expired
            | PaymentStatus::Refunded
            | PaymentStatus::Cancelled => false,
        }
    }

    /// Resolves `transition` from this status, returning the target status or
    /// the guard error for this (status, transition) pair.
    pub fn apply(self, transition: Transition) -> Result<PaymentStatus, PaymentError> {
        use PaymentStatus::*;

        let invalid = |operation: &'static str| PaymentError::InvalidStatusTransition {
            from: self,
            operation,
        };

        match transition {
            Transition::DetectTransaction => match self {
                Pending => Ok(Confirming),
                Confirming | Confirmed | Failed | Expired | Refunded | Cancelled => {
                    Err(invalid("detect a transaction"))
                }
            },
            Transition::ReachThreshold => match self {
                Confirming => Ok(Confirmed),
                Pending | Confirmed | Failed | Expired | Refunded | Cancelled => {
                    Err(invalid("update confirmations"))
                }
            },
            Transition::ManualConfirm => match self {
                Pending | Confirming | Failed => Ok(Confirmed),
                Confirmed => Err(PaymentError::AlreadyConfirmed),
                Expired | Refunded | Cancelled => Err(PaymentError::CannotConfirm(self)),
            },
            Transition::Fail => match self {
                Pending | Confirming => Ok(Failed),
                Confirmed | Failed | Expired | Refunded | Cancelled => Err(invalid("fail")),
            },
            Transition::Expire => match self {
                Pending | Confirming => Ok(Expired),
                Confirmed | Failed | Expired | Refunded | Cancelled => Err(invalid("expire")),
            },
            Transition::Cancel => match self {
                Pending | Confirming => Ok(Cancelled),
                Confirmed | Failed | Expired | Refunded | Cancelled => {
                    Err(PaymentError::CannotCancel(self))
                }
            },
            Transition::PartialRefund => match self {
                Confirmed => Ok(Confirmed),
                Pending | Confirming | Failed | Expired | Refunded | Cancelled => {
                    Err(PaymentError::CannotRefund(self))
                }
            },
            Transition::FullRefund => match self {
                Confirmed => Ok(Refunded),
                Pending | Confirming | Failed | Expired | Refunded | Cancelled => {
                    Err(PaymentError::CannotRefund(self))
                }
            },
        }
    }
}

impl AsRef<str> for PaymentStatus {
    fn as_ref(&self) -> &str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Confirming => "CONFIRMING",
            PaymentStatus::Confirmed => "CONFIRMED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_ref().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown payment status: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_table() {
        // (status, final, completed, cancellable, refundable)
        let table = [
            (PaymentStatus::Pending, false, false, true, false),
            (PaymentStatus::Confirming, false, false, true, false),
            (PaymentStatus::Confirmed, true, true, false, true),
            (PaymentStatus::Failed, true, false, false, false),
            (PaymentStatus::Expired, true, false, false, false),
            (PaymentStatus::Refunded, true, false, false, false),
            (PaymentStatus::Cancelled, true, false, false, false),
        ];

        for (status, is_final, completed, cancellable, refundable) in table {
            assert_eq!(status.is_final(), is_final, "{} final", status);
            assert_eq!(status.is_completed(), completed, "{} completed", status);
            assert_eq!(status.can_be_cancelled(), cancellable, "{} cancel", status);
            assert_eq!(status.can_be_refunded(), refundable, "{} refund", status);
        }
    }

    #[test]
    fn test_transitions_agree_with_predicates() {
        for status in PaymentStatus::ALL {
            assert_eq!(
                status.apply(Transition::Cancel).is_ok(),
                status.can_be_cancelled()
            );
            assert_eq!(
                status.apply(Transition::FullRefund).is_ok(),
                status.can_be_refunded()
            );
            assert_eq!(status.apply(Transition::Fail).is_ok(), !status.is_final());
            assert_eq!(status.apply(Transition::Expire).is_ok(), !status.is_final());
        }
    }

    #[test]
    fn test_manual_confirm_guards() {
        assert_eq!(
            PaymentStatus::Failed.apply(Transition::ManualConfirm),
            Ok(PaymentStatus::Confirmed)
        );
        assert_eq!(
            PaymentStatus::Confirmed.apply(Transition::ManualConfirm),
            Err(PaymentError::AlreadyConfirmed)
        );
        assert_eq!(
            PaymentStatus::Cancelled.apply(Transition::ManualConfirm),
            Err(PaymentError::CannotConfirm(PaymentStatus::Cancelled))
        );
    }

    #[test]
    fn test_only_confirming_reaches_threshold() {
        for status in PaymentStatus::ALL {
            let result = status.apply(Transition::ReachThreshold);
            if status == PaymentStatus::Confirming {
                assert_eq!(result, Ok(PaymentStatus::Confirmed));
            } else {
                assert!(matches!(
                    result,
                    Err(PaymentError::InvalidStatusTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_status_display_and_parse() {
        assert_eq!(PaymentStatus::Confirming.to_string(), "CONFIRMING");
        assert_eq!(
            "cancelled".parse::<PaymentStatus>(),
            Ok(PaymentStatus::Cancelled)
        );
        assert!("SETTLED".parse::<PaymentStatus>().is_err());
    }
}
