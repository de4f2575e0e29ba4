//! Order aggregate port.
//!
//! The payment core only needs one thing from orders: telling them they are
//! paid.

use crate::domain::PaymentId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Order {0} not found")]
    NotFound(String),

    #[error("Order {order_id} already paid by payment {payment_id}")]
    AlreadyPaid {
        order_id: String,
        payment_id: PaymentId,
    },

    #[error("Order service unavailable: {0}")]
    Unavailable(String),
}

/// Callback into the order aggregate.
#[async_trait::async_trait]
pub trait OrderPaymentPort: Send + Sync {
    /// Marks `order_id` as paid by `payment_id`.
    ///
    /// Must be idempotent for the same payment: the service calls it again
    /// after a retry.
    async fn mark_paid(&self, order_id: &str, payment_id: PaymentId) -> Result<(), OrderError>;
}
