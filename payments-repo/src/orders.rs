//! In-memory order book implementing the "mark paid" callback.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use dashmap::mapref::entry::Entry;
use payments_types::{OrderError, OrderPaymentPort, PaymentId};
use tracing::info;

/// Records which payment settled which order.
///
/// Built with [`InMemoryOrderBook::new`] it accepts any order id; built with
/// [`InMemoryOrderBook::with_orders`] it only knows the listed ones.
#[derive(Debug, Default)]
pub struct InMemoryOrderBook {
    known: Option<DashSet<String>>,
    paid: DashMap<String, PaymentId>,
}

impl InMemoryOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders<I, S>(orders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: Some(orders.into_iter().map(Into::into).collect()),
            paid: DashMap::new(),
        }
    }

    /// The payment that settled `order_id`, if any.
    pub fn paid_by(&self, order_id: &str) -> Option<PaymentId> {
        self.paid.get(order_id).map(|entry| *entry.value())
    }

    pub fn paid_count(&self) -> usize {
        self.paid.len()
    }
}

#[async_trait]
impl OrderPaymentPort for InMemoryOrderBook {
    async fn mark_paid(&self, order_id: &str, payment_id: PaymentId) -> Result<(), OrderError> {
        if let Some(known) = &self.known {
            if !known.contains(order_id) {
                return Err(OrderError::NotFound(order_id.to_string()));
            }
        }

        match self.paid.entry(order_id.to_string()) {
            Entry::Occupied(existing) if *existing.get() == payment_id => Ok(()),
            Entry::Occupied(existing) => Err(OrderError::AlreadyPaid {
                order_id: order_id.to_string(),
                payment_id: *existing.get(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(payment_id);
                info!(order_id, payment_id = %payment_id, "order marked paid");
                Ok(())
            }
        }
    }
}
