//! In-memory payment repository.
//!
//! Every stored payment carries a version that is bumped on each update;
//! writers must present the version they read, so a lost update shows up as
//! `RepoError::Conflict` instead of silently overwriting newer state.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use payments_types::{Payment, PaymentId, PaymentRepository, RepoError, Versioned};
use tracing::debug;

/// Version assigned by `save`.
pub const INITIAL_VERSION: u64 = 1;

#[derive(Debug, Default)]
pub struct InMemoryPaymentRepo {
    payments: DashMap<PaymentId, Versioned<Payment>>,
    /// Payment ids per order, oldest first
    by_order: DashMap<String, Vec<PaymentId>>,
}

impl InMemoryPaymentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepo {
    async fn save(&self, payment: &Payment) -> Result<u64, RepoError> {
        match self.payments.entry(payment.id()) {
            Entry::Occupied(_) => {
                return Err(RepoError::Conflict(format!(
                    "payment {} already exists",
                    payment.id()
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(Versioned::new(payment.clone(), INITIAL_VERSION));
            }
        }

        self.by_order
            .entry(payment.order_id().to_string())
            .or_default()
            .push(payment.id());

        debug!(payment_id = %payment.id(), order_id = payment.order_id(), "payment stored");
        Ok(INITIAL_VERSION)
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Versioned<Payment>>, RepoError> {
        Ok(self.payments.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<Versioned<Payment>>, RepoError> {
        let latest = self
            .by_order
            .get(order_id)
            .and_then(|ids| ids.last().copied());

        match latest {
            Some(id) => self.find_by_id(id).await,
            None => Ok(None),
        }
    }

    async fn update(&self, payment: &Payment, expected_version: u64) -> Result<u64, RepoError> {
        let mut stored = self
            .payments
            .get_mut(&payment.id())
            .ok_or(RepoError::NotFound)?;

        if stored.version != expected_version {
            debug!(
                payment_id = %payment.id(),
                expected_version,
                stored_version = stored.version,
                "stale payment update rejected"
            );
            return Err(RepoError::Conflict(format!(
                "payment {} is at version {}, expected {}",
                payment.id(),
                stored.version,
                expected_version
            )));
        }

        let version = stored.version + 1;
        *stored = Versioned::new(payment.clone(), version);
        Ok(version)
    }

    async fn list_active(&self) -> Result<Vec<Versioned<Payment>>, RepoError> {
        Ok(self
            .payments
            .iter()
            .filter(|entry| !entry.value().value.status().is_final())
            .map(|entry| entry.value().clone())
            .collect())
    }
}
