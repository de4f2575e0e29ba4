//! Repository port trait.
//!
//! Adapters (in-memory today, a database later) implement this trait. The
//! service never mutates a stored payment in place: it reads a versioned copy,
//! applies the change to the aggregate, and writes it back with the version it
//! read.

use crate::domain::{Payment, PaymentId};
use crate::error::RepoError;

/// A stored value together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

impl<T> Versioned<T> {
    pub fn new(value: T, version: u64) -> Self {
        Self { value, version }
    }
}

/// Storage port for payment aggregates.
#[async_trait::async_trait]
pub trait PaymentRepository: Send + Sync + 'static {
    /// Stores a new payment and returns its initial version.
    ///
    /// Fails with `Conflict` if the id is already taken.
    async fn save(&self, payment: &Payment) -> Result<u64, RepoError>;

    /// Gets a payment by ID.
    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Versioned<Payment>>, RepoError>;

    /// Gets the most recently created payment for an order.
    async fn find_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<Versioned<Payment>>, RepoError>;

    /// Replaces a stored payment if it is still at `expected_version`.
    ///
    /// Returns the new version, `Conflict` when another writer got there
    /// first, or `NotFound` when the payment does not exist.
    async fn update(&self, payment: &Payment, expected_version: u64) -> Result<u64, RepoError>;

    /// Lists payments that are not yet in a final status.
    async fn list_active(&self) -> Result<Vec<Versioned<Payment>>, RepoError>;
}
