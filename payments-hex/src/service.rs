//! Payment Application Service
//!
//! Orchestrates the payment aggregate through the ports.
//! Contains NO infrastructure logic - pure business orchestration.
//!
//! Every change to a stored payment is a read-modify-write cycle run under
//! that payment's lock and committed with the version it was read at. A
//! version conflict (another process wrote in between) re-runs the cycle
//! against fresh state, up to [`MAX_WRITE_ATTEMPTS`] times.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use payments_types::{
    AppError, CreatePaymentRequest, CurrencyRegistry, ExchangeRateProvider, OrderPaymentPort,
    Payment, PaymentError, PaymentEvent, PaymentId, PaymentRepository, PaymentStatus,
    PaymentSummary, RepoError,
};

use crate::locks::KeyedLocks;

/// Payment window used when a request does not set one.
pub const DEFAULT_EXPIRY_MINUTES: u32 = 30;

/// Read-modify-write attempts before a version conflict is surfaced.
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// Application service for payment operations.
///
/// Generic over its ports - adapters are injected at compile time:
/// - `R: PaymentRepository` stores versioned payments
/// - `X: ExchangeRateProvider` prices the fiat amount in crypto
/// - `O: OrderPaymentPort` is told when an order's payment completes
pub struct PaymentService<R, X, O>
where
    R: PaymentRepository,
    X: ExchangeRateProvider,
    O: OrderPaymentPort,
{
    repo: R,
    rates: X,
    orders: O,
    registry: Arc<CurrencyRegistry>,
    expiry_minutes: u32,
    payment_locks: KeyedLocks<PaymentId>,
    order_locks: KeyedLocks<String>,
}

impl<R, X, O> PaymentService<R, X, O>
where
    R: PaymentRepository,
    X: ExchangeRateProvider,
    O: OrderPaymentPort,
{
    /// Creates a new payment service wired to the given adapters.
    pub fn new(repo: R, rates: X, orders: O, registry: Arc<CurrencyRegistry>) -> Self {
        Self {
            repo,
            rates,
            orders,
            registry,
            expiry_minutes: DEFAULT_EXPIRY_MINUTES,
            payment_locks: KeyedLocks::new(),
            order_locks: KeyedLocks::new(),
        }
    }

    /// Sets the default payment window.
    pub fn with_expiry_minutes(mut self, minutes: u32) -> Self {
        self.expiry_minutes = minutes;
        self
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }

    pub fn registry(&self) -> &CurrencyRegistry {
        &self.registry
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Creation & queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Opens a payment for an order and prices it in crypto.
    ///
    /// Fails with `Conflict` while the order already has a non-final payment.
    #[tracing::instrument(skip(self, req), fields(order_id = %req.order_id, crypto = %req.crypto_symbol))]
    pub async fn create_payment(
        &self,
        req: CreatePaymentRequest,
        now: DateTime<Utc>,
    ) -> Result<PaymentSummary, AppError> {
        let mut payment = Payment::new(
            &self.registry,
            &req.order_id,
            req.amount,
            &req.currency,
            &req.crypto_symbol,
            &req.wallet_address,
            req.expiry_minutes.unwrap_or(self.expiry_minutes),
            now,
        )?;

        let _order_guard = self.order_locks.acquire(&payment.order_id().to_string()).await;

        if let Some(existing) = self.repo.find_by_order_id(payment.order_id()).await? {
            if !existing.value.status().is_final() {
                warn!(existing = %existing.value.id(), "order already has an open payment");
                return Err(AppError::Conflict(format!(
                    "order {} already has open payment {}",
                    payment.order_id(),
                    existing.value.id()
                )));
            }
        }

        let crypto_amount = self
            .rates
            .fiat_to_crypto(
                payment.fiat().amount(),
                payment.fiat().currency(),
                payment.crypto_currency(),
            )
            .await?;
        payment.set_crypto_amount(crypto_amount, now)?;

        if let Some(provider_id) = &req.provider_id {
            payment.set_provider_id(provider_id, now)?;
        }
        if let Some(callback) = &req.callback_address {
            payment.set_callback_address(callback, now)?;
        }

        self.repo.save(&payment).await?;

        info!(
            payment_id = %payment.id(),
            crypto_amount = %payment.crypto_amount(),
            expires_at = %payment.expires_at(),
            "payment created"
        );
        Ok(PaymentSummary::from_payment(&payment, now))
    }

    /// Gets a payment by ID.
    pub async fn get_payment(
        &self,
        id: PaymentId,
        now: DateTime<Utc>,
    ) -> Result<PaymentSummary, AppError> {
        let payment = self.load(id).await?;
        Ok(PaymentSummary::from_payment(&payment, now))
    }

    /// Gets the latest payment for an order.
    pub async fn get_payment_by_order(
        &self,
        order_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentSummary, AppError> {
        let stored = self
            .repo
            .find_by_order_id(order_id.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment for order {}", order_id)))?;
        Ok(PaymentSummary::from_payment(&stored.value, now))
    }

    /// Checks an on-chain amount against the payment's expected crypto amount.
    pub async fn validate_received_amount(
        &self,
        id: PaymentId,
        received: Decimal,
    ) -> Result<(), AppError> {
        let payment = self.load(id).await?;
        payment.validate_received_amount(received).map_err(|e| {
            warn!(payment_id = %id, %received, error = %e, "received amount mismatch");
            AppError::Domain(e)
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound events
    // ─────────────────────────────────────────────────────────────────────────

    /// Applies an inbound blockchain/provider event.
    ///
    /// When the payment ends up `Confirmed` after a confirmation update, the
    /// order is marked paid. If that callback fails the payment stays
    /// `Confirmed` and the error is returned; [`Self::notify_order_paid`]
    /// retries it.
    #[tracing::instrument(skip(self, event), fields(payment_id = %event.payment_id(), event = event.name()))]
    pub async fn handle_event(
        &self,
        event: PaymentEvent,
        now: DateTime<Utc>,
    ) -> Result<PaymentSummary, AppError> {
        let payment = self
            .mutate(event.payment_id(), event.name(), now, |payment| {
                event.apply(payment, now)
            })
            .await?;

        if matches!(event, PaymentEvent::ConfirmationUpdate { .. }) {
            self.notify_if_confirmed(&payment).await?;
        }
        Ok(PaymentSummary::from_payment(&payment, now))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operator actions
    // ─────────────────────────────────────────────────────────────────────────

    #[tracing::instrument(skip(self))]
    pub async fn confirm_manually(
        &self,
        id: PaymentId,
        now: DateTime<Utc>,
    ) -> Result<PaymentSummary, AppError> {
        let payment = self
            .mutate(id, "confirm", now, |payment| payment.confirm(now))
            .await?;
        self.notify_if_confirmed(&payment).await?;
        Ok(PaymentSummary::from_payment(&payment, now))
    }

    #[tracing::instrument(skip(self))]
    pub async fn fail_payment(
        &self,
        id: PaymentId,
        now: DateTime<Utc>,
    ) -> Result<PaymentSummary, AppError> {
        let payment = self
            .mutate(id, "fail", now, |payment| payment.mark_failed(now))
            .await?;
        Ok(PaymentSummary::from_payment(&payment, now))
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_payment(
        &self,
        id: PaymentId,
        now: DateTime<Utc>,
    ) -> Result<PaymentSummary, AppError> {
        let payment = self
            .mutate(id, "cancel", now, |payment| payment.cancel(now))
            .await?;
        Ok(PaymentSummary::from_payment(&payment, now))
    }

    /// Records a refund whose on-chain hash is not known yet.
    #[tracing::instrument(skip(self))]
    pub async fn refund_payment(
        &self,
        id: PaymentId,
        amount: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<PaymentSummary, AppError> {
        let payment = self
            .mutate(id, "refund", now, |payment| payment.refund(amount, now))
            .await?;
        Ok(PaymentSummary::from_payment(&payment, now))
    }

    /// Attaches the refund transaction hash to an already recorded refund.
    #[tracing::instrument(skip(self))]
    pub async fn record_refund_hash(
        &self,
        id: PaymentId,
        transaction_hash: String,
        now: DateTime<Utc>,
    ) -> Result<PaymentSummary, AppError> {
        let payment = self
            .mutate(id, "record refund hash", now, |payment| {
                payment.set_refund_transaction_hash(&transaction_hash, now)
            })
            .await?;
        Ok(PaymentSummary::from_payment(&payment, now))
    }

    /// Re-sends the "mark paid" callback for a confirmed payment.
    #[tracing::instrument(skip(self))]
    pub async fn notify_order_paid(&self, id: PaymentId) -> Result<(), AppError> {
        let payment = self.load(id).await?;
        if payment.status() != PaymentStatus::Confirmed {
            return Err(AppError::Domain(PaymentError::InvalidStatusTransition {
                from: payment.status(),
                operation: "notify the order",
            }));
        }
        self.notify_if_confirmed(&payment).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expiry sweep
    // ─────────────────────────────────────────────────────────────────────────

    /// Expires every pending payment whose window closed before `now`.
    ///
    /// Payments already `Confirming` have funds on-chain and are left to the
    /// confirmation flow. Failures on individual payments are logged and
    /// skipped so one bad record cannot stall the sweep.
    #[tracing::instrument(skip(self))]
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<Vec<PaymentId>, AppError> {
        let candidates: Vec<PaymentId> = self
            .repo
            .list_active()
            .await?
            .into_iter()
            .filter(|stored| stored.value.is_pending() && stored.value.is_expired(now))
            .map(|stored| stored.value.id())
            .collect();

        let mut expired = Vec::with_capacity(candidates.len());
        for id in candidates {
            let result = self
                .mutate(id, "expire", now, |payment| {
                    // Re-checked on fresh state: it may have moved on since listing.
                    if payment.is_pending() && payment.is_expired(now) {
                        payment.mark_expired(now)
                    } else {
                        Ok(())
                    }
                })
                .await;

            match result {
                Ok(payment) if payment.status() == PaymentStatus::Expired => {
                    expired.push(id)
                }
                Ok(_) => {}
                Err(e) => warn!(payment_id = %id, error = %e, "failed to expire payment"),
            }
        }

        let pruned = self.payment_locks.prune() + self.order_locks.prune();
        if !expired.is_empty() || pruned > 0 {
            info!(expired = expired.len(), pruned_locks = pruned, "expiry sweep finished");
        }
        Ok(expired)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    async fn load(&self, id: PaymentId) -> Result<Payment, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .map(|stored| stored.value)
            .ok_or_else(|| AppError::NotFound(format!("Payment {}", id)))
    }

    /// Runs `apply` against the latest stored payment and commits the result.
    ///
    /// A guard rejection is returned as-is and nothing is written. An
    /// operation that leaves the payment unchanged is not written either.
    async fn mutate<F>(
        &self,
        id: PaymentId,
        operation: &'static str,
        now: DateTime<Utc>,
        mut apply: F,
    ) -> Result<Payment, AppError>
    where
        F: FnMut(&mut Payment) -> Result<(), PaymentError> + Send,
    {
        let _guard = self.payment_locks.acquire(&id).await;

        let mut attempt = 1;
        loop {
            let stored = self
                .repo
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Payment {}", id)))?;

            let previous = stored.value.status();
            let mut payment = stored.value.clone();

            if let Err(e) = apply(&mut payment) {
                warn!(payment_id = %id, operation, status = %previous, error = %e, kind = ?e.kind(), "operation rejected");
                return Err(AppError::Domain(e));
            }

            if payment == stored.value {
                debug!(payment_id = %id, operation, "no change");
                return Ok(payment);
            }

            match self.repo.update(&payment, stored.version).await {
                Ok(version) => {
                    if payment.status() != previous {
                        info!(
                            payment_id = %id,
                            operation,
                            from = %previous,
                            to = %payment.status(),
                            version,
                            at = %now,
                            "payment status changed"
                        );
                    } else {
                        debug!(payment_id = %id, operation, version, "payment updated");
                    }
                    return Ok(payment);
                }
                Err(RepoError::Conflict(reason)) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(payment_id = %id, operation, attempt, %reason, "version conflict, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn notify_if_confirmed(&self, payment: &Payment) -> Result<(), AppError> {
        if payment.status() != PaymentStatus::Confirmed {
            return Ok(());
        }

        self.orders
            .mark_paid(payment.order_id(), payment.id())
            .await
            .map_err(|e| {
                warn!(payment_id = %payment.id(), order_id = payment.order_id(), error = %e, "failed to mark order paid");
                AppError::Order(e)
            })
    }
}
