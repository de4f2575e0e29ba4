//! In-memory adapter tests.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use payments_types::{
        CurrencyRegistry, OrderError, OrderPaymentPort, Payment, PaymentId, PaymentRepository,
        RepoError,
    };
    use rust_decimal_macros::dec;

    use crate::memory::INITIAL_VERSION;
    use crate::{InMemoryOrderBook, InMemoryPaymentRepo};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn payment(order_id: &str) -> Payment {
        let registry = CurrencyRegistry::default();
        let mut payment =
            Payment::new(&registry, order_id, dec!(100), "USD", "BTC", "bc1q...", 30, t0())
                .unwrap();
        payment.set_crypto_amount(dec!(0.001), t0()).unwrap();
        payment
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payment repository
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemoryPaymentRepo::new();
        let payment = payment("order-1");

        let version = repo.save(&payment).await.unwrap();
        assert_eq!(version, INITIAL_VERSION);

        let stored = repo.find_by_id(payment.id()).await.unwrap().unwrap();
        assert_eq!(stored.value, payment);
        assert_eq!(stored.version, INITIAL_VERSION);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_find_missing_payment() {
        let repo = InMemoryPaymentRepo::new();
        assert!(repo.find_by_id(PaymentId::new()).await.unwrap().is_none());
        assert!(repo.find_by_order_id("nope").await.unwrap().is_none());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_save_conflicts() {
        let repo = InMemoryPaymentRepo::new();
        let payment = payment("order-1");
        repo.save(&payment).await.unwrap();

        let result = repo.save(&payment).await;
        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_find_by_order_returns_latest() {
        let repo = InMemoryPaymentRepo::new();
        let first = payment("order-1");
        let second = payment("order-1");
        repo.save(&first).await.unwrap();
        repo.save(&second).await.unwrap();
        repo.save(&payment("order-2")).await.unwrap();

        let found = repo.find_by_order_id("order-1").await.unwrap().unwrap();
        assert_eq!(found.value.id(), second.id());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = InMemoryPaymentRepo::new();
        let mut payment = payment("order-1");
        let version = repo.save(&payment).await.unwrap();

        payment.mark_confirming("h1", t0()).unwrap();
        let next = repo.update(&payment, version).await.unwrap();
        assert_eq!(next, version + 1);

        let stored = repo.find_by_id(payment.id()).await.unwrap().unwrap();
        assert_eq!(stored.value.transaction_hash(), Some("h1"));
        assert_eq!(stored.version, next);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let repo = InMemoryPaymentRepo::new();
        let original = payment("order-1");
        let version = repo.save(&original).await.unwrap();

        let mut first = original.clone();
        first.mark_confirming("h1", t0()).unwrap();
        repo.update(&first, version).await.unwrap();

        let mut second = original.clone();
        second.cancel(t0()).unwrap();
        let result = repo.update(&second, version).await;
        assert!(matches!(result, Err(RepoError::Conflict(_))));

        let stored = repo.find_by_id(original.id()).await.unwrap().unwrap();
        assert_eq!(stored.value, first);
    }

    #[tokio::test]
    async fn test_update_unknown_payment() {
        let repo = InMemoryPaymentRepo::new();
        let result = repo.update(&payment("order-1"), INITIAL_VERSION).await;
        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_active_skips_final() {
        let repo = InMemoryPaymentRepo::new();
        let open = payment("order-1");
        let mut cancelled = payment("order-2");
        cancelled.cancel(t0()).unwrap();
        repo.save(&open).await.unwrap();
        repo.save(&cancelled).await.unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].value.id(), open.id());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Order book
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_mark_paid_is_idempotent_for_same_payment() {
        let orders = InMemoryOrderBook::new();
        let payment_id = PaymentId::new();

        orders.mark_paid("order-1", payment_id).await.unwrap();
        orders.mark_paid("order-1", payment_id).await.unwrap();

        assert_eq!(orders.paid_by("order-1"), Some(payment_id));
        assert_eq!(orders.paid_count(), 1);
    }

    #[tokio::test]
    async fn test_mark_paid_rejects_second_payment() {
        let orders = InMemoryOrderBook::new();
        let first = PaymentId::new();
        orders.mark_paid("order-1", first).await.unwrap();

        let result = orders.mark_paid("order-1", PaymentId::new()).await;
        assert_eq!(
            result,
            Err(OrderError::AlreadyPaid {
                order_id: "order-1".into(),
                payment_id: first
            })
        );
    }

    #[tokio::test]
    async fn test_mark_paid_unknown_order() {
        let orders = InMemoryOrderBook::with_orders(["order-1"]);

        assert!(orders.mark_paid("order-1", PaymentId::new()).await.is_ok());
        assert_eq!(
            orders.mark_paid("order-9", PaymentId::new()).await,
            Err(OrderError::NotFound("order-9".into()))
        );
    }
}
