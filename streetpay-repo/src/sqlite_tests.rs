//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use streetpay_types::{
        Account, AccountId, Currency, Item, Money, OrderCode, OrderLine, PaymentBatch,
        PaymentEntry, PaymentType, PendingOrder, RepoError, SettleOutcome, SettlementRepository,
    };

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    fn eur(amount: i64) -> Money {
        Money::new(amount, Currency::EUR).unwrap()
    }

    async fn seed_vendor(repo: &SqliteRepo) -> Account {
        let vendor = Account::new("Vendor".to_string()).unwrap();
        repo.create_account(vendor).await.unwrap()
    }

    async fn seed_item(repo: &SqliteRepo, name: &str, price: i64) -> Item {
        let item = Item::new(name.to_string(), eur(price)).unwrap();
        repo.create_item(item).await.unwrap()
    }

    async fn seed_order(repo: &SqliteRepo, code: i64, price: i64) -> PendingOrder {
        let vendor = seed_vendor(repo).await;
        let item = seed_item(repo, "Paper", price).await;
        let order = PendingOrder::new(
            OrderCode::new(code),
            vendor.id,
            None,
            vec![OrderLine {
                item: item.id,
                quantity: 1,
                unit_price: eur(price),
            }],
        )
        .unwrap();
        repo.record_order(order).await.unwrap()
    }

    fn batch_for(order: &PendingOrder) -> PaymentBatch {
        PaymentBatch::compute(order, order.amount, "tx-1").unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accounts & items
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_and_get_account() {
        let repo = setup_repo().await;

        let created = seed_vendor(&repo).await;
        let fetched = repo.get_account(created.id).await.unwrap().unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.name, "Vendor");
    }

    #[tokio::test]
    async fn test_get_account_not_found() {
        let repo = setup_repo().await;

        let result = repo.get_account(AccountId::new()).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_list_items() {
        let repo = setup_repo().await;

        seed_item(&repo, "Paper", 350).await;
        seed_item(&repo, "Tip", 0).await;

        let items = repo.list_items().await.unwrap();

        assert_eq!(items.len(), 2);
        assert!(items.iter().any(|i| i.is_free_amount()));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Order context
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_record_and_find_order() {
        let repo = setup_repo().await;

        let order = seed_order(&repo, 1234567890, 350).await;
        let found = repo
            .find_order(OrderCode::new(1234567890))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.id, order.id);
        assert_eq!(found.amount.amount(), 350);
        assert_eq!(found.entries.len(), 1);
        assert!(!found.settled);
        assert!(found.transaction_id.is_none());
    }

    #[tokio::test]
    async fn test_find_order_unknown_code() {
        let repo = setup_repo().await;

        let result = repo.find_order(OrderCode::new(42)).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_order_code_rejected() {
        let repo = setup_repo().await;

        let first = seed_order(&repo, 77, 350).await;
        let duplicate = PendingOrder::new(
            OrderCode::new(77),
            first.vendor,
            None,
            first.entries.clone(),
        )
        .unwrap();

        let result = repo.record_order(duplicate).await;

        assert!(matches!(result, Err(RepoError::Database(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Settlement
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_settle_order_writes_batch() {
        let repo = setup_repo().await;

        let order = seed_order(&repo, 100, 350).await;
        let batch = batch_for(&order);

        let outcome = repo
            .settle_order(order.order_code, "tx-1", batch)
            .await
            .unwrap();

        assert!(matches!(outcome, SettleOutcome::Settled(_)));

        let rows = repo.payments_for_order(order.order_code).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount.amount(), 350);
        assert_eq!(rows[0].authorized_by, "tx-1");

        let settled = repo.find_order(order.order_code).await.unwrap().unwrap();
        assert!(settled.settled);
        assert_eq!(settled.transaction_id.as_deref(), Some("tx-1"));
    }

    #[tokio::test]
    async fn test_double_settle_writes_exactly_one_batch() {
        let repo = setup_repo().await;

        let order = seed_order(&repo, 200, 350).await;

        let first = repo
            .settle_order(order.order_code, "tx-1", batch_for(&order))
            .await
            .unwrap();
        let second = repo
            .settle_order(order.order_code, "tx-1", batch_for(&order))
            .await
            .unwrap();

        assert!(matches!(first, SettleOutcome::Settled(_)));
        assert!(second.is_replay());

        // The replay returns the originally stored batch.
        let replayed = second.into_batch();
        assert_eq!(replayed.entries.len(), 1);

        let rows = repo.payments_for_order(order.order_code).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_settle_unknown_order_is_not_found() {
        let repo = setup_repo().await;

        let order = seed_order(&repo, 300, 350).await;
        let batch = batch_for(&order);

        let result = repo
            .settle_order(OrderCode::new(999), "tx-1", batch)
            .await;

        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments & balances
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_balance_derived_from_payments() {
        let repo = setup_repo().await;

        let vendor = seed_vendor(&repo).await;
        let buyer = repo
            .create_account(Account::new("Buyer".to_string()).unwrap())
            .await
            .unwrap();

        repo.create_payments(vec![
            PaymentEntry::new(
                None,
                Some(buyer.id),
                vendor.id,
                PaymentType::Purchase,
                eur(350),
                None,
                "manual".to_string(),
            ),
            PaymentEntry::new(
                None,
                Some(buyer.id),
                vendor.id,
                PaymentType::Tip,
                eur(150),
                None,
                "manual".to_string(),
            ),
        ])
        .await
        .unwrap();

        assert_eq!(repo.account_balance(vendor.id).await.unwrap(), 500);
        assert_eq!(repo.account_balance(buyer.id).await.unwrap(), -500);
    }

    #[tokio::test]
    async fn test_balance_of_account_without_payments_is_zero() {
        let repo = setup_repo().await;

        let vendor = seed_vendor(&repo).await;

        assert_eq!(repo.account_balance(vendor.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_payments() {
        let repo = setup_repo().await;

        let order = seed_order(&repo, 400, 350).await;
        repo.settle_order(order.order_code, "tx-1", batch_for(&order))
            .await
            .unwrap();

        let payments = repo.list_payments().await.unwrap();

        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].order_code, Some(order.order_code));
        assert_eq!(payments[0].entry_type, PaymentType::Purchase);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API keys
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_and_verify_api_key() {
        let repo = setup_repo().await;

        let (created, raw_key) = repo.create_api_key("backoffice").await.unwrap();
        assert!(raw_key.starts_with("sk_"));

        let hash = crate::security::hash_api_key(&raw_key);
        let found = repo.verify_api_key_hash(&hash).await.unwrap().unwrap();

        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "backoffice");
        assert!(found.is_active);
    }

    #[tokio::test]
    async fn test_verify_unknown_hash() {
        let repo = setup_repo().await;

        let found = repo.verify_api_key_hash("no-such-hash").await.unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_count_api_keys() {
        let repo = setup_repo().await;

        assert_eq!(repo.count_api_keys().await.unwrap(), 0);
        repo.create_api_key("first").await.unwrap();
        assert_eq!(repo.count_api_keys().await.unwrap(), 1);
    }
}
