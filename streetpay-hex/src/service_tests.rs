//! OrderService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use streetpay_types::{
        Account, AccountId, ApiKey, ApiKeyId, AppError, CreateAccountRequest, CreateItemRequest,
        CreateOrderEntry, CreateOrderRequest, CreatePaymentEntry, CreatePaymentsRequest, Currency,
        Item, ItemId, Money, OrderCode, PaymentBatch, PaymentEntry, PaymentProvider, PaymentType,
        PendingOrder, ProviderError, ProviderOrder, RepoError, SettleOutcome,
        SettlementRepository, TransactionCheck, TransactionOrderRequest,
        TransactionVerificationRequest, VerifyOrderParams,
    };

    use crate::OrderService;

    /// Simple in-memory repository for testing the service layer.
    pub struct MockRepo {
        accounts: Mutex<HashMap<AccountId, Account>>,
        items: Mutex<HashMap<ItemId, Item>>,
        orders: Mutex<HashMap<i64, PendingOrder>>,
        payments: Mutex<Vec<PaymentEntry>>,
        api_keys: Mutex<HashMap<String, ApiKey>>,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self {
                accounts: Mutex::new(HashMap::new()),
                items: Mutex::new(HashMap::new()),
                orders: Mutex::new(HashMap::new()),
                payments: Mutex::new(Vec::new()),
                api_keys: Mutex::new(HashMap::new()),
            }
        }

        fn payment_count(&self) -> usize {
            self.payments.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SettlementRepository for MockRepo {
        async fn create_account(&self, account: Account) -> Result<Account, RepoError> {
            self.accounts
                .lock()
                .unwrap()
                .insert(account.id, account.clone());
            Ok(account)
        }

        async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
            Ok(self.accounts.lock().unwrap().get(&id).cloned())
        }

        async fn list_accounts(&self) -> Result<Vec<Account>, RepoError> {
            Ok(self.accounts.lock().unwrap().values().cloned().collect())
        }

        async fn account_balance(&self, id: AccountId) -> Result<i64, RepoError> {
            let payments = self.payments.lock().unwrap();
            let received: i64 = payments
                .iter()
                .filter(|p| p.receiver == id)
                .map(|p| p.amount.amount())
                .sum();
            let sent: i64 = payments
                .iter()
                .filter(|p| p.sender == Some(id))
                .map(|p| p.amount.amount())
                .sum();
            Ok(received - sent)
        }

        async fn create_item(&self, item: Item) -> Result<Item, RepoError> {
            self.items.lock().unwrap().insert(item.id, item.clone());
            Ok(item)
        }

        async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepoError> {
            Ok(self.items.lock().unwrap().get(&id).cloned())
        }

        async fn list_items(&self) -> Result<Vec<Item>, RepoError> {
            Ok(self.items.lock().unwrap().values().cloned().collect())
        }

        async fn record_order(&self, order: PendingOrder) -> Result<PendingOrder, RepoError> {
            let mut orders = self.orders.lock().unwrap();
            if orders.contains_key(&order.order_code.value()) {
                return Err(RepoError::Database("duplicate order code".into()));
            }
            orders.insert(order.order_code.value(), order.clone());
            Ok(order)
        }

        async fn find_order(&self, code: OrderCode) -> Result<Option<PendingOrder>, RepoError> {
            Ok(self.orders.lock().unwrap().get(&code.value()).cloned())
        }

        async fn settle_order(
            &self,
            code: OrderCode,
            transaction_id: &str,
            batch: PaymentBatch,
        ) -> Result<SettleOutcome, RepoError> {
            let mut orders = self.orders.lock().unwrap();
            let order = orders.get_mut(&code.value()).ok_or(RepoError::NotFound)?;

            if order.settled {
                let stored: Vec<_> = self
                    .payments
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|p| p.order_code == Some(code))
                    .cloned()
                    .collect();
                return Ok(SettleOutcome::AlreadySettled(PaymentBatch {
                    order_code: code,
                    entries: stored,
                }));
            }

            order.settled = true;
            order.transaction_id = Some(transaction_id.to_string());
            self.payments
                .lock()
                .unwrap()
                .extend(batch.entries.iter().cloned());
            Ok(SettleOutcome::Settled(batch))
        }

        async fn payments_for_order(
            &self,
            code: OrderCode,
        ) -> Result<Vec<PaymentEntry>, RepoError> {
            Ok(self
                .payments
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.order_code == Some(code))
                .cloned()
                .collect())
        }

        async fn list_payments(&self) -> Result<Vec<PaymentEntry>, RepoError> {
            Ok(self.payments.lock().unwrap().clone())
        }

        async fn create_payments(&self, entries: Vec<PaymentEntry>) -> Result<(), RepoError> {
            self.payments.lock().unwrap().extend(entries);
            Ok(())
        }

        async fn verify_api_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError> {
            Ok(self.api_keys.lock().unwrap().get(key_hash).cloned())
        }

        async fn create_api_key(&self, name: &str) -> Result<(ApiKey, String), RepoError> {
            let raw = format!("sk_test_{}", name);
            let key = ApiKey {
                id: ApiKeyId::new(),
                name: name.to_string(),
                key_hash: format!("hash_{}", raw),
                is_active: true,
                created_at: chrono::Utc::now(),
                last_used_at: None,
            };
            self.api_keys
                .lock()
                .unwrap()
                .insert(key.key_hash.clone(), key.clone());
            Ok((key, raw))
        }

        async fn count_api_keys(&self) -> Result<i64, RepoError> {
            Ok(self.api_keys.lock().unwrap().len() as i64)
        }
    }

    /// Scripted payment provider. Issues a fixed order code and answers
    /// verification with a preconfigured result.
    pub struct MockProvider {
        next_code: i64,
        check: TransactionCheck,
        paid: bool,
        created_orders: AtomicUsize,
        verify_calls: AtomicUsize,
        last_amount: Mutex<Option<i64>>,
    }

    impl MockProvider {
        /// Provider that confirms the transaction with the given amount.
        pub fn confirming(code: i64, amount: i64) -> Self {
            Self {
                next_code: code,
                check: TransactionCheck {
                    verified: true,
                    amount: Some(Money::new(amount, Currency::EUR).unwrap()),
                },
                paid: true,
                created_orders: AtomicUsize::new(0),
                verify_calls: AtomicUsize::new(0),
                last_amount: Mutex::new(None),
            }
        }

        /// Provider that refuses to confirm the transaction.
        pub fn rejecting(code: i64) -> Self {
            Self {
                next_code: code,
                check: TransactionCheck {
                    verified: false,
                    amount: None,
                },
                paid: false,
                created_orders: AtomicUsize::new(0),
                verify_calls: AtomicUsize::new(0),
                last_amount: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl PaymentProvider for MockProvider {
        async fn create_order(&self, order: &ProviderOrder) -> Result<OrderCode, ProviderError> {
            self.created_orders.fetch_add(1, Ordering::SeqCst);
            *self.last_amount.lock().unwrap() = Some(order.amount.amount());
            Ok(OrderCode::new(self.next_code))
        }

        async fn verify_transaction(
            &self,
            _code: OrderCode,
            _transaction_id: &str,
        ) -> Result<TransactionCheck, ProviderError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.check.clone())
        }

        async fn order_paid(&self, _code: OrderCode) -> Result<bool, ProviderError> {
            Ok(self.paid)
        }

        fn checkout_url(&self, code: OrderCode) -> String {
            format!("https://checkout.test/web/checkout?ref={}", code)
        }
    }

    type Service = OrderService<MockRepo, MockProvider>;

    fn service(provider: MockProvider) -> Service {
        OrderService::new(MockRepo::new(), provider)
    }

    /// Seeds a vendor and a priced item, then creates an order for one unit.
    async fn seed_order(service: &Service, price: i64) -> OrderCode {
        let vendor = service
            .create_account(CreateAccountRequest {
                name: "Vendor".into(),
            })
            .await
            .unwrap();
        let item = service
            .create_item(CreateItemRequest {
                name: "Paper".into(),
                price,
                currency: Currency::EUR,
            })
            .await
            .unwrap();

        let resp = service
            .create_order(CreateOrderRequest {
                vendor: vendor.id,
                user: None,
                entries: vec![CreateOrderEntry {
                    item: item.id,
                    quantity: 1,
                }],
            })
            .await
            .unwrap();
        assert!(resp.smart_checkout_url.contains("ref="));

        let code = service.repo().orders.lock().unwrap().keys().copied().next();
        OrderCode::new(code.unwrap())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Order creation
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_order_records_pending_order() {
        let service = service(MockProvider::confirming(1234567890, 350));

        let code = seed_order(&service, 350).await;

        let order = service.repo().find_order(code).await.unwrap().unwrap();
        assert_eq!(order.amount.amount(), 350);
        assert!(!order.settled);
        // Creation never touches the ledger.
        assert_eq!(service.repo().payment_count(), 0);
    }

    #[tokio::test]
    async fn test_create_order_unknown_item_fails_before_psp() {
        let service = service(MockProvider::confirming(1, 350));
        let vendor = service
            .create_account(CreateAccountRequest {
                name: "Vendor".into(),
            })
            .await
            .unwrap();

        let result = service
            .create_order(CreateOrderRequest {
                vendor: vendor.id,
                user: None,
                entries: vec![CreateOrderEntry {
                    item: ItemId::new(),
                    quantity: 1,
                }],
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(service.provider().created_orders.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_order_unknown_vendor_fails() {
        let service = service(MockProvider::confirming(1, 350));

        let result = service
            .create_order(CreateOrderRequest {
                vendor: AccountId::new(),
                user: None,
                entries: vec![CreateOrderEntry {
                    item: ItemId::new(),
                    quantity: 1,
                }],
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_order_empty_entries_fails() {
        let service = service(MockProvider::confirming(1, 350));

        let result = service
            .create_order(CreateOrderRequest {
                vendor: AccountId::new(),
                user: None,
                entries: vec![],
            })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_create_order_free_amount_entry_carries_cents_in_quantity() {
        let service = service(MockProvider::confirming(55, 500));
        let vendor = service
            .create_account(CreateAccountRequest {
                name: "Vendor".into(),
            })
            .await
            .unwrap();
        let paper = service
            .create_item(CreateItemRequest {
                name: "Paper".into(),
                price: 350,
                currency: Currency::EUR,
            })
            .await
            .unwrap();
        let tip = service
            .create_item(CreateItemRequest {
                name: "Tip".into(),
                price: 0,
                currency: Currency::EUR,
            })
            .await
            .unwrap();

        service
            .create_order(CreateOrderRequest {
                vendor: vendor.id,
                user: None,
                entries: vec![
                    CreateOrderEntry {
                        item: paper.id,
                        quantity: 1,
                    },
                    CreateOrderEntry {
                        item: tip.id,
                        quantity: 150,
                    },
                ],
            })
            .await
            .unwrap();

        // The PSP sees the full amount including the tip.
        assert_eq!(*service.provider().last_amount.lock().unwrap(), Some(500));
        let order = service
            .repo()
            .find_order(OrderCode::new(55))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.amount.amount(), 500);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verification & settlement
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_verify_order_settles_and_writes_batch() {
        let service = service(MockProvider::confirming(100, 350));
        let code = seed_order(&service, 350).await;

        let resp = service
            .verify_order(VerifyOrderParams {
                s: code.to_string(),
                t: "tx-1".into(),
            })
            .await
            .unwrap();

        assert!(resp.verified);
        assert_eq!(resp.transaction_id, "tx-1");
        assert_eq!(resp.entries.len(), 1);
        assert_eq!(service.repo().payment_count(), 1);

        let order = service.repo().find_order(code).await.unwrap().unwrap();
        assert!(order.settled);
        assert_eq!(order.transaction_id.as_deref(), Some("tx-1"));
    }

    #[tokio::test]
    async fn test_verify_order_unconfirmed_leaves_order_pending() {
        let service = service(MockProvider::rejecting(200));
        let code = seed_order(&service, 350).await;

        let resp = service
            .verify_order(VerifyOrderParams {
                s: code.to_string(),
                t: "tx-1".into(),
            })
            .await
            .unwrap();

        assert!(!resp.verified);
        assert_eq!(service.repo().payment_count(), 0);

        let order = service.repo().find_order(code).await.unwrap().unwrap();
        assert!(!order.settled);
    }

    #[tokio::test]
    async fn test_verify_order_amount_mismatch_fails_closed() {
        // PSP confirms 300 cents for an order priced at 350.
        let service = service(MockProvider::confirming(300, 300));
        let code = seed_order(&service, 350).await;

        let result = service
            .verify_order(VerifyOrderParams {
                s: code.to_string(),
                t: "tx-1".into(),
            })
            .await;

        assert!(matches!(
            result,
            Err(AppError::AmountMismatch {
                confirmed: 300,
                computed: 350
            })
        ));
        assert_eq!(service.repo().payment_count(), 0);

        let order = service.repo().find_order(code).await.unwrap().unwrap();
        assert!(!order.settled);
    }

    #[tokio::test]
    async fn test_verify_order_replay_skips_psp_and_keeps_one_batch() {
        let service = service(MockProvider::confirming(400, 350));
        let code = seed_order(&service, 350).await;

        let params = VerifyOrderParams {
            s: code.to_string(),
            t: "tx-1".into(),
        };
        let first = service.verify_order(params.clone()).await.unwrap();
        let second = service.verify_order(params).await.unwrap();

        assert!(first.verified);
        assert!(second.verified);
        assert_eq!(second.transaction_id, "tx-1");
        assert_eq!(service.repo().payment_count(), 1);

        // The replay answered from storage, not the PSP.
        assert_eq!(service.provider().verify_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verify_order_unknown_code_not_found() {
        let service = service(MockProvider::confirming(1, 350));

        let result = service
            .verify_order(VerifyOrderParams {
                s: "999".into(),
                t: "tx-1".into(),
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_verify_order_non_numeric_code_bad_request() {
        let service = service(MockProvider::confirming(1, 350));

        let result = service
            .verify_order(VerifyOrderParams {
                s: "not-a-code".into(),
                t: "tx-1".into(),
            })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bare PSP operations
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_transaction_order_records_nothing() {
        let service = service(MockProvider::confirming(500, 350));

        let resp = service
            .create_transaction_order(TransactionOrderRequest { amount: 350 })
            .await
            .unwrap();

        assert!(resp.smart_checkout_url.contains("ref=500"));
        assert!(service.repo().orders.lock().unwrap().is_empty());
        assert_eq!(service.repo().payment_count(), 0);
    }

    #[tokio::test]
    async fn test_transaction_order_rejects_non_positive_amount() {
        let service = service(MockProvider::confirming(1, 350));

        let result = service
            .create_transaction_order(TransactionOrderRequest { amount: 0 })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_transaction_verification_reports_paid_state() {
        let paid = service(MockProvider::confirming(1, 350));
        let unpaid = service(MockProvider::rejecting(1));

        let yes = paid
            .verify_transaction_state(TransactionVerificationRequest {
                order_code: OrderCode::new(1),
            })
            .await
            .unwrap();
        let no = unpaid
            .verify_transaction_state(TransactionVerificationRequest {
                order_code: OrderCode::new(1),
            })
            .await
            .unwrap();

        assert!(yes.verification);
        assert!(!no.verification);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Manual payments & balances
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_payments_defaults_authorized_by_to_manual() {
        let service = service(MockProvider::confirming(1, 350));
        let vendor = service
            .create_account(CreateAccountRequest {
                name: "Vendor".into(),
            })
            .await
            .unwrap();

        service
            .create_payments(CreatePaymentsRequest {
                payments: vec![CreatePaymentEntry {
                    sender: None,
                    receiver: vendor.id,
                    entry_type: PaymentType::Fee,
                    amount: 100,
                    currency: Currency::EUR,
                    item: None,
                    authorized_by: None,
                }],
            })
            .await
            .unwrap();

        let payments = service.list_payments().await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].authorized_by, "manual");
    }

    #[tokio::test]
    async fn test_create_payments_rejects_empty_batch() {
        let service = service(MockProvider::confirming(1, 350));

        let result = service
            .create_payments(CreatePaymentsRequest { payments: vec![] })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_account_balance_after_settlement() {
        let service = service(MockProvider::confirming(600, 350));
        let code = seed_order(&service, 350).await;

        service
            .verify_order(VerifyOrderParams {
                s: code.to_string(),
                t: "tx-1".into(),
            })
            .await
            .unwrap();

        let order = service.repo().find_order(code).await.unwrap().unwrap();
        let balance = service.account_balance(order.vendor).await.unwrap();
        assert_eq!(balance.balance, 350);
    }

    #[tokio::test]
    async fn test_account_balance_unknown_account_not_found() {
        let service = service(MockProvider::confirming(1, 350));

        let result = service.account_balance(AccountId::new()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
