//! Order Application Service
//!
//! Orchestrates the checkout lifecycle across the repository and payment
//! provider ports. Contains NO infrastructure logic - pure business
//! orchestration.

use streetpay_types::{
    Account, AccountId, AccountResponse, AppError, BalanceResponse, CreateAccountRequest,
    CreateItemRequest, CreateOrderRequest, CreateOrderResponse, CreatePaymentsRequest, Currency,
    Item, ItemResponse, Money, OrderCode, OrderEntryResponse, OrderLine, PaymentBatch,
    PaymentEntry, PaymentProvider, PaymentResponse, PendingOrder, ProviderOrder,
    SettlementRepository, TransactionOrderRequest, TransactionOrderResponse,
    TransactionVerificationRequest, TransactionVerificationResponse, VerifyOrderParams,
    VerifyOrderResponse,
};

/// Application service for order orchestration and settlement.
///
/// Generic over `R: SettlementRepository` and `P: PaymentProvider` - both
/// adapters are injected at compile time. This enables:
/// - Swapping the database or PSP without code changes
/// - Testing with in-memory mocks
/// - Compile-time checks for port implementations
pub struct OrderService<R: SettlementRepository, P: PaymentProvider> {
    repo: R,
    provider: P,
}

impl<R: SettlementRepository, P: PaymentProvider> OrderService<R, P> {
    /// Creates a new order service with the given adapters.
    pub fn new(repo: R, provider: P) -> Self {
        Self { repo, provider }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Returns a reference to the payment provider adapter.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Order Lifecycle
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a checkout order at the PSP and records its context.
    ///
    /// Prices every entry from the item catalog; entries referencing a
    /// zero-priced item carry their amount in the quantity field (tips).
    /// Nothing is written to the payment ledger here.
    pub async fn create_order(
        &self,
        req: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, AppError> {
        if req.entries.is_empty() {
            return Err(AppError::BadRequest(
                "Order must contain at least one entry".into(),
            ));
        }

        let vendor = self.find_account(req.vendor).await?;
        if let Some(buyer) = req.user {
            let _ = self.find_account(buyer).await?;
        }

        let mut lines = Vec::with_capacity(req.entries.len());
        for entry in &req.entries {
            if entry.quantity <= 0 {
                return Err(AppError::BadRequest(
                    "Order entry quantity must be positive".into(),
                ));
            }
            let item = self
                .repo
                .get_item(entry.item)
                .await
                .map_err(AppError::from)?
                .ok_or_else(|| AppError::NotFound(format!("Item {}", entry.item)))?;
            lines.push(OrderLine {
                item: item.id,
                quantity: entry.quantity,
                unit_price: item.price,
            });
        }

        let total = order_total(&lines)?;
        if total.is_zero() {
            return Err(AppError::BadRequest("Order amount must be positive".into()));
        }

        let provider_order = ProviderOrder {
            amount: total,
            merchant_description: format!("Purchase from {}", vendor.name),
            customer: None,
        };
        let code = self.provider.create_order(&provider_order).await?;

        let order = PendingOrder::new(code, vendor.id, req.user, lines)?;
        let order = self.repo.record_order(order).await.map_err(AppError::from)?;

        Ok(CreateOrderResponse {
            smart_checkout_url: self.provider.checkout_url(order.order_code),
        })
    }

    /// Verifies an order against the PSP and settles it.
    ///
    /// The settlement batch is computed from the stored order lines and
    /// written atomically. A mismatch between the PSP-confirmed amount and
    /// the batch total fails closed with zero ledger writes. Re-verifying a
    /// settled order returns the stored outcome without contacting the PSP.
    pub async fn verify_order(
        &self,
        params: VerifyOrderParams,
    ) -> Result<VerifyOrderResponse, AppError> {
        let code: OrderCode = params
            .s
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid order code".into()))?;

        let order = self
            .repo
            .find_order(code)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::NotFound(format!("Order {}", code)))?;

        if order.settled {
            let transaction_id = order
                .transaction_id
                .clone()
                .unwrap_or_else(|| params.t.clone());
            return Ok(verify_response(&order, &transaction_id, true));
        }

        let check = self.provider.verify_transaction(code, &params.t).await?;
        if !check.verified {
            // Not confirmed by the PSP. The order stays pending and the
            // caller sees verified=false rather than an error.
            return Ok(verify_response(&order, &params.t, false));
        }
        let confirmed = check.amount.ok_or(AppError::ProviderUnavailable)?;

        let batch = PaymentBatch::compute(&order, confirmed, &params.t).map_err(|e| {
            tracing::error!(order_code = %code, error = %e, "Refusing settlement");
            AppError::from(e)
        })?;

        let outcome = self
            .repo
            .settle_order(code, &params.t, batch)
            .await
            .map_err(AppError::from)?;
        if outcome.is_replay() {
            tracing::info!(order_code = %code, "Order settled concurrently, returning stored batch");
        }

        Ok(verify_response(&order, &params.t, true))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Bare PSP Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a checkout order with no retained context.
    ///
    /// Used for flows that track their own state; no order row is recorded
    /// and no settlement can follow.
    pub async fn create_transaction_order(
        &self,
        req: TransactionOrderRequest,
    ) -> Result<TransactionOrderResponse, AppError> {
        if req.amount <= 0 {
            return Err(AppError::BadRequest("Amount must be positive".into()));
        }
        let amount = Money::new(req.amount, Currency::EUR)?;

        let code = self
            .provider
            .create_order(&ProviderOrder {
                amount,
                merchant_description: "Direct checkout".into(),
                customer: None,
            })
            .await?;

        Ok(TransactionOrderResponse {
            smart_checkout_url: self.provider.checkout_url(code),
        })
    }

    /// Asks the PSP whether an order has been paid.
    pub async fn verify_transaction_state(
        &self,
        req: TransactionVerificationRequest,
    ) -> Result<TransactionVerificationResponse, AppError> {
        let paid = self.provider.order_paid(req.order_code).await?;
        Ok(TransactionVerificationResponse { verification: paid })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a new account.
    pub async fn create_account(
        &self,
        req: CreateAccountRequest,
    ) -> Result<AccountResponse, AppError> {
        let account = Account::new(req.name)?;
        let account = self
            .repo
            .create_account(account)
            .await
            .map_err(AppError::from)?;
        Ok(account_response(account))
    }

    /// Gets an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<AccountResponse, AppError> {
        let account = self.find_account(id).await?;
        Ok(account_response(account))
    }

    /// Lists all accounts.
    pub async fn list_accounts(&self) -> Result<Vec<AccountResponse>, AppError> {
        let accounts = self.repo.list_accounts().await.map_err(AppError::from)?;
        Ok(accounts.into_iter().map(account_response).collect())
    }

    /// Derives an account balance from the payment ledger.
    pub async fn account_balance(&self, id: AccountId) -> Result<BalanceResponse, AppError> {
        let account = self.find_account(id).await?;
        let balance = self
            .repo
            .account_balance(account.id)
            .await
            .map_err(AppError::from)?;
        Ok(BalanceResponse {
            account_id: account.id,
            balance,
        })
    }

    async fn find_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await
            .map_err(Into::into)
            .and_then(|opt| opt.ok_or_else(|| AppError::NotFound(format!("Account {}", id))))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Item Catalog
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a catalog item. A zero price marks a free-amount item.
    pub async fn create_item(&self, req: CreateItemRequest) -> Result<ItemResponse, AppError> {
        let price = Money::new(req.price, req.currency)?;
        let item = Item::new(req.name, price)?;
        let item = self.repo.create_item(item).await.map_err(AppError::from)?;
        Ok(item_response(item))
    }

    /// Lists the item catalog.
    pub async fn list_items(&self) -> Result<Vec<ItemResponse>, AppError> {
        let items = self.repo.list_items().await.map_err(AppError::from)?;
        Ok(items.into_iter().map(item_response).collect())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment Ledger
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists all payment ledger rows.
    pub async fn list_payments(&self) -> Result<Vec<PaymentResponse>, AppError> {
        let payments = self.repo.list_payments().await.map_err(AppError::from)?;
        Ok(payments.into_iter().map(payment_response).collect())
    }

    /// Inserts manual correction rows, all-or-nothing.
    ///
    /// Corrections carry no order code; `authorized_by` defaults to
    /// "manual" when omitted.
    pub async fn create_payments(&self, req: CreatePaymentsRequest) -> Result<(), AppError> {
        if req.payments.is_empty() {
            return Err(AppError::BadRequest("Payment batch cannot be empty".into()));
        }

        let mut entries = Vec::with_capacity(req.payments.len());
        for row in req.payments {
            if row.amount <= 0 {
                return Err(AppError::BadRequest(
                    "Payment amount must be positive".into(),
                ));
            }
            let amount = Money::new(row.amount, row.currency)?;
            entries.push(PaymentEntry::new(
                None,
                row.sender,
                row.receiver,
                row.entry_type,
                amount,
                row.item,
                row.authorized_by.unwrap_or_else(|| "manual".to_string()),
            ));
        }

        self.repo.create_payments(entries).await.map_err(Into::into)
    }
}

/// Sums the order lines, treating free-amount lines as quantity-in-cents.
fn order_total(lines: &[OrderLine]) -> Result<Money, AppError> {
    let mut total: Option<Money> = None;
    for line in lines {
        let amount = line.amount()?;
        total = Some(match total {
            Some(sum) => sum.checked_add(amount)?,
            None => amount,
        });
    }
    Ok(total.unwrap_or_else(|| Money::zero(Currency::EUR)))
}

fn verify_response(
    order: &PendingOrder,
    transaction_id: &str,
    verified: bool,
) -> VerifyOrderResponse {
    let entries = order
        .entries
        .iter()
        .map(|line| OrderEntryResponse {
            item: line.item,
            quantity: line.quantity,
            price: line.unit_price.amount(),
            sender: order.buyer,
            receiver: order.vendor,
        })
        .collect();

    VerifyOrderResponse {
        id: order.id,
        order_code: order.order_code.to_string(),
        transaction_id: transaction_id.to_string(),
        verified,
        vendor: order.vendor,
        user: order.buyer,
        timestamp: order.created_at,
        entries,
    }
}

fn account_response(account: Account) -> AccountResponse {
    AccountResponse {
        id: account.id,
        name: account.name,
    }
}

fn item_response(item: Item) -> ItemResponse {
    ItemResponse {
        id: item.id,
        name: item.name,
        price: item.price.amount(),
        currency: item.price.currency(),
    }
}

fn payment_response(entry: PaymentEntry) -> PaymentResponse {
    PaymentResponse {
        id: entry.id,
        order_code: entry.order_code,
        sender: entry.sender,
        receiver: entry.receiver,
        entry_type: entry.entry_type,
        amount: entry.amount.amount(),
        currency: entry.amount.currency(),
        item: entry.item,
        authorized_by: entry.authorized_by,
        timestamp: entry.created_at,
    }
}
