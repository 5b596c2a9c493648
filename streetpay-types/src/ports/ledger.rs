//! Settlement repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, mocks) implement this trait.

use crate::domain::{
    Account, AccountId, ApiKey, Item, ItemId, OrderCode, PaymentBatch, PaymentEntry, PendingOrder,
    SettleOutcome,
};
use crate::error::RepoError;

/// The main repository port for the settlement ledger.
///
/// All operations that write multiple rows MUST be atomic.
/// Implementations use database transactions to ensure a batch is either
/// fully applied or not at all.
#[async_trait::async_trait]
pub trait SettlementRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Account Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a new account.
    async fn create_account(&self, account: Account) -> Result<Account, RepoError>;

    /// Gets an account by ID.
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError>;

    /// Lists all accounts.
    async fn list_accounts(&self) -> Result<Vec<Account>, RepoError>;

    /// Derives an account balance as received minus sent over payment rows.
    async fn account_balance(&self, id: AccountId) -> Result<i64, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Item Catalog
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a catalog item.
    async fn create_item(&self, item: Item) -> Result<Item, RepoError>;

    /// Gets an item by ID.
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepoError>;

    /// Lists all catalog items.
    async fn list_items(&self) -> Result<Vec<Item>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Order Context
    // ─────────────────────────────────────────────────────────────────────────────

    /// Persists a pending order and its entries, keyed by order code.
    async fn record_order(&self, order: PendingOrder) -> Result<PendingOrder, RepoError>;

    /// Finds a pending order with its entries by order code.
    async fn find_order(&self, code: OrderCode) -> Result<Option<PendingOrder>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Settlement (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Atomically settles an order: marks it settled and writes the batch.
    ///
    /// The settled flag flips from FALSE inside the same transaction that
    /// inserts the payment rows. If the order was already settled, nothing
    /// is written and the previously stored batch is returned as
    /// `SettleOutcome::AlreadySettled`.
    async fn settle_order(
        &self,
        code: OrderCode,
        transaction_id: &str,
        batch: PaymentBatch,
    ) -> Result<SettleOutcome, RepoError>;

    /// Returns the payment rows written for an order.
    async fn payments_for_order(&self, code: OrderCode) -> Result<Vec<PaymentEntry>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Payments (administrative path)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists all payment rows.
    async fn list_payments(&self) -> Result<Vec<PaymentEntry>, RepoError>;

    /// Inserts payment rows directly, all-or-nothing.
    async fn create_payments(&self, entries: Vec<PaymentEntry>) -> Result<(), RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // API Keys
    // ─────────────────────────────────────────────────────────────────────────────

    /// Finds an active API key by the hash of the raw key.
    async fn verify_api_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError>;

    /// Generates and stores a new API key. Returns the key and its raw
    /// value; only the hash is persisted.
    async fn create_api_key(&self, name: &str) -> Result<(ApiKey, String), RepoError>;

    /// Counts stored API keys (bootstrap gate).
    async fn count_api_keys(&self) -> Result<i64, RepoError>;
}
