//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;
use uuid::Uuid;

use streetpay_types::{
    Account, AccountId, ApiKey, ApiKeyId, Item, ItemId, OrderCode, PaymentBatch, PaymentEntry,
    PendingOrder, RepoError, SettleOutcome, SettlementRepository,
};

use crate::types::{DbAccount, DbApiKey, DbItem, DbOrder, DbOrderEntry, DbPayment};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl).execute(&pool).await?;

        let ddl_keys = include_str!("../migrations/0002_create_api_keys.sql");
        sqlx::query(ddl_keys).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn payments_for_order_rows(
        &self,
        code: OrderCode,
    ) -> Result<Vec<PaymentEntry>, RepoError> {
        let rows: Vec<DbPayment> = sqlx::query_as(
            r#"SELECT id, order_code, sender_id, receiver_id, entry_type, amount, currency, item_id, authorized_by, created_at
               FROM payments WHERE order_code = ? ORDER BY created_at ASC, id ASC"#,
        )
        .bind(code.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbPayment::into_domain).collect()
    }
}

async fn insert_payment(
    db_tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    entry: &PaymentEntry,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO payments (id, order_code, sender_id, receiver_id, entry_type, amount, currency, item_id, authorized_by, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(entry.id.to_string())
    .bind(entry.order_code.map(|c| c.value()))
    .bind(entry.sender.map(|s| s.to_string()))
    .bind(entry.receiver.to_string())
    .bind(entry.entry_type.to_string())
    .bind(entry.amount.amount())
    .bind(entry.amount.currency().to_string())
    .bind(entry.item.map(|i| i.to_string()))
    .bind(&entry.authorized_by)
    .bind(entry.created_at.to_rfc3339())
    .execute(&mut **db_tx)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl SettlementRepository for SqliteRepo {
    async fn create_account(&self, account: Account) -> Result<Account, RepoError> {
        sqlx::query(r#"INSERT INTO accounts (id, name, created_at) VALUES (?, ?, ?)"#)
            .bind(account.id.to_string())
            .bind(&account.name)
            .bind(account.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, RepoError> {
        let row: Option<DbAccount> =
            sqlx::query_as(r#"SELECT id, name, created_at FROM accounts WHERE id = ?"#)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbAccount::into_domain).transpose()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, RepoError> {
        let rows: Vec<DbAccount> =
            sqlx::query_as(r#"SELECT id, name, created_at FROM accounts ORDER BY created_at DESC"#)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbAccount::into_domain).collect()
    }

    async fn account_balance(&self, id: AccountId) -> Result<i64, RepoError> {
        let id_str = id.to_string();

        // Derived on demand, never stored.
        let row: (i64,) = sqlx::query_as(
            r#"SELECT COALESCE((SELECT SUM(amount) FROM payments WHERE receiver_id = ?), 0)
                    - COALESCE((SELECT SUM(amount) FROM payments WHERE sender_id = ?), 0)"#,
        )
        .bind(&id_str)
        .bind(&id_str)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }

    async fn create_item(&self, item: Item) -> Result<Item, RepoError> {
        sqlx::query(
            r#"INSERT INTO items (id, name, price, currency, created_at) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(item.id.to_string())
        .bind(&item.name)
        .bind(item.price.amount())
        .bind(item.price.currency().to_string())
        .bind(item.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(item)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, RepoError> {
        let row: Option<DbItem> =
            sqlx::query_as(r#"SELECT id, name, price, currency, created_at FROM items WHERE id = ?"#)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbItem::into_domain).transpose()
    }

    async fn list_items(&self) -> Result<Vec<Item>, RepoError> {
        let rows: Vec<DbItem> = sqlx::query_as(
            r#"SELECT id, name, price, currency, created_at FROM items ORDER BY created_at ASC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbItem::into_domain).collect()
    }

    #[tracing::instrument(skip(self, order), fields(order_code = %order.order_code))]
    async fn record_order(&self, order: PendingOrder) -> Result<PendingOrder, RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO orders (id, order_code, vendor_id, buyer_id, amount, currency, settled, transaction_id, created_at)
               VALUES (?, ?, ?, ?, ?, ?, 0, NULL, ?)"#,
        )
        .bind(order.id.to_string())
        .bind(order.order_code.value())
        .bind(order.vendor.to_string())
        .bind(order.buyer.map(|b| b.to_string()))
        .bind(order.amount.amount())
        .bind(order.amount.currency().to_string())
        .bind(order.created_at.to_rfc3339())
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        for line in &order.entries {
            sqlx::query(
                r#"INSERT INTO order_entries (order_code, item_id, quantity, unit_price, currency)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(order.order_code.value())
            .bind(line.item.to_string())
            .bind(line.quantity)
            .bind(line.unit_price.amount())
            .bind(line.unit_price.currency().to_string())
            .execute(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(order)
    }

    async fn find_order(&self, code: OrderCode) -> Result<Option<PendingOrder>, RepoError> {
        let row: Option<DbOrder> = sqlx::query_as(
            r#"SELECT id, order_code, vendor_id, buyer_id, amount, currency, settled, transaction_id, created_at
               FROM orders WHERE order_code = ?"#,
        )
        .bind(code.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let Some(order) = row else {
            return Ok(None);
        };

        let entries: Vec<DbOrderEntry> = sqlx::query_as(
            r#"SELECT item_id, quantity, unit_price, currency
               FROM order_entries WHERE order_code = ? ORDER BY id ASC"#,
        )
        .bind(code.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        order.into_domain(entries).map(Some)
    }

    #[tracing::instrument(skip(self, batch), fields(order_code = %code))]
    async fn settle_order(
        &self,
        code: OrderCode,
        transaction_id: &str,
        batch: PaymentBatch,
    ) -> Result<SettleOutcome, RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // The settled flag is the idempotency gate: the guarded UPDATE
        // succeeds for exactly one caller per order code.
        let result = sqlx::query(
            r#"UPDATE orders SET settled = 1, transaction_id = ?
               WHERE order_code = ? AND settled = 0"#,
        )
        .bind(transaction_id)
        .bind(code.value())
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            drop(db_tx);

            let exists: Option<(i64,)> =
                sqlx::query_as(r#"SELECT settled FROM orders WHERE order_code = ?"#)
                    .bind(code.value())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| RepoError::Database(e.to_string()))?;

            return match exists {
                None => Err(RepoError::NotFound),
                Some(_) => {
                    let entries = self.payments_for_order_rows(code).await?;
                    Ok(SettleOutcome::AlreadySettled(PaymentBatch {
                        order_code: code,
                        entries,
                    }))
                }
            };
        }

        for entry in &batch.entries {
            insert_payment(&mut db_tx, entry).await?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(SettleOutcome::Settled(batch))
    }

    async fn payments_for_order(&self, code: OrderCode) -> Result<Vec<PaymentEntry>, RepoError> {
        self.payments_for_order_rows(code).await
    }

    async fn list_payments(&self) -> Result<Vec<PaymentEntry>, RepoError> {
        let rows: Vec<DbPayment> = sqlx::query_as(
            r#"SELECT id, order_code, sender_id, receiver_id, entry_type, amount, currency, item_id, authorized_by, created_at
               FROM payments ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbPayment::into_domain).collect()
    }

    #[tracing::instrument(skip(self, entries), fields(count = entries.len()))]
    async fn create_payments(&self, entries: Vec<PaymentEntry>) -> Result<(), RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        for entry in &entries {
            insert_payment(&mut db_tx, entry).await?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn verify_api_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError> {
        let row: Option<DbApiKey> = sqlx::query_as(
            r#"SELECT id, name, key_hash, is_active, created_at, last_used_at
               FROM api_keys WHERE key_hash = ? AND is_active = 1"#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbApiKey::into_domain).transpose()
    }

    async fn create_api_key(&self, name: &str) -> Result<(ApiKey, String), RepoError> {
        use rand::Rng;
        use rand::distr::Alphanumeric;

        let raw_key: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let prefixed_key = format!("sk_{}", raw_key);

        let key_hash = crate::security::hash_api_key(&prefixed_key);
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"INSERT INTO api_keys (id, name, key_hash, is_active, created_at)
               VALUES (?, ?, ?, 1, ?)"#,
        )
        .bind(id.to_string())
        .bind(name)
        .bind(&key_hash)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let api_key = ApiKey {
            id: ApiKeyId::from_uuid(id),
            name: name.to_string(),
            key_hash,
            is_active: true,
            created_at: now,
            last_used_at: None,
        };

        Ok((api_key, prefixed_key))
    }

    async fn count_api_keys(&self) -> Result<i64, RepoError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_keys WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }
}
