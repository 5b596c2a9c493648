//! Shared database types with feature-gated fields for SQLite and PostgreSQL.
//!
//! SQLite stores ids as TEXT and timestamps as RFC 3339 strings; PostgreSQL
//! uses native UUID and TIMESTAMPTZ columns.

use sqlx::FromRow;

use streetpay_types::{
    Account, AccountId, ApiKey, ApiKeyId, Currency, Item, ItemId, Money, OrderCode, OrderId,
    OrderLine, PaymentEntry, PaymentId, PaymentType, PendingOrder, RepoError,
};

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, Utc};
#[cfg(not(feature = "sqlite"))]
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    match s {
        "EUR" => Ok(Currency::EUR),
        "USD" => Ok(Currency::USD),
        _ => Err(RepoError::Database(format!("Unknown currency: {}", s))),
    }
}

pub fn parse_payment_type(s: &str) -> Result<PaymentType, RepoError> {
    match s {
        "PURCHASE" => Ok(PaymentType::Purchase),
        "FEE" => Ok(PaymentType::Fee),
        "TIP" => Ok(PaymentType::Tip),
        _ => Err(RepoError::Database(format!("Unknown payment type: {}", s))),
    }
}

#[cfg(feature = "sqlite")]
fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

#[cfg(feature = "sqlite")]
fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Account row from database.
#[derive(FromRow)]
pub struct DbAccount {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub name: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

impl DbAccount {
    /// Convert database row to domain Account.
    pub fn into_domain(self) -> Result<Account, RepoError> {
        #[cfg(not(feature = "sqlite"))]
        let (id, created_at) = (AccountId::from_uuid(self.id), self.created_at);

        #[cfg(feature = "sqlite")]
        let (id, created_at) = (
            AccountId::from_uuid(parse_uuid(&self.id)?),
            parse_timestamp(&self.created_at)?,
        );

        Ok(Account::from_parts(id, self.name, created_at))
    }
}

/// Item row from database.
#[derive(FromRow)]
pub struct DbItem {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub name: String,
    pub price: i64,
    pub currency: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

impl DbItem {
    /// Convert database row to domain Item.
    pub fn into_domain(self) -> Result<Item, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let price = Money::new(self.price, currency).map_err(RepoError::Domain)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, created_at) = (ItemId::from_uuid(self.id), self.created_at);

        #[cfg(feature = "sqlite")]
        let (id, created_at) = (
            ItemId::from_uuid(parse_uuid(&self.id)?),
            parse_timestamp(&self.created_at)?,
        );

        Ok(Item::from_parts(id, self.name, price, created_at))
    }
}

/// Order row from database (without entries).
#[derive(FromRow)]
pub struct DbOrder {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub order_code: i64,

    #[cfg(not(feature = "sqlite"))]
    pub vendor_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub vendor_id: String,

    #[cfg(not(feature = "sqlite"))]
    pub buyer_id: Option<Uuid>,
    #[cfg(feature = "sqlite")]
    pub buyer_id: Option<String>,

    pub amount: i64,
    pub currency: String,

    #[cfg(not(feature = "sqlite"))]
    pub settled: bool,
    #[cfg(feature = "sqlite")]
    pub settled: i64,

    pub transaction_id: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

impl DbOrder {
    /// Convert database row plus entry rows to a domain PendingOrder.
    pub fn into_domain(self, entries: Vec<DbOrderEntry>) -> Result<PendingOrder, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let amount = Money::new(self.amount, currency).map_err(RepoError::Domain)?;
        let lines = entries
            .into_iter()
            .map(DbOrderEntry::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        #[cfg(not(feature = "sqlite"))]
        let (id, vendor, buyer, settled, created_at) = (
            OrderId::from_uuid(self.id),
            AccountId::from_uuid(self.vendor_id),
            self.buyer_id.map(AccountId::from_uuid),
            self.settled,
            self.created_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, vendor, buyer, settled, created_at) = (
            OrderId::from_uuid(parse_uuid(&self.id)?),
            AccountId::from_uuid(parse_uuid(&self.vendor_id)?),
            self.buyer_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(AccountId::from_uuid),
            self.settled != 0,
            parse_timestamp(&self.created_at)?,
        );

        Ok(PendingOrder::from_parts(
            id,
            OrderCode::new(self.order_code),
            vendor,
            buyer,
            amount,
            lines,
            settled,
            self.transaction_id,
            created_at,
        ))
    }
}

/// Order entry row from database.
#[derive(FromRow)]
pub struct DbOrderEntry {
    #[cfg(not(feature = "sqlite"))]
    pub item_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub item_id: String,

    pub quantity: i64,
    pub unit_price: i64,
    pub currency: String,
}

impl DbOrderEntry {
    /// Convert database row to a domain OrderLine.
    pub fn into_domain(self) -> Result<OrderLine, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let unit_price = Money::new(self.unit_price, currency).map_err(RepoError::Domain)?;

        #[cfg(not(feature = "sqlite"))]
        let item = ItemId::from_uuid(self.item_id);

        #[cfg(feature = "sqlite")]
        let item = ItemId::from_uuid(parse_uuid(&self.item_id)?);

        Ok(OrderLine {
            item,
            quantity: self.quantity,
            unit_price,
        })
    }
}

/// Payment row from database.
#[derive(FromRow)]
pub struct DbPayment {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub order_code: Option<i64>,

    #[cfg(not(feature = "sqlite"))]
    pub sender_id: Option<Uuid>,
    #[cfg(feature = "sqlite")]
    pub sender_id: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub receiver_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub receiver_id: String,

    pub entry_type: String,
    pub amount: i64,
    pub currency: String,

    #[cfg(not(feature = "sqlite"))]
    pub item_id: Option<Uuid>,
    #[cfg(feature = "sqlite")]
    pub item_id: Option<String>,

    pub authorized_by: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

impl DbPayment {
    /// Convert database row to domain PaymentEntry.
    pub fn into_domain(self) -> Result<PaymentEntry, RepoError> {
        let currency = parse_currency(&self.currency)?;
        let entry_type = parse_payment_type(&self.entry_type)?;
        let amount = Money::new(self.amount, currency).map_err(RepoError::Domain)?;

        #[cfg(not(feature = "sqlite"))]
        let (id, sender, receiver, item, created_at) = (
            PaymentId::from_uuid(self.id),
            self.sender_id.map(AccountId::from_uuid),
            AccountId::from_uuid(self.receiver_id),
            self.item_id.map(ItemId::from_uuid),
            self.created_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, sender, receiver, item, created_at) = (
            PaymentId::from_uuid(parse_uuid(&self.id)?),
            self.sender_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(AccountId::from_uuid),
            AccountId::from_uuid(parse_uuid(&self.receiver_id)?),
            self.item_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(ItemId::from_uuid),
            parse_timestamp(&self.created_at)?,
        );

        Ok(PaymentEntry::from_parts(
            id,
            self.order_code.map(OrderCode::new),
            sender,
            receiver,
            entry_type,
            amount,
            item,
            self.authorized_by,
            created_at,
        ))
    }
}

/// API key row from database.
#[derive(FromRow)]
pub struct DbApiKey {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub name: String,
    pub key_hash: String,

    #[cfg(not(feature = "sqlite"))]
    pub is_active: bool,
    #[cfg(feature = "sqlite")]
    pub is_active: i64,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub last_used_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub last_used_at: Option<String>,
}

impl DbApiKey {
    /// Convert database row to domain ApiKey.
    pub fn into_domain(self) -> Result<ApiKey, RepoError> {
        #[cfg(not(feature = "sqlite"))]
        let (id, is_active, created_at, last_used_at) = (
            ApiKeyId::from_uuid(self.id),
            self.is_active,
            self.created_at,
            self.last_used_at,
        );

        #[cfg(feature = "sqlite")]
        let (id, is_active, created_at, last_used_at) = (
            ApiKeyId::from_uuid(parse_uuid(&self.id)?),
            self.is_active != 0,
            parse_timestamp(&self.created_at)?,
            self.last_used_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        );

        Ok(ApiKey {
            id,
            name: self.name,
            key_hash: self.key_hash,
            is_active,
            created_at,
            last_used_at,
        })
    }
}
