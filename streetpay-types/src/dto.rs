//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{AccountId, ApiKeyId, Currency, ItemId, OrderCode, OrderId, PaymentType};

// ─────────────────────────────────────────────────────────────────────────────
// Order DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// One requested line of an order.
///
/// For entries referencing a zero-priced item (tips), the quantity is the
/// amount in cents.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderEntry {
    /// Catalog item id
    pub item: ItemId,
    #[schema(example = 1)]
    pub quantity: i64,
}

/// Request to create a checkout order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Vendor account receiving the purchase
    pub vendor: AccountId,
    /// Buyer account; absent for anonymous orders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<AccountId>,
    pub entries: Vec<CreateOrderEntry>,
}

/// Response after creating a checkout order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    /// Hosted checkout URL the buyer is redirected to
    #[serde(rename = "smartCheckoutURL")]
    #[schema(example = "https://www.vivapayments.com/web/checkout?ref=1234567890")]
    pub smart_checkout_url: String,
}

/// Query parameters of the order verification endpoint.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyOrderParams {
    /// Order code issued at order creation
    #[schema(example = "1234567890")]
    pub s: String,
    /// PSP transaction id
    pub t: String,
}

/// One settled or pending entry in a verification response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderEntryResponse {
    pub item: ItemId,
    pub quantity: i64,
    /// Price at time of purchase in cents
    #[schema(example = 350)]
    pub price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<AccountId>,
    pub receiver: AccountId,
}

/// Response of the order verification endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOrderResponse {
    pub id: OrderId,
    #[schema(example = "1234567890")]
    pub order_code: String,
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    /// False when the PSP did not confirm the transaction
    pub verified: bool,
    pub vendor: AccountId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AccountId>,
    pub timestamp: DateTime<Utc>,
    pub entries: Vec<OrderEntryResponse>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Low-level PSP DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request for a bare checkout order with no retained context.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionOrderRequest {
    /// Amount in smallest currency unit
    #[schema(example = 350)]
    pub amount: i64,
}

/// Response for a bare checkout order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionOrderResponse {
    #[serde(rename = "smartCheckoutURL")]
    pub smart_checkout_url: String,
}

/// Request to check whether an order has been paid at the PSP.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionVerificationRequest {
    pub order_code: OrderCode,
}

/// Response of the bare verification endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionVerificationResponse {
    pub verification: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Account DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a new account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    /// Name of the account holder
    #[schema(example = "Alice")]
    pub name: String,
}

/// Response describing an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    /// Unique account identifier
    pub id: AccountId,
    /// Name of the account holder
    #[schema(example = "Alice")]
    pub name: String,
}

/// Response carrying a derived account balance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account_id: AccountId,
    /// Sum of received minus sent payments, in smallest currency unit
    #[schema(example = 700)]
    pub balance: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Item DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a catalog item.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    #[schema(example = "Street paper #42")]
    pub name: String,
    /// Unit price in smallest currency unit; zero for free-amount items
    #[schema(example = 350)]
    pub price: i64,
    #[serde(default = "default_currency")]
    pub currency: Currency,
}

fn default_currency() -> Currency {
    Currency::EUR
}

/// Response describing a catalog item.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemResponse {
    pub id: ItemId,
    #[schema(example = "Street paper #42")]
    pub name: String,
    /// Unit price in smallest currency unit
    #[schema(example = 350)]
    pub price: i64,
    pub currency: Currency,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// One payment ledger row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: crate::domain::PaymentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_code: Option<OrderCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<AccountId>,
    pub receiver: AccountId,
    #[serde(rename = "type")]
    pub entry_type: PaymentType,
    /// Amount in smallest currency unit
    #[schema(example = 350)]
    pub amount: i64,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemId>,
    pub authorized_by: String,
    pub timestamp: DateTime<Utc>,
}

/// One row of a manual correction batch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<AccountId>,
    pub receiver: AccountId,
    #[serde(rename = "type")]
    pub entry_type: PaymentType,
    /// Amount in smallest currency unit
    #[schema(example = 350)]
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemId>,
    /// Defaults to "manual" when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_by: Option<String>,
}

/// Request to insert payment rows directly (all-or-nothing).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePaymentsRequest {
    pub payments: Vec<CreatePaymentEntry>,
}

// ─────────────────────────────────────────────────────────────────────────────
// API key DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create an API key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateApiKeyRequest {
    /// Human-readable key name
    #[schema(example = "backoffice")]
    pub name: String,
}

/// Response after creating an API key.
///
/// The raw key is returned exactly once; only its hash is stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub id: ApiKeyId,
    pub name: String,
    /// The raw API key. Store it - it cannot be retrieved again.
    #[schema(example = "sk_AbCdEf012345...")]
    pub api_key: String,
}

/// Generic error body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Resource not found")]
    pub error: String,
}
