//! Payment provider port trait.
//!
//! The outbound boundary to the PSP. Implementations own token caching and
//! wire formats; callers see only domain-shaped inputs and outputs.

use crate::domain::{Money, OrderCode};
use crate::error::ProviderError;

/// Optional customer details attached to a checkout order.
#[derive(Debug, Clone, Default)]
pub struct CustomerInfo {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub country_code: Option<String>,
    pub request_lang: Option<String>,
}

/// A checkout order to be created at the PSP.
#[derive(Debug, Clone)]
pub struct ProviderOrder {
    /// Total amount in smallest currency unit
    pub amount: Money,
    /// Free-text shown in the merchant backoffice
    pub merchant_description: String,
    pub customer: Option<CustomerInfo>,
}

/// Result of asking the PSP whether a transaction went through.
#[derive(Debug, Clone)]
pub struct TransactionCheck {
    /// True only if the transaction completed and matches the order code
    pub verified: bool,
    /// PSP-confirmed amount in smallest currency unit, when verified
    pub amount: Option<Money>,
}

/// Outbound port to the payment service provider.
#[async_trait::async_trait]
pub trait PaymentProvider: Send + Sync + 'static {
    /// Creates a checkout order and returns the PSP-issued order code.
    ///
    /// Has no ledger side effects; an abandoned order leaves no trace.
    async fn create_order(&self, order: &ProviderOrder) -> Result<OrderCode, ProviderError>;

    /// Re-asks the PSP whether a transaction is complete. Never cached.
    async fn verify_transaction(
        &self,
        code: OrderCode,
        transaction_id: &str,
    ) -> Result<TransactionCheck, ProviderError>;

    /// Checks the payment state of an order directly.
    async fn order_paid(&self, code: OrderCode) -> Result<bool, ProviderError>;

    /// Composes the hosted checkout URL for an order code.
    fn checkout_url(&self, code: OrderCode) -> String;
}
