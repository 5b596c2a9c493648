//! VivaWallet checkout API client.
//!
//! Implements the `PaymentProvider` port: order creation against
//! `/checkout/v2/orders`, transaction verification against
//! `/checkout/v2/transactions/{id}`, and order state lookup. None of these
//! calls touch the ledger.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use streetpay_types::{
    Currency, Money, OrderCode, PaymentProvider, ProviderError, ProviderOrder, TransactionCheck,
};

use crate::auth::AuthClient;
use crate::config::VivaConfig;

/// Transaction status code the PSP reports for a completed payment.
const STATUS_FINISHED: &str = "F";

/// Order state the PSP reports once an order has been paid.
const ORDER_STATE_PAID: i64 = 3;

/// VivaWallet API client implementing the `PaymentProvider` port.
pub struct VivaClient {
    config: VivaConfig,
    auth: AuthClient,
    http: reqwest::Client,
}

impl VivaClient {
    /// Creates a client from configuration.
    pub fn new(config: VivaConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let auth = AuthClient::new(config.clone(), http.clone());
        Ok(Self { config, auth, http })
    }

    /// Creates a client from environment variables.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(VivaConfig::from_env()?)
    }

    async fn bearer(&self) -> Result<String, ProviderError> {
        self.auth.token().await
    }

    fn build_order_payload(&self, order: &ProviderOrder) -> CheckoutOrderRequest {
        CheckoutOrderRequest {
            amount: order.amount.amount(),
            customer_trns: order.merchant_description.clone(),
            customer: order.customer.as_ref().map(|c| WireCustomer {
                email: c.email.clone(),
                full_name: c.full_name.clone(),
                country_code: c.country_code.clone(),
                request_lang: c.request_lang.clone(),
            }),
            payment_timeout: 300,
            preauth: false,
            allow_recurring: false,
            max_installments: 0,
            payment_notification: true,
            disable_exact_amount: false,
            disable_cash: true,
            disable_wallet: true,
            source_code: self.config.source_code.clone(),
            // Unique per request so the backoffice can correlate retries.
            merchant_trns: Uuid::new_v4().to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, ProviderError> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

#[async_trait::async_trait]
impl PaymentProvider for VivaClient {
    #[instrument(skip(self, order), fields(amount = order.amount.amount()))]
    async fn create_order(&self, order: &ProviderOrder) -> Result<OrderCode, ProviderError> {
        let token = self.bearer().await?;
        let payload = self.build_order_payload(order);
        let url = format!("{}/checkout/v2/orders", self.config.api_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "PSP rejected order creation");
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CheckoutOrderResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

        debug!(order_code = parsed.order_code, "Created checkout order");
        Ok(OrderCode::new(parsed.order_code))
    }

    #[instrument(skip(self), fields(order_code = code.value()))]
    async fn verify_transaction(
        &self,
        code: OrderCode,
        transaction_id: &str,
    ) -> Result<TransactionCheck, ProviderError> {
        let url = format!(
            "{}/checkout/v2/transactions/{}",
            self.config.api_url, transaction_id
        );
        let tx: TransactionResponse = self.get_json(&url).await?;

        let verified = tx.status_id == STATUS_FINISHED && tx.order_code == code.value();
        if !verified {
            debug!(
                status_id = %tx.status_id,
                reported_code = tx.order_code,
                "Transaction not confirmed"
            );
            return Ok(TransactionCheck {
                verified: false,
                amount: None,
            });
        }

        // The PSP reports the amount in major units.
        let minor = (tx.amount * 100.0).round() as i64;
        let amount = Money::new(minor, Currency::EUR)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(TransactionCheck {
            verified: true,
            amount: Some(amount),
        })
    }

    #[instrument(skip(self), fields(order_code = code.value()))]
    async fn order_paid(&self, code: OrderCode) -> Result<bool, ProviderError> {
        let url = format!("{}/checkout/v2/orders/{}", self.config.api_url, code.value());
        let state: OrderStateResponse = self.get_json(&url).await?;
        Ok(state.state_id == ORDER_STATE_PAID)
    }

    fn checkout_url(&self, code: OrderCode) -> String {
        format!("{}/web/checkout?ref={}", self.config.checkout_url, code)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutOrderRequest {
    amount: i64,
    customer_trns: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer: Option<WireCustomer>,
    payment_timeout: u32,
    preauth: bool,
    allow_recurring: bool,
    max_installments: u32,
    payment_notification: bool,
    disable_exact_amount: bool,
    disable_cash: bool,
    disable_wallet: bool,
    source_code: String,
    merchant_trns: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCustomer {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_lang: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutOrderResponse {
    order_code: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionResponse {
    status_id: String,
    order_code: i64,
    /// Major units, e.g. 3.5 for €3.50
    amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderStateResponse {
    state_id: i64,
}
