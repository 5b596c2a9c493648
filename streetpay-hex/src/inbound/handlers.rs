//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use streetpay_types::{
    AccountId, ApiKeyResponse, AppError, CreateAccountRequest, CreateApiKeyRequest,
    CreateItemRequest, CreateOrderRequest, CreatePaymentsRequest, PaymentProvider,
    SettlementRepository, TransactionOrderRequest, TransactionVerificationRequest,
    VerifyOrderParams,
};

use crate::OrderService;

/// Application state shared across handlers.
pub struct AppState<R: SettlementRepository, P: PaymentProvider> {
    pub service: OrderService<R, P>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::ProviderRejected => (
                StatusCode::BAD_GATEWAY,
                "Order rejected by payment provider".to_string(),
            ),
            AppError::ProviderUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Payment provider unavailable".to_string(),
            ),
            AppError::AmountMismatch {
                confirmed,
                computed,
            } => (
                StatusCode::CONFLICT,
                format!(
                    "Amount mismatch: confirmed {}, computed {}",
                    confirmed, computed
                ),
            ),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Orders
// ─────────────────────────────────────────────────────────────────────────────

/// Create a checkout order and return the hosted checkout URL.
#[tracing::instrument(skip(state), fields(vendor = %req.vendor))]
pub async fn create_order<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.create_order(req).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// Verify an order against the PSP and settle it.
#[tracing::instrument(skip(state), fields(order_code = %params.s))]
pub async fn verify_order<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Query(params): Query<VerifyOrderParams>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.verify_order(params).await?;
    Ok(Json(resp))
}

// ─────────────────────────────────────────────────────────────────────────────
// Bare PSP endpoints
// ─────────────────────────────────────────────────────────────────────────────

/// Create a checkout order with no retained context.
#[tracing::instrument(skip(state), fields(amount = req.amount))]
pub async fn create_transaction_order<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Json(req): Json<TransactionOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.create_transaction_order(req).await?;
    Ok(Json(resp))
}

/// Check the payment state of an order at the PSP.
#[tracing::instrument(skip(state), fields(order_code = %req.order_code))]
pub async fn verify_transaction<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Json(req): Json<TransactionVerificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.service.verify_transaction_state(req).await?;
    Ok(Json(resp))
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state))]
pub async fn create_account<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.service.create_account(req).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// List all accounts.
#[tracing::instrument(skip(state))]
pub async fn list_accounts<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = state.service.list_accounts().await?;
    Ok(Json(accounts))
}

/// Get account by ID.
#[tracing::instrument(skip(state), fields(account_id = %id))]
pub async fn get_account<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id: AccountId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid account ID".into()))?;

    let account = state.service.get_account(account_id).await?;
    Ok(Json(account))
}

/// Get the ledger-derived balance of an account.
#[tracing::instrument(skip(state), fields(account_id = %id))]
pub async fn account_balance<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id: AccountId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid account ID".into()))?;

    let balance = state.service.account_balance(account_id).await?;
    Ok(Json(balance))
}

// ─────────────────────────────────────────────────────────────────────────────
// Items
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state), fields(name = %req.name))]
pub async fn create_item<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.service.create_item(req).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// List the item catalog.
#[tracing::instrument(skip(state))]
pub async fn list_items<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.service.list_items().await?;
    Ok(Json(items))
}

// ─────────────────────────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────────────────────────

/// List all payment ledger rows.
#[tracing::instrument(skip(state))]
pub async fn list_payments<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
) -> Result<impl IntoResponse, ApiError> {
    let payments = state.service.list_payments().await?;
    Ok(Json(payments))
}

/// Insert manual correction rows, all-or-nothing.
#[tracing::instrument(skip(state, req))]
pub async fn create_payments<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Json(req): Json<CreatePaymentsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.create_payments(req).await?;
    Ok(StatusCode::CREATED)
}

// ─────────────────────────────────────────────────────────────────────────────
// API keys
// ─────────────────────────────────────────────────────────────────────────────

/// Bootstrap endpoint - creates the first API key.
///
/// This endpoint only works when there are NO existing API keys in the system.
/// It returns the raw API key (only shown once) that should be saved securely.
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct BootstrapRequest {
    /// Name for the API key
    #[schema(example = "backoffice")]
    pub name: String,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct BootstrapResponse {
    /// The generated API key (shown only once)
    #[schema(example = "sk_abc123xyz...")]
    pub api_key: String,
    /// Informational message
    pub message: String,
}

#[tracing::instrument(skip(state), fields(key_name = %req.name))]
pub async fn bootstrap<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Json(req): Json<BootstrapRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key_count = state
        .service
        .repo()
        .count_api_keys()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if key_count > 0 {
        return Err(AppError::BadRequest(
            "Bootstrap not allowed: API keys already exist. Use an existing key to create new ones.".into()
        ).into());
    }

    let (_api_key, raw_key) = state
        .service
        .repo()
        .create_api_key(&req.name)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(BootstrapResponse {
            api_key: raw_key,
            message: "First API key created. Save this key securely - it won't be shown again!"
                .into(),
        }),
    ))
}

/// Create a new API key (requires authentication).
#[tracing::instrument(skip(state), fields(key_name = %req.name))]
pub async fn create_api_key<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    Json(req): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (api_key, raw_key) = state
        .service
        .repo()
        .create_api_key(&req.name)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyResponse {
            id: api_key.id,
            name: api_key.name,
            api_key: raw_key,
        }),
    ))
}
