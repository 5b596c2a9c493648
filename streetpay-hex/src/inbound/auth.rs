//! Authentication middleware for API key validation.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use streetpay_types::{PaymentProvider, SettlementRepository};

use super::handlers::AppState;

/// Extracts the API key from the Authorization header.
/// Expected format: "Bearer <api_key>" or just "<api_key>"
fn extract_api_key(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;
    if let Some(key) = header.strip_prefix("Bearer ") {
        Some(key)
    } else {
        Some(header)
    }
}

/// Returns true for endpoints the buyer-facing checkout flow reaches
/// without credentials.
///
/// Buyers arrive anonymously from a vendor's QR code, so order creation,
/// verification, the bare PSP endpoints and the catalog stay open. The
/// ledger and account management require an API key.
fn is_public(method: &Method, path: &str) -> bool {
    match (method, path) {
        (&Method::GET, "/health") => true,
        (&Method::POST, "/api/bootstrap") => true,
        (&Method::POST, "/api/orders") => true,
        (&Method::POST, "/api/orders/verify") => true,
        (&Method::POST, "/api/vivawallet/transaction_order") => true,
        (&Method::POST, "/api/vivawallet/transaction_verification") => true,
        (&Method::GET, "/api/items") => true,
        // Vendors check their own balance from the app without a key.
        (&Method::GET, p) if p.starts_with("/api/accounts/") && p.ends_with("/balance") => true,
        (&Method::GET, p) if p.starts_with("/docs") || p.starts_with("/api-docs") => true,
        _ => false,
    }
}

/// Authentication middleware that validates API keys.
///
/// This middleware:
/// 1. Extracts the API key from the Authorization header
/// 2. Hashes it using SHA-256
/// 3. Verifies the hash against the database
/// 4. Returns 401 Unauthorized if validation fails
///
/// Endpoints listed in [`is_public`] bypass authentication; the bootstrap
/// endpoint has its own protection (it only works while no keys exist).
pub async fn auth_middleware<R: SettlementRepository, P: PaymentProvider>(
    State(state): State<Arc<AppState<R, P>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let api_key = match extract_api_key(auth_header) {
        Some(key) if !key.is_empty() => key,
        _ => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    let key_hash = streetpay_repo::security::hash_api_key(api_key);

    match state.service.repo().verify_api_key_hash(&key_hash).await {
        // Constant-time confirmation against the stored hash.
        Ok(Some(stored))
            if streetpay_repo::security::verify_api_key(api_key, &stored.key_hash) =>
        {
            next.run(request).await
        }
        Ok(Some(_)) | Ok(None) => unauthorized_response("Invalid API key"),
        Err(e) => {
            tracing::error!("API key verification failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Internal server error",
                    "code": 500
                })),
            )
                .into_response()
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": 401
        })),
    )
        .into_response()
}
