//! Error types for the settlement engine.

use crate::domain::Currency;

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Order has no entries")]
    EmptyOrder,

    #[error("Batch amount {computed} does not match PSP-confirmed amount {confirmed}")]
    AmountMismatch { confirmed: i64, computed: i64 },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,
}

/// Errors from the payment service provider boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Credential exchange failed; configuration problem or PSP outage.
    #[error("PSP authentication failed: {0}")]
    Auth(String),

    /// The PSP declined the request; status and body kept for diagnostics.
    #[error("PSP rejected request: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Transport-level failure, safe to retry.
    #[error("PSP network error: {0}")]
    Network(String),

    /// The PSP answered with a body we could not parse.
    #[error("PSP response malformed: {0}")]
    Malformed(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes without exposing PSP internals.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Order rejected by payment provider")]
    ProviderRejected,

    #[error("Payment provider unavailable")]
    ProviderUnavailable,

    #[error("Amount mismatch: confirmed {confirmed}, computed {computed}")]
    AmountMismatch { confirmed: i64, computed: i64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(DomainError::AmountMismatch {
                confirmed,
                computed,
            }) => AppError::AmountMismatch {
                confirmed,
                computed,
            },
            RepoError::Domain(DomainError::ValidationError(msg)) => AppError::BadRequest(msg),
            RepoError::Domain(e) => AppError::BadRequest(e.to_string()),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::AmountMismatch {
                confirmed,
                computed,
            } => AppError::AmountMismatch {
                confirmed,
                computed,
            },
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected { .. } => AppError::ProviderRejected,
            ProviderError::Auth(_) | ProviderError::Network(_) | ProviderError::Malformed(_) => {
                AppError::ProviderUnavailable
            }
        }
    }
}
