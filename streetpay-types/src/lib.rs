//! # Streetpay Types
//!
//! Domain types and port traits for the payment order orchestration and
//! settlement engine. This crate has ZERO external IO dependencies - only
//! data structures, business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Account, Item, PendingOrder, PaymentEntry)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain, repository, provider and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Account, AccountId, ApiKey, ApiKeyId, Currency, Item, ItemId, Money, OrderCode, OrderId,
    OrderLine, PaymentBatch, PaymentEntry, PaymentId, PaymentType, PendingOrder, SettleOutcome,
};
pub use dto::*;
pub use error::{AppError, DomainError, ProviderError, RepoError};
pub use ports::{
    CustomerInfo, PaymentProvider, ProviderOrder, SettlementRepository, TransactionCheck,
};
