//! # Streetpay VivaWallet Adapter
//!
//! Outbound adapter implementing the `PaymentProvider` port against the
//! VivaWallet checkout API:
//! - `config` - injected credentials and endpoint URLs
//! - `auth` - OAuth2 client-credentials token cache with single-flight refresh
//! - `client` - order creation, transaction verification, order state lookup

pub mod auth;
pub mod client;
pub mod config;

pub use auth::AuthClient;
pub use client::VivaClient;
pub use config::VivaConfig;
