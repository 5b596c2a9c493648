//! VivaWallet configuration.
//!
//! All credentials and endpoint URLs are injected, never hard-coded. The
//! demo endpoints are only defaults for the optional URL variables.

use std::env;
use std::time::Duration;

use streetpay_types::ProviderError;

const DEFAULT_ACCOUNTS_URL: &str = "https://demo-accounts.vivapayments.com";
const DEFAULT_API_URL: &str = "https://demo-api.vivapayments.com";
const DEFAULT_CHECKOUT_URL: &str = "https://demo.vivapayments.com";

/// VivaWallet API configuration.
#[derive(Clone)]
pub struct VivaConfig {
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Payment source code identifying the merchant store
    pub source_code: String,
    /// Base URL of the accounts (token) server
    pub accounts_url: String,
    /// Base URL of the checkout API server
    pub api_url: String,
    /// Base URL of the hosted checkout page
    pub checkout_url: String,
    /// Timeout applied to every PSP request
    pub request_timeout: Duration,
}

impl VivaConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `VIVA_CLIENT_ID`
    /// - `VIVA_CLIENT_SECRET`
    /// - `VIVA_SOURCE_CODE`
    ///
    /// Optional (default to the demo environment):
    /// - `VIVA_ACCOUNTS_URL`, `VIVA_API_URL`, `VIVA_CHECKOUT_URL`
    pub fn from_env() -> Result<Self, ProviderError> {
        dotenvy::dotenv().ok();

        let client_id = env::var("VIVA_CLIENT_ID")
            .map_err(|_| ProviderError::Auth("VIVA_CLIENT_ID not set".to_string()))?;
        let client_secret = env::var("VIVA_CLIENT_SECRET")
            .map_err(|_| ProviderError::Auth("VIVA_CLIENT_SECRET not set".to_string()))?;
        let source_code = env::var("VIVA_SOURCE_CODE")
            .map_err(|_| ProviderError::Auth("VIVA_SOURCE_CODE not set".to_string()))?;

        Ok(Self {
            client_id,
            client_secret,
            source_code,
            accounts_url: url_var("VIVA_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL),
            api_url: url_var("VIVA_API_URL", DEFAULT_API_URL),
            checkout_url: url_var("VIVA_CHECKOUT_URL", DEFAULT_CHECKOUT_URL),
            request_timeout: Duration::from_secs(10),
        })
    }

    /// Create config with explicit values (for testing).
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        source_code: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            source_code: source_code.into(),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            checkout_url: DEFAULT_CHECKOUT_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Builder: set custom accounts base URL (for testing).
    pub fn with_accounts_url(mut self, url: impl Into<String>) -> Self {
        self.accounts_url = trimmed(url.into());
        self
    }

    /// Builder: set custom API base URL (for testing).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = trimmed(url.into());
        self
    }

    /// Builder: set custom checkout base URL (for testing).
    pub fn with_checkout_url(mut self, url: impl Into<String>) -> Self {
        self.checkout_url = trimmed(url.into());
        self
    }
}

fn url_var(name: &str, default: &str) -> String {
    env::var(name).map(trimmed).unwrap_or_else(|_| default.to_string())
}

fn trimmed(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

// The client secret must never reach logs.
impl std::fmt::Debug for VivaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VivaConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("source_code", &self.source_code)
            .field("accounts_url", &self.accounts_url)
            .field("api_url", &self.api_url)
            .field("checkout_url", &self.checkout_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let config = VivaConfig::new("client", "very-secret", "6343");
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let config = VivaConfig::new("c", "s", "6343").with_api_url("http://localhost:9999/");
        assert_eq!(config.api_url, "http://localhost:9999");
    }
}
