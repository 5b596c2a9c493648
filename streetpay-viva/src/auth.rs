//! OAuth2 client-credentials authentication against the VivaWallet
//! accounts server.
//!
//! Tokens are cached in memory and refreshed lazily. The cache lock is held
//! across the credential exchange, so concurrent callers that miss the cache
//! trigger exactly one token request (single-flight); the rest wait and
//! receive the freshly cached token.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, instrument};

use streetpay_types::ProviderError;

use crate::config::VivaConfig;

/// Tokens are treated as expired this long before the server-reported
/// expiry, so a token returned from the cache survives the request it
/// authorizes.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Token-caching client for the VivaWallet accounts server.
pub struct AuthClient {
    config: VivaConfig,
    http: reqwest::Client,
    cached: tokio::sync::Mutex<Option<CachedToken>>,
}

impl AuthClient {
    /// Creates an auth client sharing the given HTTP client.
    pub fn new(config: VivaConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            cached: tokio::sync::Mutex::new(None),
        }
    }

    /// Returns a valid access token, exchanging credentials if the cached
    /// one is missing or about to expire.
    ///
    /// Fails with `ProviderError::Auth` on any exchange failure; there is
    /// no automatic retry.
    #[instrument(skip(self))]
    pub async fn token(&self) -> Result<String, ProviderError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_valid() {
                return Ok(token.token.clone());
            }
        }

        debug!("No valid cached token, exchanging credentials");
        let fresh = self.exchange().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Drops the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn exchange(&self) -> Result<CachedToken, ProviderError> {
        let url = format!("{}/connect/token", self.config.accounts_url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ProviderError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth(format!("HTTP {status}: {body}")));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Auth(format!("Malformed token response: {e}")))?;

        let lifetime = Duration::from_secs(body.expires_in.saturating_sub(EXPIRY_MARGIN.as_secs()));
        Ok(CachedToken {
            token: body.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}
