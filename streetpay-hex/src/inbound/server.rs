//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use streetpay_types::{PaymentProvider, SettlementRepository};

use super::auth::auth_middleware;
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::OrderService;
use crate::openapi::ApiDoc;

/// HTTP Server for the settlement API.
pub struct HttpServer<R: SettlementRepository, P: PaymentProvider> {
    state: Arc<AppState<R, P>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: SettlementRepository, P: PaymentProvider> HttpServer<R, P> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: OrderService<R, P>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::default()), // 100 req/min default
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(service: OrderService<R, P>, requests_per_minute: u32) -> Self {
        use std::time::Duration;
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::new(
                requests_per_minute,
                Duration::from_secs(60),
            )),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/bootstrap", post(handlers::bootstrap::<R, P>))
            .route("/api/keys", post(handlers::create_api_key::<R, P>))
            .route("/api/orders", post(handlers::create_order::<R, P>))
            .route("/api/orders/verify", post(handlers::verify_order::<R, P>))
            .route(
                "/api/vivawallet/transaction_order",
                post(handlers::create_transaction_order::<R, P>),
            )
            .route(
                "/api/vivawallet/transaction_verification",
                post(handlers::verify_transaction::<R, P>),
            )
            .route("/api/accounts", post(handlers::create_account::<R, P>))
            .route("/api/accounts", get(handlers::list_accounts::<R, P>))
            .route("/api/accounts/{id}", get(handlers::get_account::<R, P>))
            .route(
                "/api/accounts/{id}/balance",
                get(handlers::account_balance::<R, P>),
            )
            .route("/api/items", post(handlers::create_item::<R, P>))
            .route("/api/items", get(handlers::list_items::<R, P>))
            .route("/api/payments", post(handlers::create_payments::<R, P>))
            .route("/api/payments", get(handlers::list_payments::<R, P>))
            .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<R, P>,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
