//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use bookings_types::{BookingLedger, PaymentGateway};

use super::auth::{WEBHOOK_PATH, auth_middleware};
use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::BookingService;

/// HTTP Server for the Bookings API.
pub struct HttpServer<L: BookingLedger, G: PaymentGateway> {
    state: Arc<AppState<L, G>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<L: BookingLedger, G: PaymentGateway> HttpServer<L, G> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: BookingService<L, G>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::default()), // 100 req/min default
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(service: BookingService<L, G>, requests_per_minute: u32) -> Self {
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
            .route("/api/bootstrap", post(handlers::bootstrap::<L, G>))
            .route("/api/keys", post(handlers::create_api_key::<L, G>))
            .route("/api/keys", get(handlers::list_api_keys::<L, G>))
            .route("/api/keys/{id}", delete(handlers::delete_api_key::<L, G>))
            .route("/api/orders", post(handlers::create_order::<L, G>))
            .route(WEBHOOK_PATH, post(handlers::razorpay_webhook::<L, G>))
            .route("/api/bookings", get(handlers::list_bookings::<L, G>))
            .route("/api/bookings/{id}", get(handlers::get_booking::<L, G>))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<L, G>,
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
