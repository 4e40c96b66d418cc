//! HTTP Server configuration and startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use relay_types::{FulfillmentHook, PaymentGateway};

use super::handlers::{self, AppState};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::RelayService;
use crate::openapi::ApiDoc;

/// HTTP Server for the payment relay.
pub struct HttpServer<G: PaymentGateway, F: FulfillmentHook> {
    state: Arc<AppState<G, F>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<G: PaymentGateway, F: FulfillmentHook> HttpServer<G, F> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: RelayService<G, F>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::default()), // 60 req/min default
        }
    }

    /// Creates a new HTTP server with custom rate limiting on creation routes.
    pub fn with_rate_limit(service: RelayService<G, F>, requests_per_minute: u32) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(RateLimiterState::new(requests_per_minute)),
        }
    }

    /// Creates a new HTTP server with a fully configured creation limiter.
    pub fn with_rate_limiter(service: RelayService<G, F>, rate_limiter: RateLimiterState) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        // Only creation calls the gateway on the caller's behalf; the webhook
        // must never be throttled.
        let creation = Router::new()
            .route("/create-payment", post(handlers::create_payment::<G, F>))
            .route("/api/payments/pix", post(handlers::create_pix_payment::<G, F>))
            .route_layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ));

        Router::new()
            .route("/", get(handlers::health))
            .route("/health", get(handlers::health))
            .route(
                "/webhook/mercadopago",
                post(handlers::mercadopago_webhook::<G, F>),
            )
            .route("/payment-status/{id}", get(handlers::payment_status::<G, F>))
            .route("/api/payments/{id}", get(handlers::payment_status::<G, F>))
            .merge(creation)
            .with_state(self.state.clone())
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(metrics)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Payment relay listening on {}", listener.local_addr()?);

        // Peer addresses key the rate limiter when forwarded headers are not trusted
        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
