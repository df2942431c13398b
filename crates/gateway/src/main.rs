//! RefDisp API Gateway
//!
//! Serves reference dispersion over HTTP.
//! Handles:
//! - Single-DOI and batch dispersion requests
//! - Inbound rate limiting
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use refdisp_common::{
    config::AppConfig,
    metrics::{self, DISPERSION_BUCKETS, RESOLVER_BUCKETS},
    observability::init_tracing,
    resolver::create_resolver,
    WorkResolver,
};
use refdisp_dispersion::{build_runner, BatchRunner, DispersionCalculator};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::middleware::rate_limit::{create_rate_limiter, rate_limit_middleware, InboundLimiter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub calculator: Arc<DispersionCalculator>,
    pub runner: Arc<BatchRunner>,
    pub resolver_name: String,
}

impl AppState {
    pub fn new(config: AppConfig, resolver: Arc<dyn WorkResolver>) -> anyhow::Result<Self> {
        let resolver_name = resolver.name().to_string();
        let (calculator, runner) = build_runner(&config, resolver)?;
        Ok(Self {
            config: Arc::new(config),
            calculator,
            runner: Arc::new(runner),
            resolver_name,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize tracing
    init_tracing(&config.observability);

    info!("Starting RefDisp API Gateway v{}", refdisp_common::VERSION);

    // Initialize metrics
    install_metrics_exporter(config.observability.metrics_port)?;
    metrics::register_metrics();

    // Create app state
    let resolver = Arc::new(create_resolver(&config.openalex)?);
    let limiter = create_rate_limiter(config.server.requests_per_second, config.server.burst)?;
    let host: IpAddr = config.server.host.parse()?;
    let port = config.server.port;
    let state = AppState::new(config, resolver)?;

    // Build the router
    let app = create_router(state, limiter);

    // Start the server
    let addr = SocketAddr::new(host, port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the Prometheus exporter (port 0 disables it)
fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    if port == 0 {
        warn!("Metrics port is 0, Prometheus exporter disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Suffix("resolver_duration_seconds".to_string()),
            RESOLVER_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("dispersion_duration_seconds".to_string()),
            DISPERSION_BUCKETS,
        )?
        .install()?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState, limiter: InboundLimiter) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Rate-limited API routes
    let api_routes = Router::new()
        .route(
            "/dispersion",
            get(handlers::dispersion::get_dispersion).post(handlers::dispersion::batch_dispersion),
        )
        .route_layer(from_fn_with_state(limiter, rate_limit_middleware));

    // Compose the app
    Router::new()
        // Health endpoints (no rate limit)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
