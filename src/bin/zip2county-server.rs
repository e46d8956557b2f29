use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zip2county::{CountyResolver, ResolutionStats, ResolvedZip, ResolverConfig};

/// Server configuration
struct ServerConfig {
    port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        }
    }
}

/// Application state shared across all requests
#[derive(Clone)]
struct AppState {
    resolver: Arc<CountyResolver>,
    metrics: Arc<Metrics>,
}

/// Server metrics
struct Metrics {
    total_requests: AtomicU64,
    requests_in_flight: AtomicU64,
    zips_requested: AtomicU64,
    zips_unresolved: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            requests_in_flight: AtomicU64::new(0),
            zips_requested: AtomicU64::new(0),
            zips_unresolved: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    fn record(&self, stats: &ResolutionStats) {
        self.zips_requested
            .fetch_add(stats.requested as u64, Ordering::Relaxed);
        self.zips_unresolved
            .fetch_add(stats.unresolved as u64, Ordering::Relaxed);
    }
}

/// RAII guard for tracking in-flight requests
struct RequestGuard<'a>(&'a AtomicU64);

impl<'a> Drop for RequestGuard<'a> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zip2county=info,zip2county_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    let resolver = CountyResolver::new(ResolverConfig::from_env())
        .context("Failed to initialize county resolver")?;
    tracing::info!(
        "Primary source: {}, secondary source: {}",
        resolver.primary_source(),
        resolver.secondary_source()
    );

    // Warm the primary cache so the first request does not pay for the download
    if let Err(e) = resolver.primary_lookup().await {
        tracing::warn!("Primary dataset not loaded at startup: {:#}", e);
    }

    let app = build_app(Arc::new(resolver));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Build the Axum application with routes and middleware
fn build_app(resolver: Arc<CountyResolver>) -> Router {
    let state = AppState {
        resolver,
        metrics: Arc::new(Metrics::new()),
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/resolve", post(resolve_zips))
        .route("/api/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check endpoint; reports which datasets are configured
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        primary_source: state.resolver.primary_source().to_string(),
        secondary_source: state.resolver.secondary_source().to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    primary_source: String,
    secondary_source: String,
}

/// Resolve a batch of ZIP codes
async fn resolve_zips(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    state.metrics.total_requests.fetch_add(1, Ordering::Relaxed);
    state
        .metrics
        .requests_in_flight
        .fetch_add(1, Ordering::Relaxed);
    let _guard = RequestGuard(&state.metrics.requests_in_flight);

    if request.zips.is_empty() {
        return Err(ApiError::BadRequest("zips cannot be empty".to_string()));
    }

    tracing::info!("Resolving {} ZIP code(s)", request.zips.len());

    let resolution = state.resolver.resolve(&request.zips).await.map_err(|e| {
        tracing::error!("Resolution error: {:#}", e);
        ApiError::InternalError(format!("{:#}", e))
    })?;
    state.metrics.record(&resolution.stats);

    Ok(Json(ResolveResponse {
        success: true,
        data: resolution.rows,
        stats: resolution.stats,
    }))
}

#[derive(Deserialize)]
struct ResolveRequest {
    zips: Vec<String>,
}

#[derive(Serialize)]
struct ResolveResponse {
    success: bool,
    data: Vec<ResolvedZip>,
    stats: ResolutionStats,
}

/// Get server metrics
async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        total_requests: state.metrics.total_requests.load(Ordering::Relaxed),
        requests_in_flight: state.metrics.requests_in_flight.load(Ordering::Relaxed),
        zips_requested: state.metrics.zips_requested.load(Ordering::Relaxed),
        zips_unresolved: state.metrics.zips_unresolved.load(Ordering::Relaxed),
        uptime_seconds: state.metrics.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct MetricsResponse {
    total_requests: u64,
    requests_in_flight: u64,
    zips_requested: u64,
    zips_unresolved: u64,
    uptime_seconds: u64,
}

/// API error types
enum ApiError {
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
