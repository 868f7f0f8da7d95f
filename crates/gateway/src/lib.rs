//! Web dashboard for ContentCrew.
//!
//! Serves the embedded single-page dashboard and the run API it drives:
//! start a run, watch its log, approve each checkpoint.
//!
//! Built on Axum.

pub mod api;
pub mod frontend;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, header},
    response::Json,
    routing::get,
};
use chrono::{DateTime, Utc};
use contentcrew_config::{AppConfig, DashboardConfig};
use contentcrew_core::provider::Provider;
use contentcrew_pipeline::RunManager;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

/// Shared state for the dashboard.
pub struct DashboardState {
    pub runs: RunManager,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(runs: RunManager) -> Self {
        Self {
            runs,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<DashboardState>;

/// Build the router with the API, the frontend and the HTTP layers.
pub fn build_router(state: SharedState, dashboard: &DashboardConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/api", api::api_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors_layer(dashboard))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Only the dashboard's own origin may call the API from a browser.
fn cors_layer(dashboard: &DashboardConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    match HeaderValue::from_str(&format!("http://{}:{}", dashboard.host, dashboard.port)) {
        Ok(origin) => cors.allow_origin(AllowOrigin::exact(origin)),
        Err(_) => cors,
    }
}

/// Start the dashboard HTTP server.
pub async fn start(config: AppConfig, provider: Arc<dyn Provider>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.dashboard.host, config.dashboard.port);

    let runs = RunManager::from_config(&config, provider)?;
    let state = Arc::new(DashboardState::new(runs));
    let app = build_router(state, &config.dashboard);

    info!(addr = %addr, output_dir = %config.output_dir.display(), "Dashboard starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
    runs: usize,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        runs: state.runs.list().await.len(),
    })
}
