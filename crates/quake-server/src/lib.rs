//! Quake alert server library logic.

pub mod api;
pub mod api_earthquake;
pub mod api_report;
pub mod api_settings;
pub mod background;
pub mod config;
pub mod ingestion;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use config::AlertingConfig;
use quake_alert::LatestQuakeGauges;
use quake_db::DbPool;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Alerting defaults.
    pub alerting: AlertingConfig,
    /// Gauges for the most recently ingested earthquake.
    pub gauges: Arc<LatestQuakeGauges>,
}

impl AppState {
    pub fn new(pool: DbPool, alerting: AlertingConfig) -> Self {
        Self {
            pool,
            alerting,
            gauges: Arc::new(LatestQuakeGauges::new()),
        }
    }
}

/// Maximum request body size (256 KiB).
const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/earthquake/ingest",
            post(api_earthquake::ingest_handler),
        )
        .route(
            "/earthquake/simulate",
            post(api_earthquake::simulate_handler),
        )
        .route(
            "/earthquake/simulation",
            get(api_earthquake::list_simulated_handler),
        )
        .route("/metrics/latest", get(api_earthquake::latest_metrics_handler))
        .route(
            "/report/unacknowledged",
            get(api_report::unacknowledged_handler),
        )
        .route("/report/pending", get(api_report::pending_handler))
        .route("/report/in_process", get(api_report::in_process_handler))
        .route("/report/closed", get(api_report::closed_handler))
        .route("/report/acknowledge", post(api_report::acknowledge_handler))
        .route("/report/submit", post(api_report::submit_handler))
        .route("/report/repair", post(api_report::repair_handler))
        .route(
            "/settings/alert_suppress",
            get(api_settings::get_alert_suppress_handler)
                .post(api_settings::set_alert_suppress_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
