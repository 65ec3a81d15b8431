//! Earthquake ingestion, simulation, and gauge handlers.
//!
//! Provides:
//! - `POST /earthquake/ingest` ingests a report carrying an agency id
//! - `POST /earthquake/simulate` ingests a demo report with an allocated id
//! - `GET /earthquake/simulation` lists demo earthquakes
//! - `GET /metrics/latest` returns the last ingested earthquake's gauges

use crate::api::{with_conn, ApiError};
use crate::AppState;
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quake_alert::{ingest, list_simulated, IngestOptions, IngestOutcome, QuakeGauges, SimulatedEarthquake};
use quake_types::time::local_now;
use quake_types::IngestRequest;
use serde::Deserialize;
use std::sync::Arc;

/// Attempts made when a simulated id collides with a concurrent writer.
const MAX_SIMULATION_ATTEMPTS: usize = 3;

/// Query parameters shared by the ingestion endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct IngestQuery {
    /// Suppression window override in minutes.
    pub suppress_minutes: Option<u32>,
}

fn outcome_response(outcome: IngestOutcome) -> Response {
    let status = match &outcome {
        IngestOutcome::Created(_) => StatusCode::CREATED,
        IngestOutcome::AlreadyIngested { .. } => StatusCode::OK,
        IngestOutcome::RejectedTooEarly { .. } => StatusCode::BAD_REQUEST,
    };
    (status, Json(outcome)).into_response()
}

async fn run_ingest(
    state: &AppState,
    request: IngestRequest,
    suppress_minutes: Option<u32>,
    attempts: usize,
) -> Result<IngestOutcome, ApiError> {
    let gauges = state.gauges.clone();
    let default_suppress_minutes = state.alerting.default_suppress_minutes;
    with_conn(state, move |conn| {
        let mut attempt = 1;
        loop {
            let options = IngestOptions {
                suppress_window_minutes: suppress_minutes,
                default_suppress_minutes,
                now: local_now(),
            };
            match ingest(conn, &request, &options, gauges.as_ref()) {
                Err(err) if err.is_retryable() && attempt < attempts => {
                    tracing::warn!(attempt, error = %err, "retrying ingestion");
                    attempt += 1;
                }
                result => return result,
            }
        }
    })
    .await
}

/// Handler for `POST /earthquake/ingest`.
pub async fn ingest_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<IngestQuery>,
    Json(request): Json<IngestRequest>,
) -> Result<Response, ApiError> {
    if request.earthquake.id.is_none() {
        return Err(ApiError::BadRequest(
            "earthquake id is required; use /earthquake/simulate for demo reports".to_string(),
        ));
    }
    let outcome = run_ingest(&state, request, params.suppress_minutes, 1).await?;
    Ok(outcome_response(outcome))
}

/// Handler for `POST /earthquake/simulate`.
///
/// The earthquake is always stored as a demo with an id from the simulated
/// range.
pub async fn simulate_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<IngestQuery>,
    Json(mut request): Json<IngestRequest>,
) -> Result<Response, ApiError> {
    if request.earthquake.id.is_some() {
        return Err(ApiError::BadRequest(
            "simulated earthquakes are assigned an id; omit earthquake_id".to_string(),
        ));
    }
    request.earthquake.is_demo = true;
    let outcome = run_ingest(
        &state,
        request,
        params.suppress_minutes,
        MAX_SIMULATION_ATTEMPTS,
    )
    .await?;
    Ok(outcome_response(outcome))
}

/// Handler for `GET /earthquake/simulation`.
pub async fn list_simulated_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<SimulatedEarthquake>>, ApiError> {
    let listed = with_conn(&state, |conn| list_simulated(conn)).await?;
    Ok(Json(listed))
}

/// Handler for `GET /metrics/latest`.
pub async fn latest_metrics_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<QuakeGauges>, ApiError> {
    state
        .gauges
        .snapshot()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no earthquake ingested yet".to_string()))
}
