//! Event report handlers.
//!
//! Listings take `?location=<Taipei|Hsinchu|Taichung|Tainan|all>`; an absent
//! location lists every region.

use crate::api::{with_conn, ApiError};
use crate::AppState;
use axum::extract::{Extension, Json, Query};
use quake_alert::{acknowledge, fetch_by_status, repair, submit_report, Event, EventRow};
use quake_types::time::local_now;
use quake_types::{EventStatus, RegionFilter};
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters for the listing endpoints.
#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub location: Option<String>,
}

/// Request body for acknowledge and repair.
#[derive(Debug, Deserialize)]
pub struct EventIdRequest {
    pub event_id: String,
}

/// Request body for `POST /report/submit`.
#[derive(Debug, Deserialize)]
pub struct SubmitReportRequest {
    pub event_id: String,
    pub damage: bool,
    pub operation_active: bool,
}

async fn list(
    state: &AppState,
    status: EventStatus,
    params: LocationQuery,
) -> Result<Json<Vec<EventRow>>, ApiError> {
    let filter = match params.location.as_deref() {
        None => RegionFilter::All,
        Some(raw) => raw
            .parse::<RegionFilter>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
    };
    let rows = with_conn(state, move |conn| fetch_by_status(conn, status, filter)).await?;
    Ok(Json(rows))
}

/// Handler for `GET /report/unacknowledged`.
pub async fn unacknowledged_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<Vec<EventRow>>, ApiError> {
    list(&state, EventStatus::Unacknowledged, params).await
}

/// Handler for `GET /report/pending` (acknowledged, awaiting a report).
pub async fn pending_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<Vec<EventRow>>, ApiError> {
    list(&state, EventStatus::Acknowledged, params).await
}

/// Handler for `GET /report/in_process`.
pub async fn in_process_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<Vec<EventRow>>, ApiError> {
    list(&state, EventStatus::InProcess, params).await
}

/// Handler for `GET /report/closed`.
pub async fn closed_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<LocationQuery>,
) -> Result<Json<Vec<EventRow>>, ApiError> {
    list(&state, EventStatus::Closed, params).await
}

/// Handler for `POST /report/acknowledge`.
pub async fn acknowledge_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<EventIdRequest>,
) -> Result<Json<Event>, ApiError> {
    let event = with_conn(&state, move |conn| {
        acknowledge(conn, &payload.event_id, local_now())
    })
    .await?;
    Ok(Json(event))
}

/// Handler for `POST /report/submit`.
pub async fn submit_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SubmitReportRequest>,
) -> Result<Json<Event>, ApiError> {
    let event = with_conn(&state, move |conn| {
        submit_report(
            conn,
            &payload.event_id,
            payload.damage,
            payload.operation_active,
            local_now(),
        )
    })
    .await?;
    Ok(Json(event))
}

/// Handler for `POST /report/repair`.
pub async fn repair_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<EventIdRequest>,
) -> Result<Json<Event>, ApiError> {
    let event = with_conn(&state, move |conn| repair(conn, &payload.event_id, local_now())).await?;
    Ok(Json(event))
}
