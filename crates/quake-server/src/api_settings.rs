//! Operator settings handlers.

use crate::api::{with_conn, ApiError};
use crate::AppState;
use axum::extract::{Extension, Json, Query};
use quake_alert::{set_suppress_window_minutes, suppress_window_minutes};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query parameters for `POST /settings/alert_suppress`.
#[derive(Debug, Deserialize)]
pub struct SuppressQuery {
    pub minutes: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuppressResponse {
    pub minutes: u32,
}

/// Handler for `GET /settings/alert_suppress`.
///
/// Returns the stored window, or the configured default when none is stored.
pub async fn get_alert_suppress_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<SuppressResponse>, ApiError> {
    let fallback = state.alerting.default_suppress_minutes;
    let minutes = with_conn(&state, move |conn| suppress_window_minutes(conn, fallback)).await?;
    Ok(Json(SuppressResponse { minutes }))
}

/// Handler for `POST /settings/alert_suppress?minutes=N`.
pub async fn set_alert_suppress_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<SuppressQuery>,
) -> Result<Json<SuppressResponse>, ApiError> {
    let minutes = params.minutes;
    with_conn(&state, move |conn| set_suppress_window_minutes(conn, minutes)).await?;
    Ok(Json(SuppressResponse { minutes }))
}
