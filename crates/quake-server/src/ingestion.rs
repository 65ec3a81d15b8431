//! Background task that polls the report feed and ingests new earthquakes.

use crate::AppState;
use quake_alert::{ingest, IngestOptions, IngestOutcome};
use quake_feed::{FeedClient, FeedEarthquake};
use quake_types::time::local_now;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Tally of one feed poll.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub created: usize,
    pub already_ingested: usize,
    pub too_early: usize,
    pub failed: usize,
}

/// Fetches the feed once and ingests every report, oldest first.
///
/// Individual ingestion failures are logged and counted; only a failed fetch
/// is returned as an error.
pub async fn poll_feed_once(
    state: &AppState,
    client: &FeedClient,
) -> Result<PollSummary, quake_feed::FeedError> {
    let mut reports = client.fetch_reports().await?;
    // Older reports first so suppression sees earlier alerts.
    reports.sort_by(|a, b| {
        a.earthquake_info
            .origin_time
            .cmp(&b.earthquake_info.origin_time)
            .then(a.earthquake_no.cmp(&b.earthquake_no))
    });

    let pool = state.pool.clone();
    let gauges = state.gauges.clone();
    let default_suppress_minutes = state.alerting.default_suppress_minutes;

    let summary = tokio::task::spawn_blocking(move || {
        let mut summary = PollSummary::default();
        let mut conn = match quake_db::checkout(&pool) {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "feed poll could not get a database connection");
                summary.failed = reports.len();
                return summary;
            }
        };

        for report in &reports {
            let request = report.to_ingest_request();
            let options = IngestOptions {
                suppress_window_minutes: None,
                default_suppress_minutes,
                now: local_now(),
            };
            match ingest(&mut conn, &request, &options, gauges.as_ref()) {
                Ok(IngestOutcome::Created(receipt)) => {
                    tracing::info!(
                        earthquake_id = receipt.earthquake_id,
                        alerts = receipt.events.iter().filter(|e| e.triggered).count(),
                        "ingested feed report"
                    );
                    summary.created += 1;
                }
                Ok(IngestOutcome::AlreadyIngested { .. }) => summary.already_ingested += 1,
                Ok(IngestOutcome::RejectedTooEarly { .. }) => summary.too_early += 1,
                Err(e) => {
                    log_failure(report, &e);
                    summary.failed += 1;
                }
            }
        }
        summary
    })
    .await
    .unwrap_or_else(|e| {
        tracing::error!(error = %e, "feed ingestion task panicked or was cancelled");
        PollSummary::default()
    });

    Ok(summary)
}

fn log_failure(report: &FeedEarthquake, err: &quake_alert::AlertError) {
    tracing::error!(
        earthquake_id = report.earthquake_no,
        retryable = err.is_retryable(),
        error = %err,
        "failed to ingest feed report"
    );
}

/// Starts the feed polling task.
///
/// This task runs indefinitely. A failed fetch is logged and retried on the
/// next tick.
pub async fn start_feed_task(state: Arc<AppState>, client: FeedClient, interval_seconds: u64) {
    if interval_seconds == 0 {
        tracing::warn!("feed task disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(interval_seconds);
    tracing::info!(interval_seconds, "starting earthquake feed task");

    loop {
        match poll_feed_once(&state, &client).await {
            Ok(summary) => {
                tracing::debug!(
                    created = summary.created,
                    already_ingested = summary.already_ingested,
                    too_early = summary.too_early,
                    failed = summary.failed,
                    "feed poll finished"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch earthquake feed");
            }
        }

        sleep(interval).await;
    }
}
