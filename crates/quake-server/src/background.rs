//! Background task that auto-closes stale events.

use quake_alert::sweep;
use quake_db::DbPool;
use quake_types::time::local_now;
use std::time::Duration;
use tokio::time::sleep;

/// Runs one sweep on a pooled connection. Returns the closed event ids.
pub async fn run_sweep(pool: &DbPool, timeout_minutes: u32) -> Result<Vec<String>, String> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = quake_db::checkout(&pool).map_err(|e| e.to_string())?;
        sweep(&mut conn, local_now(), timeout_minutes).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("sweep task join error: {e}"))?
}

/// Starts the auto-close sweeper.
///
/// This task runs indefinitely, closing events that have waited longer than
/// `timeout_minutes` at any stage.
pub async fn start_sweep_task(pool: DbPool, interval_seconds: u64, timeout_minutes: u32) {
    if interval_seconds == 0 {
        tracing::warn!("sweep task disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(interval_seconds);
    tracing::info!(interval_seconds, timeout_minutes, "starting event sweep task");

    loop {
        sleep(interval).await;

        match run_sweep(&pool, timeout_minutes).await {
            Ok(closed) => {
                if closed.is_empty() {
                    tracing::debug!("no stale events to close");
                } else {
                    tracing::info!(count = closed.len(), events = ?closed, "closed stale events");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to sweep stale events");
            }
        }
    }
}
