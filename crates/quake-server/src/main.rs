//! Quake alert server binary.
//!
//! Starts an axum HTTP server with structured logging, database
//! initialization, the auto-close sweeper, the optional report feed poller,
//! and graceful shutdown on SIGTERM/SIGINT.

use quake_server::{app, background, config, ingestion, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("QUAKE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration; the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Initialize database
    let pool = quake_db::create_pool(
        &config.database.path,
        quake_db::DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
            checkout_timeout_ms: config.database.checkout_timeout_ms,
        },
    )
    .expect("failed to create database pool; check database.path in config");

    {
        let conn = quake_db::checkout(&pool)
            .expect("failed to get database connection for migrations");
        let applied = quake_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    let state = AppState::new(pool.clone(), config.alerting.clone());

    // Background tasks
    tokio::spawn(background::start_sweep_task(
        pool.clone(),
        config.alerting.sweep_interval_seconds,
        config.alerting.sweep_timeout_minutes,
    ));

    if config.feed.enabled {
        match quake_feed::FeedClient::new(config.feed.client_settings()) {
            Ok(client) => {
                tokio::spawn(ingestion::start_feed_task(
                    Arc::new(state.clone()),
                    client,
                    config.feed.poll_interval_seconds,
                ));
            }
            Err(e) => {
                tracing::error!(error = %e, "feed enabled but client could not be created; polling disabled");
            }
        }
    } else {
        tracing::info!("earthquake feed polling disabled");
    }

    // Build application
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting quake alert server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("quake alert server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
