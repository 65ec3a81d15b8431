use axum::{routing::get, Json, Router};
use quake_db::{create_pool, DbRuntimeSettings};
use quake_feed::{FeedClient, FeedSettings};
use quake_server::config::AlertingConfig;
use quake_server::ingestion::{poll_feed_once, PollSummary};
use quake_server::AppState;
use quake_types::time::{format_timestamp, local_now};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;

fn feed_report(id: i64, minutes_ago: i64, areas: Value) -> Value {
    json!({
        "EarthquakeNo": id,
        "EarthquakeInfo": {
            "OriginTime": format_timestamp(local_now() - chrono::Duration::minutes(minutes_ago)),
            "FocalDepth": 20.0,
            "Epicenter": {
                "Location": "花蓮縣政府東方 30.0 公里",
                "EpicenterLatitude": 23.97,
                "EpicenterLongitude": 121.9
            },
            "EarthquakeMagnitude": { "MagnitudeValue": 4.7 }
        },
        "Intensity": { "ShakingArea": areas }
    })
}

async fn serve_feed(body: Value) -> std::net::SocketAddr {
    let app = Router::new().route(
        "/E-A0015-001",
        get(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn poll_ingests_new_reports_once() {
    let temp_file = tempfile::NamedTempFile::new().unwrap();
    let pool = create_pool(temp_file.path().to_str().unwrap(), DbRuntimeSettings::default()).unwrap();
    {
        let conn = pool.get().unwrap();
        quake_db::run_migrations(&conn).unwrap();
    }
    let state = AppState::new(pool.clone(), AlertingConfig::default());

    // Served newest first, like the real feed.
    let addr = serve_feed(json!({
        "records": {
            "Earthquake": [
                feed_report(114099, 2, json!([
                    { "CountyName": "臺北市", "AreaIntensity": "1級" }
                ])),
                feed_report(114098, 10, json!([
                    { "CountyName": "臺北市", "AreaIntensity": "3級" },
                    { "CountyName": "臺南市", "AreaIntensity": "2級" }
                ])),
                feed_report(114001, 600, json!([]))
            ]
        }
    }))
    .await;

    let client = FeedClient::new(FeedSettings {
        url: format!("http://{addr}/E-A0015-001"),
        api_key: "test-key".into(),
        limit: 100,
        request_timeout: Duration::from_secs(5),
    })
    .unwrap();

    let first = poll_feed_once(&state, &client).await.unwrap();
    assert_eq!(
        first,
        PollSummary {
            created: 2,
            already_ingested: 0,
            too_early: 1,
            failed: 0,
        }
    );

    let second = poll_feed_once(&state, &client).await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.already_ingested, 2);

    let conn = pool.get().unwrap();
    let events: i64 = conn
        .query_row("SELECT COUNT(*) FROM event", [], |row| row.get(0))
        .unwrap();
    assert_eq!(events, 8, "every monitored region gets an event per earthquake");

    // The window is anchored on 114099's origin, two minutes ago, and the
    // 114098 alert was only raised during this poll.
    let (triggered, process_time): (bool, Option<i64>) = conn
        .query_row(
            "SELECT triggered, process_time FROM event WHERE id = '114099-tp'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert!(triggered);
    assert_eq!(process_time, None);

    let gauges = state.gauges.snapshot().expect("gauges should be populated");
    assert_eq!(gauges.earthquake_id, 114099);
}
