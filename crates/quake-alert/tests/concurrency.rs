use std::collections::HashSet;
use std::thread;

use quake_alert::{acknowledge, ingest, repair, AlertError, IngestOptions, IngestOutcome, NoopMetrics};
use quake_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use quake_types::time::parse_stored;
use quake_types::{EarthquakeReport, IngestRequest, Intensity, ReadingReport};

fn file_pool(temp_file: &tempfile::NamedTempFile) -> DbPool {
    let db_path = temp_file.path().to_str().expect("temp path should be utf-8");
    let pool = create_pool(
        db_path,
        DbRuntimeSettings {
            busy_timeout_ms: 10_000,
            pool_max_size: 8,
            checkout_timeout_ms: 10_000,
        },
    )
    .expect("failed to create pool");
    let conn = pool.get().expect("failed to get connection");
    run_migrations(&conn).expect("failed to run migrations");
    pool
}

fn simulated_report() -> IngestRequest {
    IngestRequest {
        earthquake: EarthquakeReport {
            id: None,
            time: "2025-05-01 12:00:00".into(),
            center: "simulation".into(),
            lat: 24.1,
            lon: 120.7,
            magnitude: 4.2,
            depth: 8.0,
            is_demo: true,
        },
        readings: vec![ReadingReport {
            region: "Taichung".into(),
            intensity: Intensity::parse_label("2級"),
        }],
    }
}

#[test]
fn concurrent_simulations_receive_distinct_ids() {
    let temp_file = tempfile::NamedTempFile::new().expect("failed to create temp file");
    let pool = file_pool(&temp_file);
    let now = parse_stored("2025-05-01 12:00:00").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                let mut ids = Vec::new();
                for _ in 0..5 {
                    let mut conn = pool.get().expect("failed to get connection");
                    let outcome = ingest(
                        &mut conn,
                        &simulated_report(),
                        &IngestOptions::at(now),
                        &NoopMetrics,
                    )
                    .expect("simulated ingestion should succeed");
                    match outcome {
                        IngestOutcome::Created(receipt) => ids.push(receipt.earthquake_id),
                        other => panic!("unexpected outcome {other:?}"),
                    }
                }
                ids
            })
        })
        .collect();

    let mut all_ids = Vec::new();
    for handle in handles {
        all_ids.extend(handle.join().expect("worker thread panicked"));
    }

    let unique: HashSet<i64> = all_ids.iter().copied().collect();
    assert_eq!(unique.len(), 40, "every allocation must be distinct");
    assert_eq!(all_ids.iter().min(), Some(&100_000_001));
    assert_eq!(all_ids.iter().max(), Some(&100_000_040));

    let conn = pool.get().unwrap();
    let events: i64 = conn
        .query_row("SELECT COUNT(*) FROM event", [], |row| row.get(0))
        .unwrap();
    assert_eq!(events, 40);
}

#[test]
fn racing_repairs_close_exactly_once() {
    let temp_file = tempfile::NamedTempFile::new().expect("failed to create temp file");
    let pool = file_pool(&temp_file);
    let now = parse_stored("2025-05-01 12:00:00").unwrap();

    {
        let mut conn = pool.get().unwrap();
        ingest(&mut conn, &simulated_report(), &IngestOptions::at(now), &NoopMetrics).unwrap();
        acknowledge(&mut conn, "100000001-tc", now).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || {
                let mut conn = pool.get().expect("failed to get connection");
                repair(&mut conn, "100000001-tc", now)
            })
        })
        .collect();

    let results: Vec<Result<_, AlertError>> = handles
        .into_iter()
        .map(|h| h.join().expect("worker thread panicked"))
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(AlertError::InvalidTransition { .. })))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(rejected, 3);
}
