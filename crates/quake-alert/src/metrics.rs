//! Metrics sink injected into the ingestion pipeline.
//!
//! The pipeline reports each committed earthquake to a [`MetricsSink`]. The
//! sink is passed in explicitly; there is no process-wide gauge state.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::NaiveDateTime;
use quake_types::Region;
use serde::Serialize;

use crate::model::{Earthquake, RegionalReading};

/// Receives notifications about committed ingestions.
pub trait MetricsSink: Send + Sync {
    /// Called once per earthquake after its transaction has committed.
    fn earthquake_ingested(&self, earthquake: &Earthquake, readings: &[RegionalReading]);
}

/// A sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn earthquake_ingested(&self, _earthquake: &Earthquake, _readings: &[RegionalReading]) {}
}

/// Gauge values describing the most recent earthquake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuakeGauges {
    pub earthquake_id: i64,
    pub origin_time: NaiveDateTime,
    pub magnitude: f64,
    pub depth: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// Numeric intensity per monitored region; regions without a reading
    /// report `0.0`.
    pub intensity: BTreeMap<String, f64>,
}

/// Keeps gauges for the earthquake with the latest origin time seen so far.
#[derive(Debug, Default)]
pub struct LatestQuakeGauges {
    latest: RwLock<Option<QuakeGauges>>,
}

impl LatestQuakeGauges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current gauges, if any earthquake was recorded.
    pub fn snapshot(&self) -> Option<QuakeGauges> {
        match self.latest.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MetricsSink for LatestQuakeGauges {
    fn earthquake_ingested(&self, earthquake: &Earthquake, readings: &[RegionalReading]) {
        let mut intensity: BTreeMap<String, f64> = Region::ALL
            .iter()
            .map(|region| (region.name().to_string(), 0.0))
            .collect();
        for reading in readings {
            if let (Some(region), Some(value)) = (reading.region(), reading.intensity.value()) {
                let slot = intensity.entry(region.name().to_string()).or_insert(0.0);
                *slot = slot.max(value);
            }
        }

        let gauges = QuakeGauges {
            earthquake_id: earthquake.id,
            origin_time: earthquake.origin_time,
            magnitude: earthquake.magnitude,
            depth: earthquake.depth,
            latitude: earthquake.latitude,
            longitude: earthquake.longitude,
            intensity,
        };

        let mut guard = match self.latest.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let is_newer = guard
            .as_ref()
            .map_or(true, |current| gauges.origin_time >= current.origin_time);
        if is_newer {
            *guard = Some(gauges);
        }
    }
}
