//! Inbound earthquake report shapes, shared by the HTTP layer, the feed
//! client, and the ingestion pipeline.

use serde::{Deserialize, Serialize};

use crate::Intensity;

/// Earthquake attributes as submitted for ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthquakeReport {
    /// Agency-assigned identifier. `None` on the simulation path, where an
    /// identifier is allocated from the reserved range.
    #[serde(default, alias = "earthquake_id")]
    pub id: Option<i64>,
    /// Origin time. Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
    /// or an RFC 3339 timestamp with offset.
    #[serde(alias = "earthquake_time")]
    pub time: String,
    /// Epicenter description.
    pub center: String,
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lon: f64,
    pub magnitude: f64,
    /// Focal depth in kilometres.
    pub depth: f64,
    #[serde(default, rename = "isDemo", alias = "is_demo")]
    pub is_demo: bool,
}

/// A single regional intensity reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingReport {
    /// Free-form location name, e.g. `"Taipei"` or `"臺北南港"`.
    #[serde(alias = "location")]
    pub region: String,
    pub intensity: Intensity,
}

/// A complete ingestion request: one earthquake plus its readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub earthquake: EarthquakeReport,
    #[serde(alias = "locations")]
    pub readings: Vec<ReadingReport>,
}
