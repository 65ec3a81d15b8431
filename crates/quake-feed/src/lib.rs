//! Client for the national seismic agency's significant-earthquake report
//! feed.
//!
//! [`FeedClient::fetch_reports`] pulls the latest reports and
//! [`FeedEarthquake::to_ingest_request`] turns each one into an
//! [`quake_types::IngestRequest`] covering every monitored region.

mod client;
mod cwa;

pub use client::{FeedClient, FeedError, FeedSettings};
pub use cwa::{
    EarthquakeInfo, Epicenter, FeedEarthquake, FeedRecords, FeedResponse, IntensitySection,
    Magnitude, ShakingArea,
};
