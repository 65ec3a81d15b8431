//! Alert decision and event lifecycle engine.
//!
//! Turns incoming earthquake reports into per-region events, decides which of
//! them raise an alert, and drives each event from creation to closure.
//!
//! # Event lifecycle
//!
//! | Status | Reached by | Leaves via |
//! |--------|------------|------------|
//! | `unacknowledged` | [`ingest`] (triggered) | [`acknowledge`], [`submit_report`], [`repair`], [`sweep`] |
//! | `acknowledged` | [`acknowledge`] | [`submit_report`], [`repair`], [`sweep`] |
//! | `in_process` | [`submit_report`] with damage | [`repair`], [`sweep`] |
//! | `closed` | no-damage report, [`repair`], [`sweep`], suppression | none |
//!
//! Events that do not trigger are closed at ingestion with
//! `process_time = -1`, the same sentinel the sweeper uses.
//!
//! # Usage
//!
//! ```rust,ignore
//! use quake_alert::{ingest, IngestOptions, NoopMetrics};
//! use quake_types::time::local_now;
//!
//! let outcome = ingest(&mut conn, &request, &IngestOptions::at(local_now()), &NoopMetrics)?;
//! ```
//!
//! Every mutating operation takes `&mut Connection` and runs in its own
//! immediate transaction via [`quake_db::with_transaction`].

mod allocator;
mod classify;
mod error;
mod ingest;
mod lifecycle;
mod metrics;
mod model;
mod query;
mod settings;
mod suppression;
mod sweep;

pub use allocator::allocate_simulated_id;
pub use classify::{classify, FORCE_L2_MAGNITUDE};
pub use error::AlertError;
pub use ingest::{
    ingest, EventDecision, IngestOptions, IngestOutcome, IngestReceipt, MAX_REPORT_AGE_MINUTES,
};
pub use lifecycle::{acknowledge, get_event, repair, submit_report};
pub use metrics::{LatestQuakeGauges, MetricsSink, NoopMetrics, QuakeGauges};
pub use model::{Earthquake, Event, RegionalReading, UNPROCESSED};
pub use query::{fetch_by_status, list_simulated, EventRow, SimulatedEarthquake, SimulatedReading};
pub use settings::{get_setting, set_setting, set_suppress_window_minutes, suppress_window_minutes};
pub use suppression::{is_suppressed_by, should_trigger};
pub use sweep::sweep;
