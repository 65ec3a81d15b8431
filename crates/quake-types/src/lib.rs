//! Shared types, error definitions, and constants for the quake alerting
//! workspace.
//!
//! This crate provides the foundational vocabulary used across all crates:
//! severity tiers, the monitored-region table, the unified intensity value,
//! the event status filter, the inbound report shapes, and the timestamp
//! helpers for the fixed local time zone.
//!
//! No crate in the workspace depends on anything *except* `quake-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};

mod intensity;
mod report;
pub mod time;

pub use intensity::{Intensity, IntensityTier};
pub use report::{EarthquakeReport, IngestRequest, ReadingReport};

/// Earthquake identifiers at or above this value are reserved for
/// simulated (demo) submissions. Agency-assigned ids stay below it.
pub const SIMULATED_ID_FLOOR: i64 = 100_000_000;

/// Fallback alert suppression window when no setting is stored.
pub const DEFAULT_SUPPRESS_MINUTES: u32 = 30;

/// Settings key holding the alert suppression window in minutes.
pub const SUPPRESS_SETTING_KEY: &str = "alert_suppress_time";

/// Alert severity tier assigned to an event.
///
/// Tiers are ordered: `Na < L1 < L2`. The ordinal score drives the
/// suppression comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// No alert warranted.
    #[serde(rename = "NA")]
    Na,
    /// Low-urgency alert.
    L1,
    /// High-urgency alert.
    L2,
}

impl Severity {
    /// Returns the ordinal score used when comparing against prior alerts.
    pub fn score(self) -> u8 {
        match self {
            Self::Na => 0,
            Self::L1 => 1,
            Self::L2 => 2,
        }
    }

    /// Returns `true` for tiers that warrant raising an alert.
    pub fn is_alerting(self) -> bool {
        self != Self::Na
    }

    /// Returns the canonical string label stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Na => "NA",
            Self::L1 => "L1",
            Self::L2 => "L2",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NA" => Ok(Self::Na),
            "L1" => Ok(Self::L1),
            "L2" => Ok(Self::L2),
            _ => Err(ParseError::Severity(s.to_string())),
        }
    }
}

/// One of the fixed set of monitored regions.
///
/// Each region has a two-letter code used to derive event identifiers
/// (`{earthquake_id}-{code}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    Taipei,
    Hsinchu,
    Taichung,
    Tainan,
}

impl Region {
    /// All monitored regions, in display order.
    pub const ALL: [Region; 4] = [Self::Taipei, Self::Hsinchu, Self::Taichung, Self::Tainan];

    /// Returns the English region name, which is also the stored `region` column.
    pub fn name(self) -> &'static str {
        match self {
            Self::Taipei => "Taipei",
            Self::Hsinchu => "Hsinchu",
            Self::Taichung => "Taichung",
            Self::Tainan => "Tainan",
        }
    }

    /// Returns the two-letter region code.
    pub fn code(self) -> &'static str {
        match self {
            Self::Taipei => "tp",
            Self::Hsinchu => "hc",
            Self::Taichung => "tc",
            Self::Tainan => "tn",
        }
    }

    /// Returns the suffix appended to an earthquake id to form an event id.
    pub fn suffix(self) -> String {
        format!("-{}", self.code())
    }

    /// Builds the event identifier for this region and earthquake.
    pub fn event_id(self, earthquake_id: i64) -> String {
        format!("{earthquake_id}-{}", self.code())
    }

    /// Returns the county name used by the seismic agency feed.
    pub fn county_name(self) -> &'static str {
        match self {
            Self::Taipei => "臺北市",
            Self::Hsinchu => "新竹市",
            Self::Taichung => "臺中市",
            Self::Tainan => "臺南市",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Taipei => &["Taipei", "臺北", "台北"],
            Self::Hsinchu => &["Hsinchu", "新竹"],
            Self::Taichung => &["Taichung", "臺中", "台中"],
            Self::Tainan => &["Tainan", "臺南", "台南"],
        }
    }

    /// Maps a free-form reading location to a monitored region by substring
    /// containment, e.g. `"臺北南港"` and `"Taipei"` both map to `Taipei`.
    ///
    /// Returns `None` for locations outside the monitored set.
    pub fn match_location(location: &str) -> Option<Region> {
        Self::ALL
            .into_iter()
            .find(|region| region.keywords().iter().any(|kw| location.contains(kw)))
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Region {
    type Err = ParseError;

    /// Parses an exact region name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|region| region.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::Region(s.to_string()))
    }
}

/// Lifecycle status used to filter event listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Alert raised and not yet acknowledged.
    Unacknowledged,
    /// Acknowledged, awaiting a damage report.
    Acknowledged,
    /// Damage reported, awaiting repair.
    InProcess,
    /// Closed by a report, a repair, or the sweeper.
    Closed,
}

impl EventStatus {
    /// Returns the canonical string label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unacknowledged => "unacknowledged",
            Self::Acknowledged => "acknowledged",
            Self::InProcess => "in_process",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Region filter for event listings: a single region or all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionFilter {
    All,
    Only(Region),
}

impl std::str::FromStr for RegionFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

/// Error returned when parsing one of the domain enums from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown severity: {0}")]
    Severity(String),
    #[error("invalid location: {0}")]
    Region(String),
    #[error("invalid intensity: {0}")]
    Intensity(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_scores_are_ordered() {
        assert_eq!(Severity::Na.score(), 0);
        assert_eq!(Severity::L1.score(), 1);
        assert_eq!(Severity::L2.score(), 2);
        assert!(Severity::Na < Severity::L1 && Severity::L1 < Severity::L2);
    }

    #[test]
    fn severity_labels_parse_back() {
        for severity in [Severity::Na, Severity::L1, Severity::L2] {
            assert_eq!(severity.as_str().parse::<Severity>(), Ok(severity));
        }
        assert!("L3".parse::<Severity>().is_err());
    }

    #[test]
    fn severity_serializes_with_stored_labels() {
        let json = serde_json::to_string(&Severity::Na).unwrap();
        assert_eq!(json, "\"NA\"");
        let json = serde_json::to_string(&Severity::L2).unwrap();
        assert_eq!(json, "\"L2\"");
    }

    #[test]
    fn region_matches_by_substring() {
        assert_eq!(Region::match_location("Taipei"), Some(Region::Taipei));
        assert_eq!(Region::match_location("臺北南港"), Some(Region::Taipei));
        assert_eq!(Region::match_location("新竹寶山"), Some(Region::Hsinchu));
        assert_eq!(Region::match_location("台中大雅"), Some(Region::Taichung));
        assert_eq!(Region::match_location("臺南市"), Some(Region::Tainan));
        assert_eq!(Region::match_location("花蓮縣"), None);
    }

    #[test]
    fn region_event_ids() {
        assert_eq!(Region::Taipei.event_id(114097), "114097-tp");
        assert_eq!(Region::Tainan.suffix(), "-tn");
    }

    #[test]
    fn region_filter_parsing() {
        assert_eq!("all".parse::<RegionFilter>(), Ok(RegionFilter::All));
        assert_eq!("ALL".parse::<RegionFilter>(), Ok(RegionFilter::All));
        assert_eq!(
            "taichung".parse::<RegionFilter>(),
            Ok(RegionFilter::Only(Region::Taichung))
        );
        assert!("Kaohsiung".parse::<RegionFilter>().is_err());
    }
}
