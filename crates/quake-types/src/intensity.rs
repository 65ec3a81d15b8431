//! Regional shaking intensity.
//!
//! Readings arrive either as a coded tier on the agency scale (`"3級"`,
//! `"5弱"`, ...) or as a calibrated number (`3.0`, `5.5`). Both are unified
//! behind [`Intensity`], converted once at the ingestion boundary.

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// A coded tier on the ten-step agency intensity scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntensityTier {
    Zero,
    One,
    Two,
    Three,
    Four,
    FiveLower,
    FiveUpper,
    SixLower,
    SixUpper,
    Seven,
}

impl IntensityTier {
    pub const ALL: [IntensityTier; 10] = [
        Self::Zero,
        Self::One,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::FiveLower,
        Self::FiveUpper,
        Self::SixLower,
        Self::SixUpper,
        Self::Seven,
    ];

    /// Returns the label used by the agency feed.
    pub fn label(self) -> &'static str {
        match self {
            Self::Zero => "0級",
            Self::One => "1級",
            Self::Two => "2級",
            Self::Three => "3級",
            Self::Four => "4級",
            Self::FiveLower => "5弱",
            Self::FiveUpper => "5強",
            Self::SixLower => "6弱",
            Self::SixUpper => "6強",
            Self::Seven => "7級",
        }
    }

    /// Returns the numeric equivalent on the calibrated 0–7 scale.
    pub fn value(self) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::One => 1.0,
            Self::Two => 2.0,
            Self::Three => 3.0,
            Self::Four => 4.0,
            Self::FiveLower => 5.0,
            Self::FiveUpper => 5.5,
            Self::SixLower => 6.0,
            Self::SixUpper => 6.5,
            Self::Seven => 7.0,
        }
    }

    /// Looks up a tier by its agency label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.label() == label)
    }
}

/// A regional intensity reading in either representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawIntensity", into = "RawIntensity")]
pub enum Intensity {
    /// A coded tier such as `3級`.
    Coded(IntensityTier),
    /// A calibrated numeric intensity.
    Scale(f64),
    /// A label that is neither a known tier nor a number (e.g. `"NA"`).
    /// Classified as below every alerting threshold.
    Unrated(String),
}

impl Intensity {
    /// Interprets a textual reading: known tier labels first, then numbers.
    pub fn parse_label(label: &str) -> Self {
        let trimmed = label.trim();
        if let Some(tier) = IntensityTier::from_label(trimmed) {
            return Self::Coded(tier);
        }
        match trimmed.parse::<f64>() {
            Ok(value) => Self::Scale(value),
            Err(_) => Self::Unrated(trimmed.to_string()),
        }
    }

    /// Returns the label persisted in the `intensity` column.
    pub fn label(&self) -> String {
        match self {
            Self::Coded(tier) => tier.label().to_string(),
            Self::Scale(value) => format!("{value}"),
            Self::Unrated(label) => label.clone(),
        }
    }

    /// Returns the numeric equivalent, if the reading has one.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Coded(tier) => Some(tier.value()),
            Self::Scale(value) => Some(*value),
            Self::Unrated(_) => None,
        }
    }

    /// Rejects numeric readings that are negative or not finite.
    pub fn validate(&self) -> Result<(), ParseError> {
        match self {
            Self::Scale(value) if !value.is_finite() || *value < 0.0 => {
                Err(ParseError::Intensity(value.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Intensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Wire form of an intensity: a JSON number or a JSON string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawIntensity {
    Number(f64),
    Text(String),
}

impl From<RawIntensity> for Intensity {
    fn from(raw: RawIntensity) -> Self {
        match raw {
            RawIntensity::Number(value) => Self::Scale(value),
            RawIntensity::Text(text) => Self::parse_label(&text),
        }
    }
}

impl From<Intensity> for RawIntensity {
    fn from(intensity: Intensity) -> Self {
        match intensity {
            Intensity::Scale(value) => Self::Number(value),
            other => Self::Text(other.label()),
        }
    }
}
