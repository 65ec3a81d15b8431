//! Severity classification.

use quake_types::{Intensity, IntensityTier, Severity};

/// Magnitude at or above which every region is classified `L2`.
pub const FORCE_L2_MAGNITUDE: f64 = 5.0;

/// Numeric intensity at or above which a region is classified `L2`.
const L2_INTENSITY: f64 = 3.0;

/// Numeric intensity at or above which a region is classified `L1`.
const L1_INTENSITY: f64 = 1.0;

/// Maps a regional intensity and the earthquake magnitude to a severity tier.
///
/// Coded tiers `3級` and above map to `L2`, `1級`/`2級` to `L1`. Numeric
/// intensities use the same thresholds on the calibrated scale. Unrated
/// readings are `NA` unless the magnitude forces `L2`.
pub fn classify(intensity: &Intensity, magnitude: f64) -> Severity {
    if magnitude >= FORCE_L2_MAGNITUDE {
        return Severity::L2;
    }
    match intensity {
        Intensity::Coded(tier) if *tier >= IntensityTier::Three => Severity::L2,
        Intensity::Coded(tier) if *tier >= IntensityTier::One => Severity::L1,
        Intensity::Coded(_) => Severity::Na,
        Intensity::Scale(value) if *value >= L2_INTENSITY => Severity::L2,
        Intensity::Scale(value) if *value >= L1_INTENSITY => Severity::L1,
        Intensity::Scale(_) | Intensity::Unrated(_) => Severity::Na,
    }
}
