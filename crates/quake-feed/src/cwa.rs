//! Wire types for the agency's significant-earthquake report dataset
//! (`E-A0015-001`) and their conversion into ingestion requests.

use quake_types::{
    EarthquakeReport, IngestRequest, Intensity, IntensityTier, ReadingReport, Region,
};
use serde::Deserialize;

/// Top-level dataset response.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedResponse {
    pub records: FeedRecords,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedRecords {
    #[serde(rename = "Earthquake", default)]
    pub earthquakes: Vec<FeedEarthquake>,
}

/// One reported earthquake.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeedEarthquake {
    pub earthquake_no: i64,
    pub earthquake_info: EarthquakeInfo,
    #[serde(default)]
    pub intensity: IntensitySection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EarthquakeInfo {
    /// Local origin time, `YYYY-MM-DD HH:MM:SS`.
    pub origin_time: String,
    pub focal_depth: f64,
    pub epicenter: Epicenter,
    pub earthquake_magnitude: Magnitude,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Epicenter {
    pub location: String,
    pub epicenter_latitude: f64,
    pub epicenter_longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Magnitude {
    pub magnitude_value: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntensitySection {
    #[serde(rename = "ShakingArea", default)]
    pub shaking_areas: Vec<ShakingArea>,
}

/// Intensity observed in one county (or a `、`-separated group of them).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShakingArea {
    pub county_name: String,
    pub area_intensity: String,
}

impl ShakingArea {
    fn covers(&self, region: Region) -> bool {
        self.county_name
            .split(['、', ',', '，'])
            .map(|county| county.trim().replace('台', "臺"))
            .any(|county| county == region.county_name())
    }
}

impl FeedEarthquake {
    /// Builds an ingestion request with one reading per monitored region.
    ///
    /// Regions the report does not mention are filled in as `0級`, so every
    /// feed earthquake yields an event for each region. A region listed more
    /// than once takes its strongest intensity.
    pub fn to_ingest_request(&self) -> IngestRequest {
        let readings = Region::ALL
            .into_iter()
            .map(|region| ReadingReport {
                region: region.name().to_string(),
                intensity: self.strongest_in(region),
            })
            .collect();

        IngestRequest {
            earthquake: EarthquakeReport {
                id: Some(self.earthquake_no),
                time: self.earthquake_info.origin_time.clone(),
                center: self.earthquake_info.epicenter.location.clone(),
                lat: self.earthquake_info.epicenter.epicenter_latitude,
                lon: self.earthquake_info.epicenter.epicenter_longitude,
                magnitude: self.earthquake_info.earthquake_magnitude.magnitude_value,
                depth: self.earthquake_info.focal_depth,
                is_demo: false,
            },
            readings,
        }
    }

    fn strongest_in(&self, region: Region) -> Intensity {
        self.intensity
            .shaking_areas
            .iter()
            .filter(|area| area.covers(region))
            .map(|area| Intensity::parse_label(&area.area_intensity))
            .max_by(|a, b| {
                let (a, b) = (a.value().unwrap_or(0.0), b.value().unwrap_or(0.0));
                a.total_cmp(&b)
            })
            .unwrap_or(Intensity::Coded(IntensityTier::Zero))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "success": "true",
        "records": {
            "datasetDescription": "地震報告",
            "Earthquake": [
                {
                    "EarthquakeNo": 114097,
                    "ReportType": "地震報告",
                    "EarthquakeInfo": {
                        "OriginTime": "2025-05-01 12:00:00",
                        "Source": "中央氣象署",
                        "FocalDepth": 15.2,
                        "Epicenter": {
                            "Location": "花蓮縣政府南南東方 20.0 公里 (位於花蓮縣壽豐鄉)",
                            "EpicenterLatitude": 23.82,
                            "EpicenterLongitude": 121.62
                        },
                        "EarthquakeMagnitude": {
                            "MagnitudeType": "芮氏規模",
                            "MagnitudeValue": 4.5
                        }
                    },
                    "Intensity": {
                        "ShakingArea": [
                            { "AreaDesc": "最大震度4級地區", "CountyName": "花蓮縣", "AreaIntensity": "4級" },
                            { "AreaDesc": "最大震度3級地區", "CountyName": "臺北市", "AreaIntensity": "3級" },
                            { "AreaDesc": "最大震度2級地區", "CountyName": "新竹縣、臺中市", "AreaIntensity": "2級" },
                            { "AreaDesc": "最大震度1級地區", "CountyName": "台中市", "AreaIntensity": "1級" }
                        ]
                    }
                }
            ]
        }
    }"#;

    fn sample() -> FeedEarthquake {
        let response: FeedResponse = serde_json::from_str(SAMPLE).expect("sample should parse");
        assert_eq!(response.records.earthquakes.len(), 1);
        response.records.earthquakes.into_iter().next().unwrap()
    }

    fn reading_for<'a>(req: &'a IngestRequest, region: Region) -> &'a ReadingReport {
        req.readings
            .iter()
            .find(|r| r.region == region.name())
            .expect("every monitored region should have a reading")
    }

    #[test]
    fn converts_earthquake_attributes() {
        let req = sample().to_ingest_request();
        assert_eq!(req.earthquake.id, Some(114097));
        assert_eq!(req.earthquake.time, "2025-05-01 12:00:00");
        assert_eq!(req.earthquake.magnitude, 4.5);
        assert_eq!(req.earthquake.depth, 15.2);
        assert_eq!(req.earthquake.lat, 23.82);
        assert!(!req.earthquake.is_demo);
    }

    #[test]
    fn maps_counties_and_fills_missing_regions() {
        let req = sample().to_ingest_request();
        assert_eq!(req.readings.len(), Region::ALL.len());

        assert_eq!(
            reading_for(&req, Region::Taipei).intensity,
            Intensity::Coded(IntensityTier::Three)
        );
        assert_eq!(
            reading_for(&req, Region::Taichung).intensity,
            Intensity::Coded(IntensityTier::Two),
            "strongest of the grouped and single listings"
        );
        assert_eq!(
            reading_for(&req, Region::Hsinchu).intensity,
            Intensity::Coded(IntensityTier::Zero),
            "新竹縣 is not the monitored city"
        );
        assert_eq!(
            reading_for(&req, Region::Tainan).intensity,
            Intensity::Coded(IntensityTier::Zero)
        );
    }

    #[test]
    fn missing_intensity_section_fills_zero() {
        let json = r#"{
            "EarthquakeNo": 114100,
            "EarthquakeInfo": {
                "OriginTime": "2025-05-02 08:00:00",
                "FocalDepth": 30.0,
                "Epicenter": { "Location": "外海", "EpicenterLatitude": 22.0, "EpicenterLongitude": 122.0 },
                "EarthquakeMagnitude": { "MagnitudeValue": 3.9 }
            }
        }"#;
        let quake: FeedEarthquake = serde_json::from_str(json).unwrap();
        let req = quake.to_ingest_request();
        assert!(req
            .readings
            .iter()
            .all(|r| r.intensity == Intensity::Coded(IntensityTier::Zero)));
    }
}
