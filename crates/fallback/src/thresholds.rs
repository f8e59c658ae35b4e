//! Threshold Configuration

use serde::{Deserialize, Serialize};

/// A single cascade rule: fires when `feature` is strictly above `above`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleThreshold {
    pub feature: String,
    pub above: f64,
}

impl RuleThreshold {
    pub fn new(feature: impl Into<String>, above: f64) -> Self {
        Self {
            feature: feature.into(),
            above,
        }
    }
}

/// Inclusive non-hazardous range for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeBand {
    pub feature: String,
    pub min: f64,
    pub max: f64,
}

impl SafeBand {
    pub fn new(feature: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            feature: feature.into(),
            min,
            max,
        }
    }

    /// Whether a value lies within `[min, max]`; NaN never does
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Thresholds for the rule cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Rainfall level indicating a flood (mm)
    pub flood: RuleThreshold,
    /// Seismic magnitude indicating an earthquake
    pub earthquake: RuleThreshold,
    /// Slope angle indicating landslide risk (degrees)
    pub landslide: RuleThreshold,
    /// Wind speed indicating a cyclone (km/h)
    pub cyclone: RuleThreshold,
    /// Ranges checked before the cascade; all in band means no disaster
    pub safe_band: Vec<SafeBand>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            flood: RuleThreshold::new("rainfall", 100.0),
            earthquake: RuleThreshold::new("magnitude", 4.0),
            landslide: RuleThreshold::new("slope_angle", 30.0),
            cyclone: RuleThreshold::new("windspeed", 100.0),
            safe_band: vec![
                SafeBand::new("rainfall", 0.0, 10.0),
                SafeBand::new("windspeed", 0.0, 20.0),
                SafeBand::new("pressure", 1000.0, 1020.0),
                SafeBand::new("seismic_activity", 0.0, 1.0),
                SafeBand::new("magnitude", 0.0, 4.0),
                SafeBand::new("peak_acceleration", 0.0, 0.1),
                SafeBand::new("river_level", 0.0, 3.0),
                SafeBand::new("soil_moisture", 0.0, 40.0),
            ],
        }
    }
}

impl Thresholds {
    /// Cascade rules in priority order, paired with their rule name
    pub fn cascade(&self) -> [(&'static str, &RuleThreshold); 4] {
        [
            ("flood", &self.flood),
            ("earthquake", &self.earthquake),
            ("landslide", &self.landslide),
            ("cyclone", &self.cyclone),
        ]
    }

}
