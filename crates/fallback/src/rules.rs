//! Rule Cascade

use crate::labels::Disaster;
use crate::thresholds::Thresholds;
use crate::ConfigError;
use feature_engine::{FeatureSchema, FeatureVector};
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of one rule check, for explanations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum RuleCheck {
    /// Feature outside its safe band
    OutOfBand {
        feature: String,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Cascade threshold exceeded
    Exceeded {
        disaster: Disaster,
        feature: String,
        value: f64,
        threshold: f64,
    },
}

/// Rule-based classifier
///
/// Evaluation is a priority cascade, first match wins:
/// safe band → Flood → Earthquake → Landslide → Cyclone → None.
/// Threshold comparisons are strict (`>`).
#[derive(Debug, Clone)]
pub struct RuleEngine {
    thresholds: Thresholds,
}

impl RuleEngine {
    /// Validate thresholds against a schema and build the engine
    pub fn new(thresholds: Thresholds, schema: &FeatureSchema) -> Result<Self, ConfigError> {
        for (rule, threshold) in thresholds.cascade() {
            if !schema.contains(&threshold.feature) {
                return Err(ConfigError::UnknownFeature {
                    rule: rule.to_string(),
                    feature: threshold.feature.clone(),
                });
            }
            if !threshold.above.is_finite() {
                return Err(ConfigError::NonFiniteThreshold {
                    rule: rule.to_string(),
                    value: threshold.above,
                });
            }
        }

        if thresholds.safe_band.is_empty() {
            return Err(ConfigError::EmptySafeBand);
        }

        for band in &thresholds.safe_band {
            let Some(default) = schema.default_for(&band.feature) else {
                return Err(ConfigError::UnknownFeature {
                    rule: "safe_band".to_string(),
                    feature: band.feature.clone(),
                });
            };
            if band.min.is_nan() || band.max.is_nan() || band.min > band.max {
                return Err(ConfigError::InvertedBand {
                    feature: band.feature.clone(),
                    min: band.min,
                    max: band.max,
                });
            }
            // A band reaching past a cascade threshold would hide that rule
            for (rule, threshold) in thresholds.cascade() {
                if threshold.feature == band.feature && band.max > threshold.above {
                    return Err(ConfigError::BandMasksThreshold {
                        feature: band.feature.clone(),
                        max: band.max,
                        rule: rule.to_string(),
                        threshold: threshold.above,
                    });
                }
            }
            if !band.contains(default) {
                return Err(ConfigError::DefaultOutsideSafeBand {
                    feature: band.feature.clone(),
                    value: default,
                    min: band.min,
                    max: band.max,
                });
            }
        }

        info!(
            "Rule engine ready: {} safe-band checks, flood>{} quake>{} slope>{} wind>{}",
            thresholds.safe_band.len(),
            thresholds.flood.above,
            thresholds.earthquake.above,
            thresholds.landslide.above,
            thresholds.cyclone.above
        );
        Ok(Self { thresholds })
    }

    /// Engine with default thresholds over the built-in schema
    pub fn with_defaults() -> Self {
        Self {
            thresholds: Thresholds::default(),
        }
    }

    /// Classify a normalized feature vector
    pub fn classify(&self, features: &FeatureVector) -> Disaster {
        if self.in_safe_band(features) {
            debug!("All safe-band features within range");
            return Disaster::None;
        }

        for (disaster, threshold) in self.cascade() {
            let value = value_of(features, &threshold.feature);
            if value > threshold.above {
                debug!(
                    "{} triggered: {}={} > {}",
                    disaster, threshold.feature, value, threshold.above
                );
                return disaster;
            }
        }

        Disaster::None
    }

    /// Whether every safe-band feature lies within its range
    pub fn in_safe_band(&self, features: &FeatureVector) -> bool {
        self.thresholds
            .safe_band
            .iter()
            .all(|band| band.contains(value_of(features, &band.feature)))
    }

    /// Every failed safe-band check and exceeded threshold, in evaluation order
    pub fn explain(&self, features: &FeatureVector) -> Vec<RuleCheck> {
        let mut checks = Vec::new();

        for band in &self.thresholds.safe_band {
            let value = value_of(features, &band.feature);
            if !band.contains(value) {
                checks.push(RuleCheck::OutOfBand {
                    feature: band.feature.clone(),
                    value,
                    min: band.min,
                    max: band.max,
                });
            }
        }

        for (disaster, threshold) in self.cascade() {
            let value = value_of(features, &threshold.feature);
            if value > threshold.above {
                checks.push(RuleCheck::Exceeded {
                    disaster,
                    feature: threshold.feature.clone(),
                    value,
                    threshold: threshold.above,
                });
            }
        }

        checks
    }

    /// Active thresholds
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn cascade(&self) -> [(Disaster, &crate::RuleThreshold); 4] {
        [
            (Disaster::Flood, &self.thresholds.flood),
            (Disaster::Earthquake, &self.thresholds.earthquake),
            (Disaster::Landslide, &self.thresholds.landslide),
            (Disaster::Cyclone, &self.thresholds.cyclone),
        ]
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Missing features read as NaN, which fails every comparison
fn value_of(features: &FeatureVector, name: &str) -> f64 {
    features.get(name).unwrap_or(f64::NAN)
}
