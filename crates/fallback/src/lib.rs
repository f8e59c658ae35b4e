//! Rule-Based Fallback System
//!
//! Classifies a normalized feature vector with a fixed priority cascade of
//! threshold checks when ML inference is unavailable.

mod labels;
mod rules;
mod thresholds;

pub use labels::{Disaster, LabelSet};
pub use rules::{RuleCheck, RuleEngine};
pub use thresholds::{RuleThreshold, SafeBand, Thresholds};

use feature_engine::SchemaError;
use thiserror::Error;

/// Structurally invalid classifier configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid feature schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("{rule} references unknown feature: {feature}")]
    UnknownFeature { rule: String, feature: String },
    #[error("{rule} threshold is not finite: {value}")]
    NonFiniteThreshold { rule: String, value: f64 },
    #[error("Safe band for {feature} is inverted: [{min}, {max}]")]
    InvertedBand { feature: String, min: f64, max: f64 },
    #[error("Default {value} for {feature} lies outside its safe band [{min}, {max}]")]
    DefaultOutsideSafeBand {
        feature: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Safe band for {feature} admits {max}, above the {rule} threshold {threshold}")]
    BandMasksThreshold {
        feature: String,
        max: f64,
        rule: String,
        threshold: f64,
    },
    #[error("Safe band is empty")]
    EmptySafeBand,
    #[error("Unknown disaster label: {0}")]
    UnknownLabel(String),
    #[error("Label set must contain the no-disaster label")]
    MissingNoneLabel,
    #[error("Duplicate label in label set: {0}")]
    DuplicateLabel(String),
}
