//! Feature Schema and Default Table

use crate::features::FeatureVector;
use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// One schema entry: feature name plus its "no disaster" default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub default: f64,
}

impl FeatureSpec {
    pub fn new(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            default,
        }
    }
}

/// Ordered, validated feature schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Arc<[String]>,
    defaults: Vec<f64>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty, duplicate or non-finite entries
    pub fn new(specs: Vec<FeatureSpec>) -> Result<Self, SchemaError> {
        if specs.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::with_capacity(specs.len());
        for spec in &specs {
            if spec.name.trim().is_empty() {
                return Err(SchemaError::BlankName);
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateFeature(spec.name.clone()));
            }
            if !spec.default.is_finite() {
                return Err(SchemaError::NonFiniteDefault {
                    name: spec.name.clone(),
                    value: spec.default,
                });
            }
        }

        let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        let defaults = specs.iter().map(|s| s.default).collect();
        Ok(Self {
            names: names.into(),
            defaults,
        })
    }

    /// Built-in disaster schema
    pub fn disaster() -> Self {
        Self::new(Self::disaster_specs()).expect("built-in schema is valid")
    }

    /// Entries of the built-in disaster schema
    pub fn disaster_specs() -> Vec<FeatureSpec> {
        vec![
            FeatureSpec::new("temperature", 27.0),      // °C
            FeatureSpec::new("rainfall", 5.0),          // mm
            FeatureSpec::new("soil_moisture", 20.0),    // %
            FeatureSpec::new("windspeed", 5.0),         // km/h
            FeatureSpec::new("pressure", 1013.0),       // hPa
            FeatureSpec::new("river_level", 1.0),       // m
            FeatureSpec::new("slope_angle", 10.0),      // degrees
            FeatureSpec::new("magnitude", 0.0),         // Richter
            FeatureSpec::new("seismic_activity", 0.0),  // index
            FeatureSpec::new("peak_acceleration", 0.0), // g
        ]
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a validated schema
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Feature names in schema order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of a feature in the schema
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Whether the schema declares a feature
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Default value for a feature
    pub fn default_for(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.defaults[i])
    }

    /// Iterate `(name, default)` in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.defaults.iter().copied())
    }

    /// Schema entries, e.g. for re-serializing configuration
    pub fn specs(&self) -> Vec<FeatureSpec> {
        self.iter().map(|(n, d)| FeatureSpec::new(n, d)).collect()
    }

    /// The default table as a feature vector
    pub fn defaults(&self) -> FeatureVector {
        crate::normalize(&[], self)
    }

    pub(crate) fn shared_names(&self) -> Arc<[String]> {
        Arc::clone(&self.names)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::disaster()
    }
}
