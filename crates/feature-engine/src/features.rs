//! Feature Vector Assembly

use crate::reading::ReadingSet;
use crate::schema::FeatureSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use tracing::debug;

/// Why a feature was filled from the default table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillReason {
    /// No source supplied the feature
    Missing,
    /// At least one source supplied it, none as a usable number
    Malformed,
}

/// Where a feature value came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    Reading { source: String },
    Default { reason: FillReason },
}

impl Origin {
    pub fn is_default(&self) -> bool {
        matches!(self, Origin::Default { .. })
    }
}

/// Complete, schema-ordered feature vector
///
/// Serializes as a JSON object of `name -> value` in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Arc<[String]>,
    values: Vec<f64>,
    origins: Vec<Origin>,
}

impl FeatureVector {
    /// Value of a named feature
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Origin of a named feature
    pub fn origin(&self, name: &str) -> Option<&Origin> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.origins[i])
    }

    /// Raw values in schema order (model input layout)
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Feature names in schema order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Iterate `(name, value)` in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Names of features that were filled from defaults
    pub fn defaulted(&self) -> Vec<&str> {
        self.names
            .iter()
            .zip(&self.origins)
            .filter(|(_, o)| o.is_default())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Merge reading sets into a complete feature vector.
///
/// Reading sets are scanned in priority order; the first value that coerces
/// to a finite number wins. Features no source supplies usably take the
/// schema default. Readings outside the schema are dropped. Never fails.
pub fn normalize(readings: &[ReadingSet], schema: &FeatureSchema) -> FeatureVector {
    let mut values = Vec::with_capacity(schema.len());
    let mut origins = Vec::with_capacity(schema.len());

    for (name, default) in schema.iter() {
        let mut seen_malformed = false;
        let mut found = None;

        for set in readings {
            let Some(raw) = set.get(name) else {
                continue;
            };
            match raw.as_number() {
                Some(value) => {
                    found = Some((value, set.source.as_str()));
                    break;
                }
                None => {
                    debug!("Malformed reading {}={:?} from {}", name, raw, set.source);
                    seen_malformed = true;
                }
            }
        }

        match found {
            Some((value, source)) => {
                values.push(value);
                origins.push(Origin::Reading {
                    source: source.to_string(),
                });
            }
            None => {
                let reason = if seen_malformed {
                    FillReason::Malformed
                } else {
                    FillReason::Missing
                };
                values.push(default);
                origins.push(Origin::Default { reason });
            }
        }
    }

    for set in readings {
        for name in set.values.keys().filter(|n| !schema.contains(n.as_str())) {
            debug!("Dropping reading {} from {}: not in schema", name, set.source);
        }
    }

    FeatureVector {
        names: schema.shared_names(),
        values,
        origins,
    }
}
