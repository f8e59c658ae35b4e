//! Raw Readings from Data Sources

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single raw value as supplied by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    /// Numeric reading
    Number(f64),
    /// Textual reading, parsed on demand
    Text(String),
    /// Anything else a source may hand us (null, bool, nested objects)
    Other(serde_json::Value),
}

impl Reading {
    /// Coerce to a finite number.
    ///
    /// Strings are trimmed and parsed as `f64`. NaN and infinities count as
    /// unusable, same as unparseable text.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Reading::Number(v) => *v,
            Reading::Text(s) => s.trim().parse::<f64>().ok()?,
            Reading::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading::Number(value)
    }
}

impl From<i32> for Reading {
    fn from(value: i32) -> Self {
        Reading::Number(f64::from(value))
    }
}

impl From<&str> for Reading {
    fn from(value: &str) -> Self {
        Reading::Text(value.to_string())
    }
}

impl From<String> for Reading {
    fn from(value: String) -> Self {
        Reading::Text(value)
    }
}

/// Sparse readings produced by one data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingSet {
    /// Source identifier (e.g. "weather", "seismic", "simulation")
    pub source: String,
    /// Raw values by feature name
    pub values: BTreeMap<String, Reading>,
}

impl ReadingSet {
    /// Create an empty reading set for a source
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Reading>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a reading
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Reading>) {
        self.values.insert(name.into(), value.into());
    }

    /// Build from a flat JSON object; non-object values yield an empty set
    pub fn from_json(source: impl Into<String>, value: &serde_json::Value) -> Self {
        let mut set = Self::new(source);
        if let Some(object) = value.as_object() {
            for (name, raw) in object {
                let reading = match raw {
                    serde_json::Value::Number(n) => match n.as_f64() {
                        Some(v) => Reading::Number(v),
                        None => Reading::Other(raw.clone()),
                    },
                    serde_json::Value::String(s) => Reading::Text(s.clone()),
                    other => Reading::Other(other.clone()),
                };
                set.values.insert(name.clone(), reading);
            }
        }
        set
    }

    /// Look up a raw reading
    pub fn get(&self, name: &str) -> Option<&Reading> {
        self.values.get(name)
    }

    /// Number of readings held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no readings are held
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Reading::from(12.5).as_number(), Some(12.5));
        assert_eq!(Reading::from(" 42 ").as_number(), Some(42.0));
        assert_eq!(Reading::from("heavy").as_number(), None);
        assert_eq!(Reading::Other(json!(null)).as_number(), None);
        assert_eq!(Reading::Other(json!(true)).as_number(), None);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(Reading::from(f64::NAN).as_number(), None);
        assert_eq!(Reading::from(f64::INFINITY).as_number(), None);
        assert_eq!(Reading::from("NaN").as_number(), None);
        assert_eq!(Reading::from("inf").as_number(), None);
    }

    #[test]
    fn test_from_json_object() {
        let set = ReadingSet::from_json(
            "weather",
            &json!({"rainfall": 12, "pressure": "1008.5", "note": null}),
        );
        assert_eq!(set.source, "weather");
        assert_eq!(set.len(), 3);
        assert_eq!(set.get("rainfall").and_then(Reading::as_number), Some(12.0));
        assert_eq!(set.get("pressure").and_then(Reading::as_number), Some(1008.5));
        assert_eq!(set.get("note").and_then(Reading::as_number), None);
    }

    #[test]
    fn test_from_json_non_object_is_empty() {
        let set = ReadingSet::from_json("seismic", &json!([1, 2, 3]));
        assert!(set.is_empty());
    }

    #[test]
    fn test_untagged_deserialize() {
        let set: ReadingSet = serde_json::from_value(json!({
            "source": "simulation",
            "values": {"windspeed": 120.0, "slope_angle": "35", "flag": false}
        }))
        .unwrap();
        assert_eq!(set.get("windspeed"), Some(&Reading::Number(120.0)));
        assert_eq!(set.get("slope_angle"), Some(&Reading::Text("35".into())));
        assert_eq!(set.get("flag"), Some(&Reading::Other(json!(false))));
    }
}
