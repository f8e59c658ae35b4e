//! Disaster Labels

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Disaster category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Disaster {
    Flood,
    Earthquake,
    Landslide,
    Cyclone,
    /// No disaster predicted
    None,
}

impl Disaster {
    /// All categories, in default model class order
    pub const ALL: [Disaster; 5] = [
        Disaster::Flood,
        Disaster::Earthquake,
        Disaster::Landslide,
        Disaster::Cyclone,
        Disaster::None,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Disaster::Flood => "Flood",
            Disaster::Earthquake => "Earthquake",
            Disaster::Landslide => "Landslide",
            Disaster::Cyclone => "Cyclone",
            Disaster::None => "None",
        }
    }

    /// Whether this verdict warrants an alert
    pub fn is_disaster(&self) -> bool {
        *self != Disaster::None
    }

    /// Get recommended action
    pub fn recommended_action(&self) -> &'static str {
        match self {
            Disaster::Flood => "Move to higher ground and avoid walking or driving through flood water",
            Disaster::Earthquake => "Drop, cover and hold on; stay clear of windows and unsecured structures",
            Disaster::Landslide => "Evacuate slopes and valleys below them; watch for tilting trees or cracks",
            Disaster::Cyclone => "Shelter indoors away from windows and secure loose outdoor objects",
            Disaster::None => "No action required",
        }
    }
}

impl fmt::Display for Disaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disaster {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "flood" => Ok(Disaster::Flood),
            "earthquake" => Ok(Disaster::Earthquake),
            "landslide" => Ok(Disaster::Landslide),
            "cyclone" => Ok(Disaster::Cyclone),
            "none" | "no disaster" => Ok(Disaster::None),
            _ => Err(ConfigError::UnknownLabel(s.to_string())),
        }
    }
}

/// Ordered mapping from model class index to disaster label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSet {
    labels: Vec<Disaster>,
}

impl LabelSet {
    /// Build a label set; it must contain `None` and no duplicates
    pub fn new(labels: Vec<Disaster>) -> Result<Self, ConfigError> {
        if !labels.contains(&Disaster::None) {
            return Err(ConfigError::MissingNoneLabel);
        }
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(ConfigError::DuplicateLabel(label.to_string()));
            }
        }
        Ok(Self { labels })
    }

    /// Label for a model class index
    pub fn get(&self, class_index: usize) -> Option<Disaster> {
        self.labels.get(class_index).copied()
    }

    /// Labels in class order
    pub fn labels(&self) -> &[Disaster] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            labels: Disaster::ALL.to_vec(),
        }
    }
}

impl TryFrom<Vec<String>> for LabelSet {
    type Error = ConfigError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        let labels = names
            .iter()
            .map(|n| n.parse())
            .collect::<Result<Vec<Disaster>, _>>()?;
        Self::new(labels)
    }
}

impl From<LabelSet> for Vec<String> {
    fn from(set: LabelSet) -> Self {
        set.labels.iter().map(|d| d.as_str().to_string()).collect()
    }
}
