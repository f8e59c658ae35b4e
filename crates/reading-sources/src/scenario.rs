//! Simulated Disaster Scenarios

use crate::source::ReadingSource;
use crate::SourceError;
use feature_engine::ReadingSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Predefined simulation scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Flood,
    Earthquake,
    Landslide,
    Cyclone,
    Safe,
}

impl Scenario {
    /// Scenarios in menu order ("1" to "5")
    pub const ALL: [Scenario; 5] = [
        Scenario::Flood,
        Scenario::Earthquake,
        Scenario::Landslide,
        Scenario::Cyclone,
        Scenario::Safe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Flood => "flood",
            Scenario::Earthquake => "earthquake",
            Scenario::Landslide => "landslide",
            Scenario::Cyclone => "cyclone",
            Scenario::Safe => "safe",
        }
    }

    /// Menu key for this scenario
    pub fn menu_key(&self) -> usize {
        match self {
            Scenario::Flood => 1,
            Scenario::Earthquake => 2,
            Scenario::Landslide => 3,
            Scenario::Cyclone => 4,
            Scenario::Safe => 5,
        }
    }

    /// Resolve a menu key or name; anything unrecognized selects `Safe`
    pub fn select(choice: &str) -> Self {
        choice.parse().unwrap_or(Scenario::Safe)
    }

    /// Readings for this scenario, in schema units
    pub fn readings(&self) -> ReadingSet {
        // temperature, magnitude, rainfall, soil_moisture, windspeed,
        // pressure, river_level, slope_angle, seismic_activity, peak_acceleration
        let row: [f64; 10] = match self {
            Scenario::Flood => [28.0, 0.0, 120.0, 80.0, 10.0, 995.0, 5.0, 10.0, 0.0, 0.0],
            Scenario::Earthquake => [30.0, 5.2, 0.0, 25.0, 5.0, 1008.0, 1.0, 5.0, 6.5, 0.3],
            Scenario::Landslide => [26.0, 0.0, 80.0, 70.0, 6.0, 1002.0, 2.0, 35.0, 0.5, 0.05],
            // Rainfall is 95 rather than the field table's 200, which trips Flood first
            Scenario::Cyclone => [27.0, 0.0, 95.0, 85.0, 120.0, 970.0, 4.0, 8.0, 0.0, 0.0],
            Scenario::Safe => [27.0, 0.0, 5.0, 20.0, 5.0, 1013.0, 1.0, 10.0, 0.0, 0.0],
        };

        const NAMES: [&str; 10] = [
            "temperature",
            "magnitude",
            "rainfall",
            "soil_moisture",
            "windspeed",
            "pressure",
            "river_level",
            "slope_angle",
            "seismic_activity",
            "peak_acceleration",
        ];

        NAMES
            .iter()
            .zip(row)
            .fold(ReadingSet::new("simulation"), |set, (name, value)| {
                set.with(*name, value)
            })
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let choice = s.trim().to_ascii_lowercase();
        Scenario::ALL
            .into_iter()
            .find(|sc| choice == sc.as_str() || choice == sc.menu_key().to_string())
            .ok_or_else(|| SourceError::InvalidFormat(format!("Unknown scenario: {}", s)))
    }
}

/// Source replaying a simulation scenario
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    scenario: Scenario,
}

impl SimulatedSource {
    pub fn new(scenario: Scenario) -> Self {
        Self { scenario }
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }
}

impl ReadingSource for SimulatedSource {
    fn id(&self) -> &str {
        "simulation"
    }

    fn fetch(&self) -> Result<ReadingSet, SourceError> {
        Ok(self.scenario.readings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_by_key_and_name() {
        assert_eq!(Scenario::select("1"), Scenario::Flood);
        assert_eq!(Scenario::select("Earthquake"), Scenario::Earthquake);
        assert_eq!(Scenario::select(" 4 "), Scenario::Cyclone);
    }

    #[test]
    fn test_unknown_selection_is_safe() {
        assert_eq!(Scenario::select("9"), Scenario::Safe);
        assert_eq!(Scenario::select("tsunami"), Scenario::Safe);
        assert!("tsunami".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_every_scenario_has_full_readings() {
        for scenario in Scenario::ALL {
            let set = scenario.readings();
            assert_eq!(set.len(), 10, "{}", scenario);
            assert_eq!(set.source, "simulation");
        }
    }

    #[test]
    fn test_simulated_source_fetch() {
        let source = SimulatedSource::new(Scenario::Landslide);
        let set = source.fetch().unwrap();
        assert_eq!(
            set.get("slope_angle").and_then(|r| r.as_number()),
            Some(35.0)
        );
    }
}
