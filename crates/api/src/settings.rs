//! Layered Configuration
//!
//! Built-in defaults, then `config/default.toml` if present, then an explicit
//! file, then `DISASTER__*` environment variables (`__` separates sections,
//! e.g. `DISASTER__SERVER__ADDR`).

use crate::rate_limit::RateLimitConfig;
use alerting::AlertConfig;
use config::{Config, Environment, File};
use fallback::{ConfigError, LabelSet, RuleEngine, Thresholds};
use feature_engine::{FeatureSchema, FeatureSpec};
use inference_engine::{load_optional, Predictor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors loading or validating settings; fatal at startup
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Cannot load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid classifier configuration: {0}")]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Tree-ensemble JSON model; rules only when unset or unloadable
    pub path: Option<PathBuf>,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub model: ModelSettings,
    /// Ordered feature schema with "no disaster" defaults
    pub schema: Vec<FeatureSpec>,
    pub thresholds: Thresholds,
    /// Model class order
    pub labels: LabelSet,
    pub alerts: AlertConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
            model: ModelSettings::default(),
            schema: FeatureSchema::disaster_specs(),
            thresholds: Thresholds::default(),
            labels: LabelSet::default(),
            alerts: AlertConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Settings {
    /// Load layered settings, with an optional explicit file
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .add_source(File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("DISASTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// Validate configuration and build the predictor.
    ///
    /// Structural problems fail here; a missing or broken model only
    /// downgrades to rule-based predictions.
    pub fn build_predictor(&self) -> Result<Predictor, SettingsError> {
        let schema = FeatureSchema::new(self.schema.clone()).map_err(ConfigError::from)?;
        let rules = RuleEngine::new(self.thresholds.clone(), &schema)?;
        let model = load_optional(self.model.path.as_deref());

        info!(
            "Configuration valid: {} features, {} labels",
            schema.len(),
            self.labels.len()
        );
        Ok(Predictor::new(schema, rules, self.labels.clone(), model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_build_rule_predictor() {
        let predictor = Settings::default().build_predictor().unwrap();
        assert_eq!(predictor.schema().len(), 10);
        assert_eq!(predictor.model_name(), None);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_toml(
            r#"
            [server]
            addr = "127.0.0.1:9000"

            [thresholds.flood]
            feature = "rainfall"
            above = 150

            [alerts]
            cooldown_seconds = 60
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.server.addr, "127.0.0.1:9000");
        assert_eq!(settings.thresholds.flood.above, 150.0);
        assert_eq!(settings.thresholds.earthquake.above, 4.0);
        assert_eq!(settings.alerts.cooldown_seconds, 60);
        assert_eq!(settings.alerts.max_alerts_per_hour, 10);
        assert!(settings.build_predictor().is_ok());
    }

    #[test]
    fn test_unknown_threshold_feature_is_fatal() {
        let file = write_toml(
            r#"
            [thresholds.cyclone]
            feature = "wind_shear"
            above = 100
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert!(matches!(
            settings.build_predictor(),
            Err(SettingsError::Invalid(ConfigError::UnknownFeature { .. }))
        ));
    }

    #[test]
    fn test_threshold_missing_feature_is_fatal() {
        let file = write_toml(
            r#"
            [thresholds.flood]
            above = 120
            "#,
        );
        assert!(matches!(
            Settings::load(Some(file.path())),
            Err(SettingsError::Load(_))
        ));
    }

    #[test]
    fn test_safe_band_masking_threshold_is_fatal() {
        let file = write_toml(
            r#"
            [[thresholds.safe_band]]
            feature = "magnitude"
            min = 0
            max = 7
            "#,
        );
        let settings = Settings::load(Some(file.path())).unwrap();
        assert!(matches!(
            settings.build_predictor(),
            Err(SettingsError::Invalid(ConfigError::BandMasksThreshold { .. }))
        ));
    }

    #[test]
    fn test_label_set_without_none_is_fatal() {
        let file = write_toml(r#"labels = ["Flood", "Earthquake"]"#);
        assert!(Settings::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_fatal() {
        assert!(matches!(
            Settings::load(Some(Path::new("/nonexistent/disaster.toml"))),
            Err(SettingsError::Load(_))
        ));
    }

    #[test]
    fn test_broken_model_path_degrades_to_rules() {
        let settings = Settings {
            model: ModelSettings {
                path: Some(PathBuf::from("/nonexistent/model.json")),
            },
            ..Settings::default()
        };
        let predictor = settings.build_predictor().unwrap();
        assert_eq!(predictor.model_name(), None);
    }
}
