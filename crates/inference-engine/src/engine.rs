//! Prediction Pipeline

use crate::model::{DisasterModel, ModelOutput};
use crate::InferenceError;
use fallback::{Disaster, LabelSet, RuleEngine};
use feature_engine::{normalize, FeatureSchema, FeatureVector, ReadingSet};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which classifier produced the verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionSource {
    /// Trained model, by name
    Model { name: String },
    /// Rule cascade
    Rules,
}

impl PredictionSource {
    fn metric_label(&self) -> &'static str {
        match self {
            PredictionSource::Model { .. } => "model",
            PredictionSource::Rules => "rules",
        }
    }
}

/// Probability of one label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbability {
    pub disaster: Disaster,
    pub probability: f64,
}

/// Result of one prediction cycle
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Predicted disaster
    pub disaster: Disaster,
    /// Probability of the predicted label, when the model reports one
    pub confidence: Option<f64>,
    /// Full distribution over the label set, when the model reports one
    pub probabilities: Option<Vec<ClassProbability>>,
    /// Classifier that produced the verdict
    pub source: PredictionSource,
    /// Why the model was not used, if one is loaded but failed
    pub fallback_reason: Option<String>,
    /// Normalized input
    pub features: FeatureVector,
    /// Timestamp when prediction was made
    pub timestamp_ms: u64,
}

impl Prediction {
    /// Whether the rule cascade produced this verdict
    pub fn used_fallback(&self) -> bool {
        self.source == PredictionSource::Rules
    }
}

/// Normalize → classify, model first with rule fallback
///
/// Holds only read-only state; share it behind an `Arc` across requests.
#[derive(Clone)]
pub struct Predictor {
    schema: FeatureSchema,
    rules: RuleEngine,
    labels: LabelSet,
    model: Option<Arc<dyn DisasterModel>>,
}

impl Predictor {
    /// Create a predictor from validated configuration and an optional model
    pub fn new(
        schema: FeatureSchema,
        rules: RuleEngine,
        labels: LabelSet,
        model: Option<Arc<dyn DisasterModel>>,
    ) -> Self {
        match &model {
            Some(m) => info!("Predictor using model {} with rule fallback", m.name()),
            None => info!("Predictor using rule-based classification only"),
        }
        Self {
            schema,
            rules,
            labels,
            model,
        }
    }

    /// Rule-only predictor over the built-in schema and thresholds
    pub fn rules_only() -> Self {
        Self::new(
            FeatureSchema::disaster(),
            RuleEngine::with_defaults(),
            LabelSet::default(),
            None,
        )
    }

    /// Run one prediction cycle; always yields a verdict
    pub fn predict(&self, readings: &[ReadingSet]) -> Prediction {
        let features = normalize(readings, &self.schema);
        self.predict_features(features)
    }

    /// Classify an already normalized feature vector
    pub fn predict_features(&self, features: FeatureVector) -> Prediction {
        let start = std::time::Instant::now();
        let timestamp_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let mut fallback_reason = None;

        if let Some(model) = &self.model {
            match self.model_verdict(model.as_ref(), &features) {
                Ok((disaster, probabilities)) => {
                    let confidence = probabilities.as_ref().and_then(|probs| {
                        probs
                            .iter()
                            .find(|p| p.disaster == disaster)
                            .map(|p| p.probability)
                    });
                    let prediction = Prediction {
                        disaster,
                        confidence,
                        probabilities,
                        source: PredictionSource::Model {
                            name: model.name().to_string(),
                        },
                        fallback_reason: None,
                        features,
                        timestamp_ms,
                    };
                    record(&prediction);
                    debug!("Model prediction completed in {}us", start.elapsed().as_micros());
                    return prediction;
                }
                Err(e) => {
                    warn!("Model {} failed, falling back to rules: {}", model.name(), e);
                    metrics::counter!("disaster_model_fallbacks_total").increment(1);
                    fallback_reason = Some(e.to_string());
                }
            }
        }

        let disaster = self.rules.classify(&features);
        let prediction = Prediction {
            disaster,
            confidence: None,
            probabilities: None,
            source: PredictionSource::Rules,
            fallback_reason,
            features,
            timestamp_ms,
        };
        record(&prediction);
        debug!("Rule prediction completed in {}us", start.elapsed().as_micros());
        prediction
    }

    fn model_verdict(
        &self,
        model: &dyn DisasterModel,
        features: &FeatureVector,
    ) -> Result<(Disaster, Option<Vec<ClassProbability>>), InferenceError> {
        let ModelOutput {
            class_index,
            probabilities,
        } = model.predict(features)?;

        let disaster = self
            .labels
            .get(class_index)
            .ok_or(InferenceError::UnknownClass {
                index: class_index,
                labels: self.labels.len(),
            })?;

        let probabilities = match probabilities {
            Some(probs) if probs.len() != self.labels.len() => {
                return Err(InferenceError::InvalidInputShape {
                    expected: format!("{} probabilities", self.labels.len()),
                    actual: format!("{} probabilities", probs.len()),
                });
            }
            Some(probs) => Some(
                self.labels
                    .labels()
                    .iter()
                    .zip(probs)
                    .map(|(&disaster, probability)| ClassProbability {
                        disaster,
                        probability,
                    })
                    .collect(),
            ),
            None => None,
        };

        Ok((disaster, probabilities))
    }

    /// Feature schema in use
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Rule engine in use
    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    /// Label set in use
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Name of the loaded model, if any
    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().map(|m| m.name())
    }
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("schema", &self.schema)
            .field("rules", &self.rules)
            .field("labels", &self.labels)
            .field("model", &self.model_name())
            .finish()
    }
}

fn record(prediction: &Prediction) {
    metrics::counter!(
        "disaster_predictions_total",
        "disaster" => prediction.disaster.as_str(),
        "source" => prediction.source.metric_label()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TreeEnsemble;
    use proptest::prelude::*;

    struct FailingModel;

    impl DisasterModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict(&self, _: &FeatureVector) -> Result<ModelOutput, InferenceError> {
            Err(InferenceError::InferenceFailed("boom".to_string()))
        }
    }

    /// Always answers a fixed class, optionally with probabilities
    struct FixedModel {
        class_index: usize,
        probabilities: Option<Vec<f64>>,
    }

    impl DisasterModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, _: &FeatureVector) -> Result<ModelOutput, InferenceError> {
            Ok(ModelOutput {
                class_index: self.class_index,
                probabilities: self.probabilities.clone(),
            })
        }
    }

    fn predictor_with(model: Arc<dyn DisasterModel>) -> Predictor {
        Predictor::new(
            FeatureSchema::disaster(),
            RuleEngine::with_defaults(),
            LabelSet::default(),
            Some(model),
        )
    }

    fn flood_readings() -> Vec<ReadingSet> {
        vec![ReadingSet::new("weather")
            .with("rainfall", 150.0)
            .with("magnitude", 6.0)
            .with("slope_angle", 10.0)
            .with("windspeed", 5.0)]
    }

    #[test]
    fn test_rules_only_flood() {
        let prediction = Predictor::rules_only().predict(&flood_readings());
        assert_eq!(prediction.disaster, Disaster::Flood);
        assert!(prediction.used_fallback());
        assert!(prediction.probabilities.is_none());
        assert!(prediction.fallback_reason.is_none());
    }

    #[test]
    fn test_empty_readings_predict_none() {
        let prediction = Predictor::rules_only().predict(&[]);
        assert_eq!(prediction.disaster, Disaster::None);
        assert_eq!(prediction.features, FeatureSchema::disaster().defaults());
    }

    #[test]
    fn test_failing_model_falls_back_to_rules() {
        let predictor = predictor_with(Arc::new(FailingModel));
        let readings = flood_readings();

        let prediction = predictor.predict(&readings);
        let rules_verdict = RuleEngine::with_defaults().classify(&prediction.features);

        assert_eq!(prediction.disaster, rules_verdict);
        assert_eq!(prediction.source, PredictionSource::Rules);
        assert!(prediction.fallback_reason.unwrap().contains("boom"));
    }

    #[test]
    fn test_model_verdict_preferred() {
        let predictor = predictor_with(Arc::new(FixedModel {
            class_index: 3,
            probabilities: Some(vec![0.05, 0.05, 0.1, 0.7, 0.1]),
        }));

        let prediction = predictor.predict(&flood_readings());
        assert_eq!(prediction.disaster, Disaster::Cyclone);
        assert_eq!(prediction.confidence, Some(0.7));
        assert_eq!(
            prediction.source,
            PredictionSource::Model {
                name: "fixed".into()
            }
        );
        let probs = prediction.probabilities.unwrap();
        assert_eq!(probs[0].disaster, Disaster::Flood);
        assert_eq!(probs.len(), 5);
    }

    #[test]
    fn test_model_without_probabilities() {
        let predictor = predictor_with(Arc::new(FixedModel {
            class_index: 4,
            probabilities: None,
        }));
        let prediction = predictor.predict(&flood_readings());
        assert_eq!(prediction.disaster, Disaster::None);
        assert!(prediction.confidence.is_none());
        assert!(!prediction.used_fallback());
    }

    #[test]
    fn test_unknown_class_falls_back() {
        let predictor = predictor_with(Arc::new(FixedModel {
            class_index: 9,
            probabilities: None,
        }));
        let prediction = predictor.predict(&flood_readings());
        assert_eq!(prediction.disaster, Disaster::Flood);
        assert!(prediction.used_fallback());
    }

    #[test]
    fn test_probability_length_mismatch_falls_back() {
        let predictor = predictor_with(Arc::new(FixedModel {
            class_index: 1,
            probabilities: Some(vec![0.5, 0.5]),
        }));
        let prediction = predictor.predict(&flood_readings());
        assert_eq!(prediction.disaster, Disaster::Flood);
        assert!(prediction.used_fallback());
    }

    #[test]
    fn test_tree_ensemble_through_predictor() {
        let json = r#"{
            "name": "quake-stump",
            "feature_names": ["magnitude"],
            "num_classes": 5,
            "trees": [
                {"class": 1, "nodes": [
                    {"feature": 0, "threshold": 4.5, "left": 1, "right": 2},
                    {"leaf": -3.0},
                    {"leaf": 3.0}
                ]},
                {"class": 4, "nodes": [{"leaf": 1.0}]}
            ]
        }"#;
        let model = TreeEnsemble::from_json(json).unwrap();
        let predictor = predictor_with(Arc::new(model));

        let quake = [ReadingSet::new("seismic").with("magnitude", 6.1)];
        let prediction = predictor.predict(&quake);
        assert_eq!(prediction.disaster, Disaster::Earthquake);
        assert!(prediction.confidence.unwrap() > 0.5);

        let calm = predictor.predict(&[]);
        assert_eq!(calm.disaster, Disaster::None);
        assert_eq!(predictor.model_name(), Some("quake-stump"));
    }

    #[test]
    fn test_magnitude_only_source_predicts_earthquake() {
        let readings = [ReadingSet::new("seismic").with("magnitude", 6.2)];
        let prediction = Predictor::rules_only().predict(&readings);
        assert_eq!(prediction.disaster, Disaster::Earthquake);
    }

    #[test]
    fn test_deserialized_ensemble_never_panics() {
        // base_score omitted, deserialized directly rather than via from_json
        let json = r#"{
            "name": "bare",
            "feature_names": [],
            "num_classes": 5,
            "trees": [{"class": 0, "nodes": [{"leaf": 1.0}]}]
        }"#;
        let model: TreeEnsemble = serde_json::from_str(json).unwrap();
        let prediction = predictor_with(Arc::new(model)).predict(&[]);
        assert_eq!(prediction.disaster, Disaster::Flood);
        assert!(!prediction.used_fallback());

        // Missing required fields never produce a model at all
        let partial = r#"{"num_classes": 5, "trees": [{"class": 0, "nodes": [{"leaf": 1.0}]}]}"#;
        assert!(serde_json::from_str::<TreeEnsemble>(partial).is_err());
    }

    #[test]
    fn test_ensemble_input_mismatch_uses_rule_verdict() {
        let json = r#"{
            "name": "mm-stump",
            "feature_names": ["rainfall_mm"],
            "num_classes": 5,
            "trees": [{"class": 3, "nodes": [
                {"feature": 0, "threshold": 50.0, "left": 1, "right": 2},
                {"leaf": 0.0},
                {"leaf": 4.0}
            ]}]
        }"#;
        let model: TreeEnsemble = serde_json::from_str(json).unwrap();
        let predictor = predictor_with(Arc::new(model));

        let prediction = predictor.predict(&flood_readings());
        assert_eq!(prediction.disaster, Disaster::Flood);
        assert!(prediction.used_fallback());
        assert!(prediction.fallback_reason.is_some());
    }

    proptest! {
        #[test]
        fn prop_predict_is_idempotent(
            rainfall in 0.0f64..300.0,
            magnitude in 0.0f64..9.0,
            windspeed in 0.0f64..250.0,
        ) {
            let predictor = Predictor::rules_only();
            let readings = [ReadingSet::new("fuzz")
                .with("rainfall", rainfall)
                .with("magnitude", magnitude)
                .with("windspeed", windspeed)];

            let first = predictor.predict(&readings);
            let second = predictor.predict(&readings);
            prop_assert_eq!(first.disaster, second.disaster);
            prop_assert_eq!(first.features, second.features);
        }
    }
}
