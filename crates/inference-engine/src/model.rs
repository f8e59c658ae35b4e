//! Trained Model Interface and Tree Ensemble

use crate::InferenceError;
use feature_engine::FeatureVector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Raw model output, before label mapping
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    /// Index into the label set
    pub class_index: usize,
    /// Per-class probabilities in label-set order, when supported
    pub probabilities: Option<Vec<f64>>,
}

/// A trained classifier the predictor consults before the rules
pub trait DisasterModel: Send + Sync {
    /// Model name for logs and responses
    fn name(&self) -> &str;

    /// Classify a feature vector
    fn predict(&self, features: &FeatureVector) -> Result<ModelOutput, InferenceError>;
}

/// One node of a decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go to `left` when `value <= threshold`, else `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { leaf: f64 },
}

/// A regression tree contributing to one class score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub class: usize,
    pub nodes: Vec<TreeNode>,
}

/// Model document as written on disk, before validation
#[derive(Debug, Deserialize)]
struct RawTreeEnsemble {
    name: String,
    feature_names: Vec<String>,
    num_classes: usize,
    #[serde(default)]
    base_score: Vec<f64>,
    trees: Vec<Tree>,
}

/// Gradient-boosted tree ensemble (one-vs-all, softmax over class scores).
///
/// Only constructible through deserialization, which validates every class,
/// feature and child index, so prediction cannot index out of bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTreeEnsemble")]
pub struct TreeEnsemble {
    name: String,
    feature_names: Vec<String>,
    num_classes: usize,
    base_score: Vec<f64>,
    trees: Vec<Tree>,
}

impl TryFrom<RawTreeEnsemble> for TreeEnsemble {
    type Error = InferenceError;

    fn try_from(raw: RawTreeEnsemble) -> Result<Self, Self::Error> {
        // Initial score per class; zeros when omitted
        let base_score = if raw.base_score.is_empty() {
            vec![0.0; raw.num_classes]
        } else {
            raw.base_score
        };
        let model = Self {
            name: raw.name,
            feature_names: raw.feature_names,
            num_classes: raw.num_classes,
            base_score,
            trees: raw.trees,
        };
        model.validate()?;
        Ok(model)
    }
}

impl TreeEnsemble {
    /// Parse and validate a JSON model document
    pub fn from_json(json: &str) -> Result<Self, InferenceError> {
        serde_json::from_str(json)
            .map_err(|e| InferenceError::ModelLoadError(format!("Invalid model JSON: {}", e)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input features, by name, in the order tree splits index them
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn base_score(&self) -> &[f64] {
        &self.base_score
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    fn validate(&self) -> Result<(), InferenceError> {
        let invalid = |msg: String| Err(InferenceError::ModelLoadError(msg));

        if self.num_classes == 0 {
            return invalid("Model declares no classes".to_string());
        }
        if self.base_score.len() != self.num_classes {
            return invalid(format!(
                "base_score has {} entries for {} classes",
                self.base_score.len(),
                self.num_classes
            ));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.class >= self.num_classes {
                return invalid(format!("Tree {} targets unknown class {}", t, tree.class));
            }
            if tree.nodes.is_empty() {
                return invalid(format!("Tree {} has no nodes", t));
            }
            for node in &tree.nodes {
                if let TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } = node
                {
                    if *feature >= self.feature_names.len() {
                        return invalid(format!("Tree {} splits on unknown feature {}", t, feature));
                    }
                    if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                        return invalid(format!("Tree {} has a dangling child index", t));
                    }
                }
            }
        }
        Ok(())
    }

    /// Pick model inputs out of a feature vector by name
    fn inputs(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        self.feature_names
            .iter()
            .map(|name| {
                features.get(name).ok_or_else(|| InferenceError::InvalidInputShape {
                    expected: self.feature_names.join(","),
                    actual: features.names().join(","),
                })
            })
            .collect()
    }

    fn walk(&self, tree: &Tree, inputs: &[f64]) -> Result<f64, InferenceError> {
        let broken = |what: &str| InferenceError::InferenceFailed(format!("Tree {} index out of range", what));
        let mut index = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..tree.nodes.len() {
            match tree.nodes.get(index).ok_or_else(|| broken("node"))? {
                TreeNode::Leaf { leaf } => return Ok(*leaf),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = inputs.get(*feature).ok_or_else(|| broken("feature"))?;
                    index = if *value <= *threshold { *left } else { *right };
                }
            }
        }
        Err(InferenceError::InferenceFailed(
            "Tree traversal did not reach a leaf".to_string(),
        ))
    }
}

impl DisasterModel for TreeEnsemble {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureVector) -> Result<ModelOutput, InferenceError> {
        let inputs = self.inputs(features)?;

        let mut scores = self.base_score.clone();
        for tree in &self.trees {
            let leaf = self.walk(tree, &inputs)?;
            let score = scores.get_mut(tree.class).ok_or_else(|| {
                InferenceError::InferenceFailed(format!("Tree targets unknown class {}", tree.class))
            })?;
            *score += leaf;
        }

        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(InferenceError::InferenceFailed(
                "Class scores are not finite".to_string(),
            ));
        }
        let probabilities: Vec<f64> = exp.iter().map(|e| e / total).collect();

        let class_index = probabilities
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if *p > probabilities[best] { i } else { best });

        Ok(ModelOutput {
            class_index,
            probabilities: Some(probabilities),
        })
    }
}

/// Load a tree-ensemble model from a JSON file
pub fn load_model(path: &Path) -> Result<TreeEnsemble, InferenceError> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        InferenceError::ModelLoadError(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let model = TreeEnsemble::from_json(&json)?;
    info!(
        "Loaded model {} ({} trees, {} classes) from {}",
        model.name(),
        model.trees().len(),
        model.num_classes(),
        path.display()
    );
    Ok(model)
}

/// Load a model if a path is configured; any failure means "use the rules"
pub fn load_optional(path: Option<&Path>) -> Option<Arc<dyn DisasterModel>> {
    let path = path?;
    match load_model(path) {
        Ok(model) => Some(Arc::new(model)),
        Err(e) => {
            warn!("Model unavailable, using rule-based predictions: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::{normalize, FeatureSchema, ReadingSet};
    use std::io::Write;

    /// Two classes over rainfall: class 0 above 100mm, class 1 otherwise
    const RAIN_MODEL: &str = r#"{
        "name": "rain-stump",
        "feature_names": ["rainfall"],
        "num_classes": 2,
        "trees": [
            {"class": 0, "nodes": [
                {"feature": 0, "threshold": 100.0, "left": 1, "right": 2},
                {"leaf": -2.0},
                {"leaf": 2.0}
            ]},
            {"class": 1, "nodes": [{"leaf": 0.0}]}
        ]
    }"#;

    fn features(rainfall: f64) -> FeatureVector {
        let set = ReadingSet::new("test").with("rainfall", rainfall);
        normalize(&[set], &FeatureSchema::disaster())
    }

    #[test]
    fn test_tree_ensemble_predicts() {
        let model = TreeEnsemble::from_json(RAIN_MODEL).unwrap();
        assert_eq!(model.base_score(), &[0.0, 0.0]);

        let wet = model.predict(&features(150.0)).unwrap();
        assert_eq!(wet.class_index, 0);
        let probs = wet.probabilities.unwrap();
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probs[0] > 0.8);

        let dry = model.predict(&features(20.0)).unwrap();
        assert_eq!(dry.class_index, 1);
    }

    #[test]
    fn test_missing_input_feature_is_shape_error() {
        let json = RAIN_MODEL.replace(r#"["rainfall"]"#, r#"["rainfall_mm"]"#);
        let model = TreeEnsemble::from_json(&json).unwrap();
        let err = model.predict(&features(150.0)).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidInputShape { .. }));
    }

    #[test]
    fn test_rejects_dangling_child() {
        let json = RAIN_MODEL.replace(r#""right": 2"#, r#""right": 7"#);
        assert!(matches!(
            TreeEnsemble::from_json(&json),
            Err(InferenceError::ModelLoadError(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_class() {
        let json = RAIN_MODEL.replace(r#""num_classes": 2"#, r#""num_classes": 1"#);
        assert!(TreeEnsemble::from_json(&json).is_err());
    }

    #[test]
    fn test_cyclic_tree_fails_at_predict() {
        let json = r#"{
            "name": "loop",
            "feature_names": ["rainfall"],
            "num_classes": 1,
            "trees": [{"class": 0, "nodes": [
                {"feature": 0, "threshold": 0.0, "left": 0, "right": 0}
            ]}]
        }"#;
        let model = TreeEnsemble::from_json(json).unwrap();
        assert!(matches!(
            model.predict(&features(1.0)),
            Err(InferenceError::InferenceFailed(_))
        ));
    }

    #[test]
    fn test_serde_deserialize_validates() {
        let filled: TreeEnsemble = serde_json::from_str(RAIN_MODEL).unwrap();
        assert_eq!(filled.base_score(), &[0.0, 0.0]);

        let no_features = r#"{
            "name": "bare",
            "feature_names": [],
            "num_classes": 5,
            "trees": [{"class": 0, "nodes": [
                {"feature": 3, "threshold": 1.0, "left": 0, "right": 0}
            ]}]
        }"#;
        assert!(serde_json::from_str::<TreeEnsemble>(no_features).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RAIN_MODEL.as_bytes()).unwrap();

        let model = load_model(file.path()).unwrap();
        assert_eq!(model.name(), "rain-stump");
        assert!(load_optional(Some(file.path())).is_some());
    }

    #[test]
    fn test_load_optional_tolerates_failure() {
        assert!(load_optional(None).is_none());
        assert!(load_optional(Some(Path::new("/nonexistent/model.json"))).is_none());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        assert!(load_optional(Some(file.path())).is_none());
    }
}
