//! Feature Engineering Engine
//!
//! Merges sparse readings from several sources into one complete,
//! schema-ordered feature vector ready for classification.

mod features;
mod reading;
mod schema;

pub use features::{normalize, FeatureVector, FillReason, Origin};
pub use reading::{Reading, ReadingSet};
pub use schema::{FeatureSchema, FeatureSpec};

use thiserror::Error;

/// Errors raised while building a feature schema
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("Feature schema is empty")]
    Empty,
    #[error("Duplicate feature in schema: {0}")]
    DuplicateFeature(String),
    #[error("Feature name must not be blank")]
    BlankName,
    #[error("Default for {name} is not finite: {value}")]
    NonFiniteDefault { name: String, value: f64 },
}
