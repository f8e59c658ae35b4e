//! Reading Sources
//!
//! Data sources producing sparse reading sets for the feature normalizer.
//! A failing source never aborts a prediction: it contributes no readings.

mod scenario;
mod source;

pub use scenario::{Scenario, SimulatedSource};
pub use source::{collect_readings, JsonFileSource, ReadingSource, StaticSource};

use thiserror::Error;

/// Errors raised by a reading source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid readings document: {0}")]
    InvalidFormat(String),
}
