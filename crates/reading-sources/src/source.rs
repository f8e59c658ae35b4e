//! Reading Source Trait and Collection

use crate::SourceError;
use feature_engine::ReadingSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A provider of readings (weather client, seismic feed, simulation, file)
pub trait ReadingSource {
    /// Source identifier, used as the reading set's source name
    fn id(&self) -> &str;

    /// Fetch the current readings
    fn fetch(&self) -> Result<ReadingSet, SourceError>;
}

/// Source returning a fixed reading set, e.g. a request payload
#[derive(Debug, Clone)]
pub struct StaticSource {
    readings: ReadingSet,
}

impl StaticSource {
    pub fn new(readings: ReadingSet) -> Self {
        Self { readings }
    }
}

impl ReadingSource for StaticSource {
    fn id(&self) -> &str {
        &self.readings.source
    }

    fn fetch(&self) -> Result<ReadingSet, SourceError> {
        Ok(self.readings.clone())
    }
}

/// Source reading a flat JSON object of `name -> value` from disk
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    id: String,
    path: PathBuf,
}

impl JsonFileSource {
    /// Source named after the file stem
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Self { id, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadingSource for JsonFileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn fetch(&self) -> Result<ReadingSet, SourceError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| SourceError::Io {
            path: self.path.display().to_string(),
            source: e,
        })?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| SourceError::InvalidFormat(format!("{}: {}", self.path.display(), e)))?;
        if !value.is_object() {
            return Err(SourceError::InvalidFormat(format!(
                "{}: expected a JSON object of readings",
                self.path.display()
            )));
        }
        Ok(ReadingSet::from_json(self.id.clone(), &value))
    }
}

/// Fetch every source in priority order.
///
/// A failing source is logged and contributes an empty reading set, so the
/// result always has one entry per source.
pub fn collect_readings(sources: &[&dyn ReadingSource]) -> Vec<ReadingSet> {
    sources
        .iter()
        .map(|source| match source.fetch() {
            Ok(set) => {
                debug!("Fetched {} readings from {}", set.len(), source.id());
                set
            }
            Err(e) => {
                warn!("Source {} failed, continuing without it: {}", source.id(), e);
                ReadingSet::new(source.id())
            }
        })
        .collect()
}
