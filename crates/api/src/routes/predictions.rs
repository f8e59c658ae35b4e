//! Prediction Routes

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::{ApiError, ApiResult, AppState, PredictionReport};
use alerting::Alert;
use fallback::{Disaster, RuleCheck};
use feature_engine::{FeatureVector, ReadingSet};
use inference_engine::{ClassProbability, PredictionSource};
use reading_sources::{collect_readings, ReadingSource, Scenario, SimulatedSource, StaticSource};

/// Body of `POST /api/v1/simulate`
#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    /// Menu key ("1".."5", or a number) or scenario name
    #[serde(default)]
    pub scenario: Value,
}

/// Body of `POST /api/v1/predict`
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    /// Reading sets in priority order, each a flat object of `name -> value`
    #[serde(default)]
    pub readings: Vec<Value>,
}

/// Prediction response
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    /// `simulation` or `live`
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Scenario>,
    pub predicted_disaster: Disaster,
    pub confidence: Option<f64>,
    pub probabilities: Option<Vec<ClassProbability>>,
    pub source: PredictionSource,
    pub fallback_reason: Option<String>,
    pub input_data: FeatureVector,
    /// Features filled from schema defaults
    pub defaulted: Vec<String>,
    pub checks: Vec<RuleCheck>,
    pub alert: Option<Alert>,
    pub timestamp_ms: u64,
}

impl PredictionResponse {
    fn new(mode: &'static str, scenario: Option<Scenario>, report: PredictionReport) -> Self {
        let prediction = report.prediction;
        let defaulted = prediction
            .features
            .defaulted()
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            mode,
            scenario,
            predicted_disaster: prediction.disaster,
            confidence: prediction.confidence,
            probabilities: prediction.probabilities,
            source: prediction.source,
            fallback_reason: prediction.fallback_reason,
            input_data: prediction.features,
            defaulted,
            checks: report.checks,
            alert: report.alert,
            timestamp_ms: prediction.timestamp_ms,
        }
    }
}

/// Run a predefined scenario; unrecognized choices run the safe scenario
pub async fn simulate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> ApiResult<Json<PredictionResponse>> {
    let Json(request) = payload?;
    let choice = match &request.scenario {
        Value::String(s) => s.clone(),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .map(|key| key.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    };
    let scenario = Scenario::select(&choice);
    info!("Simulating {} scenario", scenario);

    let readings = collect_readings(&[&SimulatedSource::new(scenario)]);
    let report = state.predict(&readings).await;

    Ok(Json(PredictionResponse::new("simulation", Some(scenario), report)))
}

/// Predict from caller-supplied readings
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<Json<PredictionResponse>> {
    let Json(request) = payload?;
    let sources = request
        .readings
        .iter()
        .enumerate()
        .map(|(i, value)| {
            if value.is_object() {
                let set = ReadingSet::from_json(format!("request[{}]", i), value);
                Ok(StaticSource::new(set))
            } else {
                Err(ApiError::Validation(format!(
                    "readings[{}] must be an object of feature readings",
                    i
                )))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let readings = {
        let sources: Vec<&dyn ReadingSource> =
            sources.iter().map(|s| s as &dyn ReadingSource).collect();
        collect_readings(&sources)
    };

    let report = state.predict(&readings).await;
    Ok(Json(PredictionResponse::new("live", None, report)))
}
