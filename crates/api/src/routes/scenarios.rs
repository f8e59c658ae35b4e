//! Scenario Routes

use axum::Json;
use serde::Serialize;

use reading_sources::Scenario;

#[derive(Debug, Serialize)]
pub struct ScenarioInfo {
    pub key: usize,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ScenarioList {
    pub scenarios: Vec<ScenarioInfo>,
}

/// Available simulation scenarios in menu order
pub async fn list_scenarios() -> Json<ScenarioList> {
    Json(ScenarioList {
        scenarios: Scenario::ALL
            .iter()
            .map(|scenario| ScenarioInfo {
                key: scenario.menu_key(),
                name: scenario.as_str(),
            })
            .collect(),
    })
}
