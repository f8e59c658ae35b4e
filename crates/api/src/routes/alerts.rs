//! Alert Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use alerting::Alert;

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Filter by severity (`low`, `medium`, `high`, `critical`)
    pub severity: Option<String>,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub data: Vec<Alert>,
    pub count: usize,
}

/// Recently dispatched alerts, newest first
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertQuery>,
) -> Json<AlertResponse> {
    let limit = params.limit.min(500);

    let data: Vec<Alert> = state
        .recent_alerts
        .recent(usize::MAX)
        .into_iter()
        .filter(|alert| {
            params
                .severity
                .as_deref()
                .map_or(true, |s| alert.severity.as_str().eq_ignore_ascii_case(s))
        })
        .take(limit)
        .collect();

    Json(AlertResponse {
        count: data.len(),
        data,
    })
}
