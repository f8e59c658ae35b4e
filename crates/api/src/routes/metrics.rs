//! Prometheus exposition

use axum::extract::State;
use std::sync::Arc;

use crate::{ApiError, ApiResult, AppState};

/// Render the Prometheus text format
pub async fn render_metrics(State(state): State<Arc<AppState>>) -> ApiResult<String> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(ApiError::MetricsUnavailable)
}
