//! Disaster Risk API Server
//!
//! REST surface over the prediction pipeline: simulated scenarios, ad-hoc
//! readings, recent alerts and Prometheus metrics.

use alerting::{Alert, AlertDispatcher, AlertManager, LogDispatcher, RecordingDispatcher};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use fallback::RuleCheck;
use feature_engine::ReadingSet;
use inference_engine::{Prediction, Predictor};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod error;
pub mod rate_limit;
mod routes;
pub mod settings;

pub use error::{ApiError, ApiResult};
pub use rate_limit::{create_governor_config, PredictGovernorConfig, RateLimitConfig};
pub use settings::{LoggingSettings, Settings, SettingsError};

/// Alerts kept for `GET /api/v1/alerts`
const RECENT_ALERT_CAPACITY: usize = 100;

/// Application state shared across handlers
pub struct AppState {
    pub predictor: Predictor,
    alerts: Mutex<AlertManager>,
    dispatchers: Vec<Arc<dyn AlertDispatcher>>,
    /// In-memory history of dispatched alerts
    pub recent_alerts: Arc<RecordingDispatcher>,
    pub version: String,
    pub start_time: Instant,
    prediction_count: AtomicU64,
    /// Prometheus render handle, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

/// A prediction plus the rule trace and any alert it raised
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub prediction: Prediction,
    pub checks: Vec<RuleCheck>,
    pub alert: Option<Alert>,
}

impl AppState {
    /// Create application state; alerts go to the log and the in-memory history
    pub fn new(predictor: Predictor, alerts: AlertManager) -> Self {
        let recent_alerts = Arc::new(RecordingDispatcher::new(RECENT_ALERT_CAPACITY));
        Self {
            predictor,
            alerts: Mutex::new(alerts),
            dispatchers: vec![Arc::new(LogDispatcher), recent_alerts.clone()],
            recent_alerts,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            prediction_count: AtomicU64::new(0),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build state from validated settings
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let predictor = settings.build_predictor()?;
        Ok(Self::new(
            predictor,
            AlertManager::new(settings.alerts.clone()),
        ))
    }

    /// Run one prediction cycle and dispatch an alert if the verdict warrants one
    pub async fn predict(&self, readings: &[ReadingSet]) -> PredictionReport {
        let prediction = self.predictor.predict(readings);
        let checks = self.predictor.rules().explain(&prediction.features);
        self.prediction_count.fetch_add(1, Ordering::Relaxed);

        let alert = self
            .alerts
            .lock()
            .await
            .evaluate(prediction.disaster, prediction.confidence);

        if let Some(alert) = &alert {
            metrics::counter!(
                "disaster_alerts_total",
                "disaster" => alert.disaster.as_str(),
                "severity" => alert.severity.as_str()
            )
            .increment(1);
            for dispatcher in &self.dispatchers {
                if let Err(e) = dispatcher.dispatch(alert) {
                    warn!("Alert {} not delivered: {}", alert.id, e);
                }
            }
        }

        PredictionReport {
            prediction,
            checks,
            alert,
        }
    }

    pub fn prediction_count(&self) -> u64 {
        self.prediction_count.load(Ordering::Relaxed)
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub classifier: ClassifierStatus,
    pub prediction_count: u64,
    pub alert_count: usize,
}

/// Which classifiers are available
#[derive(Debug, Serialize)]
pub struct ClassifierStatus {
    /// Loaded model name, absent when running on rules alone
    pub model: Option<String>,
    pub features: usize,
    pub labels: usize,
}

/// Create the application router.
///
/// Prediction routes are rate limited when a governor config is given; the
/// server must then provide `ConnectInfo<SocketAddr>`.
pub fn create_router(
    state: Arc<AppState>,
    rate_limit: Option<Arc<PredictGovernorConfig>>,
) -> Router {
    let mut prediction_routes = Router::new()
        .route("/api/v1/simulate", post(routes::predictions::simulate))
        .route("/api/v1/predict", post(routes::predictions::predict));

    if let Some(config) = rate_limit {
        prediction_routes = prediction_routes.layer(GovernorLayer { config });
    }

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/scenarios", get(routes::scenarios::list_scenarios))
        .route("/api/v1/alerts", get(routes::alerts::get_alerts))
        .route("/metrics", get(routes::metrics::render_metrics))
        .merge(prediction_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let predictor = &state.predictor;
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        classifier: ClassifierStatus {
            model: predictor.model_name().map(str::to_string),
            features: predictor.schema().len(),
            labels: predictor.labels().len(),
        },
        prediction_count: state.prediction_count(),
        alert_count: state.recent_alerts.len(),
    })
}

/// Initialize logging; `RUST_LOG` overrides the configured level
pub fn init_logging(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if settings.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    // A subscriber may already be installed (tests, embedding)
    if result.is_err() {
        tracing::debug!("Tracing subscriber already initialized");
    }
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder not installed: {}", e);
            None
        }
    }
}

/// Errors starting or running the server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the server until it stops
pub async fn run_server(settings: &Settings) -> Result<(), ServerError> {
    let mut state = AppState::from_settings(settings)?;
    if let Some(handle) = install_metrics() {
        state = state.with_metrics(handle);
    }

    let governor = create_governor_config(&settings.rate_limit);
    let app = create_router(Arc::new(state), governor);

    info!("Starting API server on {}", settings.server.addr);

    let listener = tokio::net::TcpListener::bind(&settings.server.addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
