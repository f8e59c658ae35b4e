//! Alert Manager Implementation

use chrono::{DateTime, Utc};
use fallback::Disaster;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Alert configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum model confidence to alert (default: 0.6)
    pub confidence_threshold: f64,
    /// Confidence for critical severity (default: 0.90)
    pub critical_threshold: f64,
    /// Cooldown between alerts for the same disaster (seconds)
    pub cooldown_seconds: u64,
    /// Maximum alerts per hour before throttling
    pub max_alerts_per_hour: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            critical_threshold: 0.90,
            cooldown_seconds: 1800, // 30 minutes
            max_alerts_per_hour: 10,
        }
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A raised disaster alert
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: Uuid,
    pub disaster: Disaster,
    pub severity: Severity,
    /// Model confidence, absent for rule-based verdicts
    pub confidence: Option<f64>,
    pub title: String,
    pub message: String,
    pub recommended_action: String,
    pub raised_at: DateTime<Utc>,
}

/// State of an alert
#[derive(Debug, Clone)]
pub struct AlertState {
    /// Last time this alert was fired
    pub last_fired: Instant,
    /// Number of times fired
    pub fire_count: usize,
}

/// Alert manager for gating, deduplication and throttling
pub struct AlertManager {
    /// Configuration
    config: AlertConfig,
    /// Alert states by disaster
    states: HashMap<Disaster, AlertState>,
    /// Alerts fired in current hour
    hourly_count: usize,
    /// Hour start time
    hour_start: Instant,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            states: HashMap::new(),
            hourly_count: 0,
            hour_start: Instant::now(),
        }
    }

    /// Gate a verdict and, if it passes, record and build the alert
    pub fn evaluate(&mut self, disaster: Disaster, confidence: Option<f64>) -> Option<Alert> {
        if !self.should_fire(disaster, confidence) {
            return None;
        }
        self.record_fire(disaster);

        Some(Alert {
            id: Uuid::new_v4(),
            disaster,
            severity: self.severity(confidence),
            confidence,
            title: "ALERT!".to_string(),
            message: format!("Predicted Disaster: {}", disaster),
            recommended_action: disaster.recommended_action().to_string(),
            raised_at: Utc::now(),
        })
    }

    /// Check if an alert should be fired based on verdict, confidence and deduplication
    pub fn should_fire(&mut self, disaster: Disaster, confidence: Option<f64>) -> bool {
        if !disaster.is_disaster() {
            debug!("No disaster predicted, no alert");
            return false;
        }

        // Rule verdicts carry no confidence and are not gated on it
        if let Some(confidence) = confidence {
            if confidence < self.config.confidence_threshold {
                debug!(
                    "Alert suppressed: confidence {} < threshold {}",
                    confidence, self.config.confidence_threshold
                );
                return false;
            }
        }

        // Reset hourly counter if needed
        if self.hour_start.elapsed() > Duration::from_secs(3600) {
            self.hourly_count = 0;
            self.hour_start = Instant::now();
        }

        // Check hourly throttle
        if self.hourly_count >= self.config.max_alerts_per_hour {
            warn!("Alert throttled: max alerts per hour reached");
            return false;
        }

        // Check cooldown
        if let Some(state) = self.states.get(&disaster) {
            let cooldown = Duration::from_secs(self.config.cooldown_seconds);
            if state.last_fired.elapsed() < cooldown {
                debug!("Alert suppressed: {} in cooldown period", disaster);
                return false;
            }
        }

        true
    }

    /// Record that an alert was fired
    pub fn record_fire(&mut self, disaster: Disaster) {
        self.hourly_count += 1;

        let state = self.states.entry(disaster).or_insert(AlertState {
            last_fired: Instant::now(),
            fire_count: 0,
        });

        state.last_fired = Instant::now();
        state.fire_count += 1;

        info!("Alert recorded: {} (count: {})", disaster, state.fire_count);
    }

    /// Severity from model confidence; rule verdicts are `High`
    pub fn severity(&self, confidence: Option<f64>) -> Severity {
        match confidence {
            None => Severity::High,
            Some(c) if c >= self.config.critical_threshold => Severity::Critical,
            Some(c) if c >= 0.75 => Severity::High,
            Some(c) if c >= self.config.confidence_threshold => Severity::Medium,
            Some(_) => Severity::Low,
        }
    }

    /// Get hourly alert count
    pub fn hourly_count(&self) -> usize {
        self.hourly_count
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
