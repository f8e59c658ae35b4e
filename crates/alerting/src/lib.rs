//! Alerting System
//!
//! Gates verdicts into alerts with cooldown and throttling, then hands them
//! to a dispatcher.

mod dispatch;
mod manager;

pub use dispatch::{AlertDispatcher, LogDispatcher, RecordingDispatcher};
pub use manager::{Alert, AlertConfig, AlertManager, AlertState, Severity};

use thiserror::Error;

/// Errors while delivering an alert
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Alert delivery failed: {0}")]
    DeliveryFailed(String),
}
