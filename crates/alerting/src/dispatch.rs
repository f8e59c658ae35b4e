//! Alert Delivery

use crate::manager::Alert;
use crate::AlertError;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::warn;

/// Delivers alerts to a notification channel
pub trait AlertDispatcher: Send + Sync {
    fn dispatch(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Emits alerts as warning-level log events
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl AlertDispatcher for LogDispatcher {
    fn dispatch(&self, alert: &Alert) -> Result<(), AlertError> {
        warn!(
            alert_id = %alert.id,
            disaster = %alert.disaster,
            severity = alert.severity.as_str(),
            "{} {} | {}",
            alert.title,
            alert.message,
            alert.recommended_action
        );
        Ok(())
    }
}

/// Keeps the most recent alerts in memory, newest last
pub struct RecordingDispatcher {
    alerts: Mutex<VecDeque<Alert>>,
    capacity: usize,
}

impl RecordingDispatcher {
    pub fn new(capacity: usize) -> Self {
        Self {
            alerts: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Most recent alerts, newest first
    pub fn recent(&self, limit: usize) -> Vec<Alert> {
        self.alerts
            .lock()
            .map(|alerts| alerts.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertDispatcher for RecordingDispatcher {
    fn dispatch(&self, alert: &Alert) -> Result<(), AlertError> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|e| AlertError::DeliveryFailed(format!("Lock error: {}", e)))?;

        while alerts.len() >= self.capacity {
            alerts.pop_front();
        }
        alerts.push_back(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::AlertManager;
    use fallback::Disaster;

    #[test]
    fn test_log_dispatcher_accepts_alert() {
        let mut manager = AlertManager::default();
        let alert = manager.evaluate(Disaster::Flood, None).unwrap();
        assert!(LogDispatcher.dispatch(&alert).is_ok());
    }

    #[test]
    fn test_recording_dispatcher_retention() {
        let dispatcher = RecordingDispatcher::new(2);
        let mut manager = AlertManager::default();

        for disaster in [Disaster::Flood, Disaster::Earthquake, Disaster::Cyclone] {
            let alert = manager.evaluate(disaster, None).unwrap();
            dispatcher.dispatch(&alert).unwrap();
        }

        let recent = dispatcher.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].disaster, Disaster::Cyclone);
        assert_eq!(recent[1].disaster, Disaster::Earthquake);
    }

    #[test]
    fn test_alert_serializes() {
        let mut manager = AlertManager::default();
        let alert = manager.evaluate(Disaster::Landslide, Some(0.7)).unwrap();
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["disaster"], "Landslide");
        assert_eq!(json["severity"], "medium");
    }
}
