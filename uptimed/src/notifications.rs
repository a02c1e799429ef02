//! Alert and incident lifecycle notifications.
//!
//! Delivery channels (email, chat, webhooks) are out of scope for the core;
//! every lifecycle event is emitted as a structured log line instead. A real
//! delivery backend would slot in behind the same methods.

use crate::alerts::models::{Alert, Incident};
use crate::probes::models::Service;

#[derive(Clone, Default)]
pub struct Notifier;

impl Notifier {
    pub fn new() -> Self {
        Self
    }

    pub fn alert_created(&self, service: &Service, alert: &Alert) {
        tracing::warn!(
            service = %service.name,
            severity = ?alert.severity,
            metric = ?alert.metric,
            message = %alert.message,
            "Alert opened"
        );
    }

    pub fn alert_resolved(&self, service: &Service, alert: &Alert) {
        tracing::info!(
            service = %service.name,
            severity = ?alert.severity,
            metric = ?alert.metric,
            "Alert auto-resolved"
        );
    }

    pub fn alert_superseded(&self, service: &Service, alert: &Alert) {
        tracing::info!(
            service = %service.name,
            severity = ?alert.severity,
            metric = ?alert.metric,
            "Alert superseded by severity change"
        );
    }

    pub fn incident_created(&self, incident: &Incident) {
        tracing::error!(
            title = %incident.title,
            severity = ?incident.severity,
            services = incident.service_ids.len(),
            "Incident opened"
        );
    }
}
