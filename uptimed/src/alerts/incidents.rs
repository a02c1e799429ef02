//! Incident correlation.
//!
//! Groups concurrent alerts across services into a single incident draft. An
//! incident only forms when at least two distinct services raised alerts
//! within the correlation window of the earliest alert; anything less stays
//! at the alert level.

use std::collections::HashSet;

use uuid::Uuid;

use crate::alerts::models::{Alert, AlertSeverity, IncidentDraft, IncidentSeverity};

/// Default correlation window, in minutes.
pub const DEFAULT_WINDOW_MINUTES: i64 = 15;

/// Correlate open alerts into an incident draft, or `None` when no clear
/// multi-service event is present.
pub fn group_alerts_into_incident(alerts: &[Alert], window_minutes: i64) -> Option<IncidentDraft> {
    let mut sorted: Vec<&Alert> = alerts.iter().collect();
    sorted.sort_by_key(|a| a.created_at);

    let distinct: HashSet<Uuid> = sorted.iter().map(|a| a.service_id).collect();
    if distinct.len() < 2 {
        return None;
    }

    let started_at = sorted.first()?.created_at;
    let window = chrono::Duration::minutes(window_minutes);
    let in_window: Vec<&Alert> = sorted
        .into_iter()
        .filter(|a| a.created_at - started_at <= window)
        .collect();

    // Distinct services within the window, in order of first alert
    let mut service_ids: Vec<Uuid> = Vec::new();
    for alert in &in_window {
        if !service_ids.contains(&alert.service_id) {
            service_ids.push(alert.service_id);
        }
    }
    if service_ids.len() < 2 {
        return None;
    }

    let worst = in_window.iter().map(|a| a.severity).max()?;
    let (severity, label) = match worst {
        AlertSeverity::Down => (IncidentSeverity::Critical, "outage"),
        AlertSeverity::Critical => (IncidentSeverity::Major, "critical degradation"),
        AlertSeverity::Warning => (IncidentSeverity::Minor, "degradation"),
    };

    Some(IncidentDraft {
        title: format!("Correlated {label} across {} services", service_ids.len()),
        service_ids,
        severity,
        started_at,
    })
}
