//! Data models for alerts and incidents.
//!
//! Alerts are persisted records of a detected unhealthy condition, with a
//! lifecycle independent of the underlying check stream. Incidents group
//! correlated alerts across services for human-facing tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert severity. Ordered: `Warning < Critical < Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
    Down,
}

/// The condition an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertMetric {
    ResponseTime,
    StatusCode,
    Ssl,
    Availability,
    Custom,
}

/// Alert lifecycle state. `Resolved` and `Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Acknowledged,
    Resolved,
    Closed,
}

/// A candidate alert produced by the generator, before deduplication and
/// persistence. Drafts always enter the store as `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDraft {
    /// The service the alert is about
    pub service_id: Uuid,
    /// The check that triggered it
    pub check_id: Uuid,
    pub severity: AlertSeverity,
    pub metric: AlertMetric,
    /// The threshold-breaching value for latency alerts, the error text
    /// otherwise
    pub value: serde_json::Value,
    /// Human-readable description
    pub message: String,
}

/// A persisted alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub service_id: Uuid,
    pub check_id: Uuid,
    pub severity: AlertSeverity,
    pub metric: AlertMetric,
    pub value: serde_json::Value,
    pub message: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Materialize a draft as a pending alert.
    pub fn from_draft(draft: AlertDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_id: draft.service_id,
            check_id: draft.check_id,
            severity: draft.severity,
            metric: draft.metric,
            value: draft.value,
            message: draft.message,
            status: AlertStatus::Pending,
            created_at: now,
            acknowledged_at: None,
            resolved_at: None,
        }
    }

    /// Pending and acknowledged alerts are open; resolved and closed are not.
    pub fn is_open(&self) -> bool {
        matches!(self.status, AlertStatus::Pending | AlertStatus::Acknowledged)
    }
}

/// Incident severity, derived from the worst correlated alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Minor,
    Major,
    Critical,
}

/// Incident lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Investigating,
    Identified,
    Monitoring,
    Resolved,
}

/// One entry in an incident's append-only update log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentUpdate {
    pub message: String,
    pub status: IncidentStatus,
    pub timestamp: DateTime<Utc>,
    pub author: String,
}

/// A candidate incident produced by the correlator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentDraft {
    pub title: String,
    /// Distinct affected services, in order of first alert
    pub service_ids: Vec<Uuid>,
    pub severity: IncidentSeverity,
    pub started_at: DateTime<Utc>,
}

/// A persisted incident. Updates are only ever appended, never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub title: String,
    pub service_ids: Vec<Uuid>,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    pub updates: Vec<IncidentUpdate>,
    pub started_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Incident {
    /// Materialize a draft as an investigating incident with an initial
    /// update-log entry.
    pub fn from_draft(draft: IncidentDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            service_ids: draft.service_ids,
            severity: draft.severity,
            status: IncidentStatus::Investigating,
            updates: vec![IncidentUpdate {
                message: "Incident opened from correlated alerts".to_string(),
                status: IncidentStatus::Investigating,
                timestamp: now,
                author: "uptimed".to_string(),
            }],
            started_at: draft.started_at,
            resolved_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.status, IncidentStatus::Resolved)
    }

    /// Append an update and move the incident to the update's status.
    pub fn add_update(&mut self, update: IncidentUpdate) {
        self.status = update.status;
        if update.status == IncidentStatus::Resolved {
            self.resolved_at = Some(update.timestamp);
        }
        self.updates.push(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(AlertSeverity::Warning < AlertSeverity::Critical);
        assert!(AlertSeverity::Critical < AlertSeverity::Down);
    }

    #[test]
    fn open_states() {
        let draft = AlertDraft {
            service_id: Uuid::new_v4(),
            check_id: Uuid::new_v4(),
            severity: AlertSeverity::Warning,
            metric: AlertMetric::Custom,
            value: serde_json::json!("err"),
            message: "err".into(),
        };
        let mut alert = Alert::from_draft(draft, Utc::now());
        assert!(alert.is_open());

        alert.status = AlertStatus::Acknowledged;
        assert!(alert.is_open());

        alert.status = AlertStatus::Resolved;
        assert!(!alert.is_open());
    }

    #[test]
    fn incident_updates_are_appended() {
        let draft = IncidentDraft {
            title: "Multiple services down".into(),
            service_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            severity: IncidentSeverity::Critical,
            started_at: Utc::now(),
        };
        let mut incident = Incident::from_draft(draft, Utc::now());
        assert_eq!(incident.status, IncidentStatus::Investigating);
        assert_eq!(incident.updates.len(), 1);

        incident.add_update(IncidentUpdate {
            message: "Root cause identified".into(),
            status: IncidentStatus::Identified,
            timestamp: Utc::now(),
            author: "oncall".into(),
        });
        assert_eq!(incident.status, IncidentStatus::Identified);
        assert_eq!(incident.updates.len(), 2);
        assert!(incident.is_open());

        incident.add_update(IncidentUpdate {
            message: "Fixed".into(),
            status: IncidentStatus::Resolved,
            timestamp: Utc::now(),
            author: "oncall".into(),
        });
        assert!(!incident.is_open());
        assert!(incident.resolved_at.is_some());
    }
}
