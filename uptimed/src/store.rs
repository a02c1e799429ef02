//! The persistence seam.
//!
//! Persistence is an external collaborator: the runner reads and writes
//! services, checks, alerts, and incidents through the [`Store`] trait and
//! never touches a backend directly. The in-memory implementation backs the
//! daemon and the tests; a database-backed store plugs in behind the same
//! trait.
//!
//! Access is read-then-write with no optimistic concurrency control. The
//! design assumes a single runner invocation at a time, enforced by the
//! scheduling layer rather than by locking here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::alerts::models::{Alert, AlertDraft, AlertStatus, Incident, IncidentDraft};
use crate::errors::{Error, Result};
use crate::probes::models::{CheckOutcome, CheckRecord, HealthStatus, Service};

/// Data access for the monitoring core.
#[async_trait]
pub trait Store: Send + Sync {
    /// All configured services.
    async fn list_services(&self) -> Result<Vec<Service>>;

    /// Record the result of a check against a service.
    async fn record_check(&self, service_id: Uuid, outcome: CheckOutcome) -> Result<CheckRecord>;

    /// Update a service's derived status and last-check timestamp.
    async fn update_service_check(
        &self,
        service_id: Uuid,
        status: HealthStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Open (pending or acknowledged) alerts for one service.
    async fn open_alerts_for_service(&self, service_id: Uuid) -> Result<Vec<Alert>>;

    /// Open alerts across all services created at or after `since`.
    async fn open_alerts_since(&self, since: DateTime<Utc>) -> Result<Vec<Alert>>;

    /// Persist a draft as a pending alert.
    async fn insert_alert(&self, draft: AlertDraft) -> Result<Alert>;

    /// Move an alert to resolved.
    async fn resolve_alert(&self, alert_id: Uuid, resolved_at: DateTime<Utc>) -> Result<()>;

    /// Persist a draft as an investigating incident.
    async fn insert_incident(&self, draft: IncidentDraft) -> Result<Incident>;

    /// Whether any incident is currently unresolved.
    async fn has_open_incident(&self) -> Result<bool>;
}

#[derive(Default)]
struct MemoryState {
    services: HashMap<Uuid, Service>,
    checks: Vec<CheckRecord>,
    alerts: HashMap<Uuid, Alert>,
    incidents: HashMap<Uuid, Incident>,
}

/// In-memory store backing the daemon and the tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the configured services. Replaces any previous set.
    pub async fn seed_services(&self, services: Vec<Service>) {
        let mut state = self.inner.write().await;
        state.services = services.into_iter().map(|s| (s.id, s)).collect();
    }

    /// Snapshot of all alerts, newest last.
    pub async fn alerts(&self) -> Vec<Alert> {
        let state = self.inner.read().await;
        let mut alerts: Vec<Alert> = state.alerts.values().cloned().collect();
        alerts.sort_by_key(|a| a.created_at);
        alerts
    }

    /// Snapshot of all incidents.
    pub async fn incidents(&self) -> Vec<Incident> {
        let state = self.inner.read().await;
        state.incidents.values().cloned().collect()
    }

    /// Check history for one service, oldest first.
    pub async fn checks_for(&self, service_id: Uuid) -> Vec<CheckRecord> {
        let state = self.inner.read().await;
        state.checks.iter().filter(|c| c.service_id == service_id).cloned().collect()
    }

    /// Current state of one service.
    pub async fn service(&self, service_id: Uuid) -> Option<Service> {
        let state = self.inner.read().await;
        state.services.get(&service_id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_services(&self) -> Result<Vec<Service>> {
        let state = self.inner.read().await;
        let mut services: Vec<Service> = state.services.values().cloned().collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn record_check(&self, service_id: Uuid, outcome: CheckOutcome) -> Result<CheckRecord> {
        let record = CheckRecord {
            id: Uuid::new_v4(),
            service_id,
            outcome,
        };
        let mut state = self.inner.write().await;
        state.checks.push(record.clone());
        Ok(record)
    }

    async fn update_service_check(
        &self,
        service_id: Uuid,
        status: HealthStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.inner.write().await;
        let service = state.services.get_mut(&service_id).ok_or_else(|| Error::NotFound {
            resource: "Service".into(),
            id: service_id.to_string(),
        })?;
        service.status = status;
        service.last_check = Some(checked_at);
        Ok(())
    }

    async fn open_alerts_for_service(&self, service_id: Uuid) -> Result<Vec<Alert>> {
        let state = self.inner.read().await;
        let mut alerts: Vec<Alert> = state
            .alerts
            .values()
            .filter(|a| a.service_id == service_id && a.is_open())
            .cloned()
            .collect();
        alerts.sort_by_key(|a| a.created_at);
        Ok(alerts)
    }

    async fn open_alerts_since(&self, since: DateTime<Utc>) -> Result<Vec<Alert>> {
        let state = self.inner.read().await;
        let mut alerts: Vec<Alert> = state
            .alerts
            .values()
            .filter(|a| a.is_open() && a.created_at >= since)
            .cloned()
            .collect();
        alerts.sort_by_key(|a| a.created_at);
        Ok(alerts)
    }

    async fn insert_alert(&self, draft: AlertDraft) -> Result<Alert> {
        let alert = Alert::from_draft(draft, Utc::now());
        let mut state = self.inner.write().await;
        state.alerts.insert(alert.id, alert.clone());
        Ok(alert)
    }

    async fn resolve_alert(&self, alert_id: Uuid, resolved_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.inner.write().await;
        let alert = state.alerts.get_mut(&alert_id).ok_or_else(|| Error::NotFound {
            resource: "Alert".into(),
            id: alert_id.to_string(),
        })?;
        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(resolved_at);
        Ok(())
    }

    async fn insert_incident(&self, draft: IncidentDraft) -> Result<Incident> {
        let incident = Incident::from_draft(draft, Utc::now());
        let mut state = self.inner.write().await;
        state.incidents.insert(incident.id, incident.clone());
        Ok(incident)
    }

    async fn has_open_incident(&self) -> Result<bool> {
        let state = self.inner.read().await;
        Ok(state.incidents.values().any(|i| i.is_open()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::models::{AlertMetric, AlertSeverity};
    use crate::probes::models::{CheckMetadata, CheckType};

    fn draft(service_id: Uuid) -> AlertDraft {
        AlertDraft {
            service_id,
            check_id: Uuid::new_v4(),
            severity: AlertSeverity::Warning,
            metric: AlertMetric::Custom,
            value: serde_json::json!("x"),
            message: "x".into(),
        }
    }

    #[tokio::test]
    async fn update_service_check_mutates_status() {
        let store = MemoryStore::new();
        let service = Service::new("web", "https://example.com", CheckType::Http);
        let id = service.id;
        store.seed_services(vec![service]).await;

        let now = Utc::now();
        store.update_service_check(id, HealthStatus::Healthy, now).await.unwrap();

        let service = store.service(id).await.unwrap();
        assert_eq!(service.status, HealthStatus::Healthy);
        assert_eq!(service.last_check, Some(now));
    }

    #[tokio::test]
    async fn unknown_service_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_service_check(Uuid::new_v4(), HealthStatus::Healthy, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn resolved_alerts_leave_the_open_set() {
        let store = MemoryStore::new();
        let service_id = Uuid::new_v4();

        let alert = store.insert_alert(draft(service_id)).await.unwrap();
        assert_eq!(store.open_alerts_for_service(service_id).await.unwrap().len(), 1);

        store.resolve_alert(alert.id, Utc::now()).await.unwrap();
        assert!(store.open_alerts_for_service(service_id).await.unwrap().is_empty());

        let stored = store.alerts().await;
        assert_eq!(stored[0].status, AlertStatus::Resolved);
        assert!(stored[0].resolved_at.is_some());
    }

    #[tokio::test]
    async fn open_alerts_since_filters_by_time() {
        let store = MemoryStore::new();
        store.insert_alert(draft(Uuid::new_v4())).await.unwrap();

        let future = Utc::now() + chrono::Duration::minutes(5);
        assert!(store.open_alerts_since(future).await.unwrap().is_empty());

        let past = Utc::now() - chrono::Duration::minutes(5);
        assert_eq!(store.open_alerts_since(past).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn record_check_keeps_history() {
        let store = MemoryStore::new();
        let service_id = Uuid::new_v4();
        let outcome = CheckOutcome::down("boom", 12, CheckMetadata::default());

        let record = store.record_check(service_id, outcome.clone()).await.unwrap();
        assert_eq!(record.service_id, service_id);

        let history = store.checks_for(service_id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome, outcome);
    }
}
