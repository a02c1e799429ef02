//! The check runner daemon.
//!
//! A single background task that periodically gathers due services and probes
//! them one at a time: probe → classify → persist → auto-resolve → alert
//! generation and deduplication, then one incident-correlation pass over the
//! batch. Probing is deliberately sequential to avoid overwhelming target
//! hosts; the protection against a slow batch is the configurable wall-clock
//! deadline, checked between services, not parallelism.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::alerts::engine;
use crate::alerts::incidents;
use crate::config::SchedulerConfig;
use crate::errors::Result;
use crate::notifications::Notifier;
use crate::probes::models::Service;
use crate::probes::prober::ProbeExecutor;
use crate::store::Store;

/// What one batch did, for logging.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Services probed this batch
    pub probed: usize,
    /// New alerts created
    pub alerts_created: usize,
    /// Alerts auto-resolved or superseded
    pub alerts_resolved: usize,
}

/// The periodic check runner.
pub struct Runner<S: Store> {
    store: Arc<S>,
    executor: ProbeExecutor,
    notifier: Notifier,
    settings: SchedulerConfig,
}

impl<S: Store> Runner<S> {
    pub fn new(store: Arc<S>, settings: SchedulerConfig, notifier: Notifier) -> Self {
        Self {
            store,
            executor: ProbeExecutor::new(),
            notifier,
            settings,
        }
    }

    /// Run the daemon until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            tick_interval = ?self.settings.tick_interval,
            batch_deadline = ?self.settings.batch_deadline,
            "Starting check runner"
        );

        let mut interval = tokio::time::interval(self.settings.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.cancelled() => {
                    tracing::info!("Check runner shutting down");
                    return;
                }
            }

            match self.run_batch().await {
                Ok(report) if report.probed > 0 => {
                    tracing::debug!(
                        probed = report.probed,
                        alerts_created = report.alerts_created,
                        alerts_resolved = report.alerts_resolved,
                        "Batch complete"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Batch failed: {e:#}"),
            }
        }
    }

    /// Probe every due service, sequentially, then correlate incidents.
    ///
    /// The batch deadline is enforced between services, never inside one: a
    /// service's probe-persist-alert pipeline always runs to completion, so
    /// a superseded alert is never resolved without its replacement landing.
    /// Services still queued when the deadline passes wait for the next tick.
    pub async fn run_batch(&self) -> Result<BatchReport> {
        let deadline = tokio::time::Instant::now() + self.settings.batch_deadline;
        let now = Utc::now();
        let services = self.store.list_services().await?;
        let due: Vec<_> = services.iter().filter(|s| s.is_due(now)).collect();
        let mut report = BatchReport::default();

        for (position, service) in due.iter().enumerate() {
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(
                    deadline = ?self.settings.batch_deadline,
                    deferred = due.len() - position,
                    "Batch deadline reached, deferring remaining services to the next tick"
                );
                break;
            }
            match self.check_service(service).await {
                Ok((created, resolved)) => {
                    report.probed += 1;
                    report.alerts_created += created;
                    report.alerts_resolved += resolved;
                }
                // A bad check definition shouldn't stall the rest of the batch
                Err(e) => tracing::error!(service = %service.name, "Check failed: {e:#}"),
            }
        }

        self.correlate_incidents().await?;
        Ok(report)
    }

    /// Run the full pipeline for one service. Returns
    /// (alerts created, alerts resolved).
    async fn check_service(&self, service: &Service) -> Result<(usize, usize)> {
        let outcome = self.executor.execute(service).await?;
        tracing::debug!(
            service = %service.name,
            check_type = %service.check_type,
            status = %outcome.status,
            response_time_ms = outcome.response_time_ms,
            error = ?outcome.error,
            "Probe complete"
        );

        let record = self.store.record_check(service.id, outcome.clone()).await?;
        self.store
            .update_service_check(service.id, outcome.status, outcome.timestamp)
            .await?;

        let mut resolved = 0;
        for alert in self.store.open_alerts_for_service(service.id).await? {
            if engine::should_auto_resolve(&alert, service, &outcome) {
                self.store.resolve_alert(alert.id, Utc::now()).await?;
                self.notifier.alert_resolved(service, &alert);
                resolved += 1;
            }
        }

        let mut created = 0;
        if let Some(draft) = engine::generate_alert(service, record.id, &outcome) {
            // Re-read after the auto-resolve pass so the dedup decision sees
            // the current open set
            let open = self.store.open_alerts_for_service(service.id).await?;
            if engine::should_create_new_alert(&open, &draft) {
                if let Some(stale) = engine::superseded_alert(&open, &draft) {
                    self.store.resolve_alert(stale.id, Utc::now()).await?;
                    self.notifier.alert_superseded(service, stale);
                    resolved += 1;
                }
                let alert = self.store.insert_alert(draft).await?;
                self.notifier.alert_created(service, &alert);
                created += 1;
            }
        }

        Ok((created, resolved))
    }

    /// One correlation pass over the recent open alerts. Skipped while an
    /// incident is already open, so a sustained outage produces one incident
    /// rather than one per tick.
    async fn correlate_incidents(&self) -> Result<()> {
        if self.store.has_open_incident().await? {
            return Ok(());
        }

        let window = chrono::Duration::minutes(self.settings.correlation_window_minutes);
        let open = self.store.open_alerts_since(Utc::now() - window).await?;
        if let Some(draft) = incidents::group_alerts_into_incident(&open, self.settings.correlation_window_minutes) {
            let incident = self.store.insert_incident(draft).await?;
            self.notifier.incident_created(&incident);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::models::{AlertDraft, AlertMetric, AlertSeverity, AlertStatus, IncidentStatus};
    use crate::probes::models::{CheckType, HealthStatus, ResponseTimeThresholds, Service};
    use crate::store::MemoryStore;
    use std::time::Duration;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn runner(store: Arc<MemoryStore>) -> Runner<MemoryStore> {
        Runner::new(store, SchedulerConfig::default(), Notifier::new())
    }

    async fn mock_server(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    fn http_service(server: &MockServer) -> Service {
        Service::new("api", format!("{}/health", server.uri()), CheckType::Http)
    }

    #[test_log::test(tokio::test)]
    async fn healthy_service_produces_no_alerts() {
        let server = mock_server(ResponseTemplate::new(200).set_body_string("OK")).await;
        let store = Arc::new(MemoryStore::new());
        let service = http_service(&server);
        let service_id = service.id;
        store.seed_services(vec![service]).await;

        let report = runner(store.clone()).run_batch().await.unwrap();
        assert_eq!(report.probed, 1);
        assert_eq!(report.alerts_created, 0);

        assert!(store.alerts().await.is_empty());
        assert_eq!(store.checks_for(service_id).await.len(), 1);
        assert_eq!(store.service(service_id).await.unwrap().status, HealthStatus::Healthy);
    }

    #[test_log::test(tokio::test)]
    async fn slow_service_opens_a_response_time_alert_once() {
        let server = mock_server(
            ResponseTemplate::new(200)
                .set_body_string("OK")
                .set_delay(Duration::from_millis(200)),
        )
        .await;
        let store = Arc::new(MemoryStore::new());
        let mut service = http_service(&server);
        service.alert_thresholds.response_time = Some(ResponseTimeThresholds {
            warning_ms: 20,
            critical_ms: 100,
        });
        let service_id = service.id;
        store.seed_services(vec![service]).await;
        let runner = runner(store.clone());

        let report = runner.run_batch().await.unwrap();
        assert_eq!(report.alerts_created, 1);

        let alerts = store.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[0].metric, AlertMetric::ResponseTime);
        assert_eq!(alerts[0].service_id, service_id);

        // The same condition on the next tick is a continuation, not a new row
        store
            .update_service_check(service_id, HealthStatus::Critical, Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        let report = runner.run_batch().await.unwrap();
        assert_eq!(report.alerts_created, 0);
        assert_eq!(store.alerts().await.len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn recovery_auto_resolves_open_alerts() {
        let server = mock_server(ResponseTemplate::new(200).set_body_string("OK")).await;
        let store = Arc::new(MemoryStore::new());
        let service = http_service(&server);
        let service_id = service.id;
        store.seed_services(vec![service]).await;

        store
            .insert_alert(AlertDraft {
                service_id,
                check_id: Uuid::new_v4(),
                severity: AlertSeverity::Down,
                metric: AlertMetric::Custom,
                value: serde_json::json!("Connection refused"),
                message: "api: Connection refused".into(),
            })
            .await
            .unwrap();

        let report = runner(store.clone()).run_batch().await.unwrap();
        assert_eq!(report.alerts_resolved, 1);
        assert_eq!(report.alerts_created, 0);

        let alerts = store.alerts().await;
        assert_eq!(alerts[0].status, AlertStatus::Resolved);
    }

    #[test_log::test(tokio::test)]
    async fn two_down_services_form_one_critical_incident() {
        let store = Arc::new(MemoryStore::new());
        // Port 1 on loopback refuses immediately
        let mut a = Service::new("api", "http://127.0.0.1:1/health", CheckType::Http);
        a.timeout_secs = 2;
        let mut b = Service::new("web", "http://127.0.0.1:1/", CheckType::Http);
        b.timeout_secs = 2;
        let (a_id, b_id) = (a.id, b.id);
        store.seed_services(vec![a, b]).await;
        let runner = runner(store.clone());

        let report = runner.run_batch().await.unwrap();
        assert_eq!(report.probed, 2);
        assert_eq!(report.alerts_created, 2);

        let incidents = store.incidents().await;
        assert_eq!(incidents.len(), 1);
        let incident = &incidents[0];
        assert_eq!(incident.severity, crate::alerts::models::IncidentSeverity::Critical);
        assert_eq!(incident.status, IncidentStatus::Investigating);
        assert!(incident.service_ids.contains(&a_id));
        assert!(incident.service_ids.contains(&b_id));

        // Still down on the next tick: no second incident while one is open
        for id in [a_id, b_id] {
            store
                .update_service_check(id, HealthStatus::Down, Utc::now() - chrono::Duration::hours(1))
                .await
                .unwrap();
        }
        runner.run_batch().await.unwrap();
        assert_eq!(store.incidents().await.len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn severity_escalation_supersedes_the_stale_alert() {
        let server = mock_server(ResponseTemplate::new(500)).await;
        let store = Arc::new(MemoryStore::new());
        let service = http_service(&server);
        let service_id = service.id;
        store.seed_services(vec![service]).await;

        // An older down alert for the same inferred metric (status_code)
        store
            .insert_alert(AlertDraft {
                service_id,
                check_id: Uuid::new_v4(),
                severity: AlertSeverity::Down,
                metric: AlertMetric::StatusCode,
                value: serde_json::json!("Unexpected status code 502"),
                message: "api: Unexpected status code 502".into(),
            })
            .await
            .unwrap();

        let report = runner(store.clone()).run_batch().await.unwrap();
        assert_eq!(report.alerts_created, 1);
        assert_eq!(report.alerts_resolved, 1);

        let alerts = store.alerts().await;
        assert_eq!(alerts.len(), 2);
        let open: Vec<_> = alerts.iter().filter(|a| a.is_open()).collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].severity, AlertSeverity::Warning);
    }

    #[test_log::test(tokio::test)]
    async fn deadline_defers_services_without_splitting_a_pipeline() {
        // Slow enough that the first service alone blows the deadline
        let server = mock_server(
            ResponseTemplate::new(500).set_delay(Duration::from_millis(200)),
        )
        .await;
        let store = Arc::new(MemoryStore::new());
        let a = http_service(&server);
        let b = Service::new("web", format!("{}/health", server.uri()), CheckType::Http);
        let (a_id, b_id) = (a.id, b.id);
        store.seed_services(vec![a, b]).await;

        // Stale down alert the 500 response supersedes with a warning
        store
            .insert_alert(AlertDraft {
                service_id: a_id,
                check_id: Uuid::new_v4(),
                severity: AlertSeverity::Down,
                metric: AlertMetric::StatusCode,
                value: serde_json::json!("Unexpected status code 502"),
                message: "api: Unexpected status code 502".into(),
            })
            .await
            .unwrap();

        let settings = SchedulerConfig {
            batch_deadline: Duration::from_millis(50),
            ..Default::default()
        };
        let runner = Runner::new(store.clone(), settings, Notifier::new());
        let report = runner.run_batch().await.unwrap();

        // The first service's pipeline ran to completion: the stale alert was
        // replaced, not dropped
        assert_eq!(report.probed, 1);
        assert_eq!(report.alerts_created, 1);
        assert_eq!(report.alerts_resolved, 1);
        let open = store.open_alerts_for_service(a_id).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].severity, AlertSeverity::Warning);

        // The second service was deferred untouched
        assert!(store.checks_for(b_id).await.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn paused_services_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let mut service = Service::new("api", "http://127.0.0.1:1/health", CheckType::Http);
        service.paused = true;
        store.seed_services(vec![service]).await;

        let report = runner(store.clone()).run_batch().await.unwrap();
        assert_eq!(report.probed, 0);
        assert!(store.alerts().await.is_empty());
    }
}
