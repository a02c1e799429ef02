//! Alert generation, deduplication, and auto-resolution.
//!
//! All decisions here are pure functions over immutable snapshots: the
//! service (with its thresholds), the fresh check outcome, and the currently
//! open alerts. Ambiguity defaults to the conservative choice: create the
//! alert rather than silently drop it.

use uuid::Uuid;

use crate::alerts::models::{Alert, AlertDraft, AlertMetric, AlertSeverity};
use crate::probes::models::{CheckOutcome, HealthStatus, Service};

/// Turn a non-healthy outcome into a candidate alert.
///
/// Returns `None` for healthy and pending outcomes. Severity maps from the
/// outcome status (down → down, critical → critical, warning/degraded →
/// warning); the metric is inferred from the outcome's error text.
pub fn generate_alert(service: &Service, check_id: Uuid, outcome: &CheckOutcome) -> Option<AlertDraft> {
    let severity = match outcome.status {
        HealthStatus::Healthy | HealthStatus::Pending => return None,
        HealthStatus::Down => AlertSeverity::Down,
        HealthStatus::Critical => AlertSeverity::Critical,
        HealthStatus::Warning | HealthStatus::Degraded => AlertSeverity::Warning,
    };

    let error = outcome.error.as_deref().unwrap_or("");
    let metric = infer_metric(error);
    let value = match metric {
        AlertMetric::ResponseTime => serde_json::json!(outcome.response_time_ms),
        _ if !error.is_empty() => serde_json::json!(error),
        _ => serde_json::json!(outcome.status.to_string()),
    };
    let description = if error.is_empty() {
        format!("service is {}", outcome.status)
    } else {
        error.to_string()
    };

    Some(AlertDraft {
        service_id: service.id,
        check_id,
        severity,
        metric,
        value,
        message: format!("{}: {description}", service.name),
    })
}

/// Infer the alert metric from known markers in the error text.
fn infer_metric(error: &str) -> AlertMetric {
    let error = error.to_ascii_lowercase();
    if error.contains("status code") {
        AlertMetric::StatusCode
    } else if error.contains("response time") {
        AlertMetric::ResponseTime
    } else if error.contains("ssl") || error.contains("certificate") {
        AlertMetric::Ssl
    } else {
        AlertMetric::Custom
    }
}

fn open_for<'a>(open_alerts: &'a [Alert], draft: &AlertDraft) -> Option<&'a Alert> {
    open_alerts
        .iter()
        .find(|a| a.is_open() && a.service_id == draft.service_id && a.metric == draft.metric)
}

/// Decide whether a draft becomes a new alert row.
///
/// No open alert for the (service, metric) pair → create. An open alert at a
/// different severity → create (the severity change is modeled as a new
/// alert; see [`superseded_alert`]). Matching severity → suppress, the
/// condition is a continuation of the existing alert.
pub fn should_create_new_alert(open_alerts: &[Alert], draft: &AlertDraft) -> bool {
    match open_for(open_alerts, draft) {
        None => true,
        Some(existing) => existing.severity != draft.severity,
    }
}

/// The stale open alert a new draft replaces, if the draft is being created
/// because the severity changed. The runner resolves it in the same pass it
/// inserts the replacement, keeping at most one open alert per
/// (service, metric) pair.
pub fn superseded_alert<'a>(open_alerts: &'a [Alert], draft: &AlertDraft) -> Option<&'a Alert> {
    open_for(open_alerts, draft).filter(|existing| existing.severity != draft.severity)
}

/// Decide whether a fresh outcome closes an open alert.
///
/// Any metric resolves on a fully healthy outcome. Response-time alerts also
/// resolve once the measured latency falls back under the warning threshold,
/// even if the overall status is not healthy (e.g. a status-code warning is
/// now the dominant condition).
pub fn should_auto_resolve(alert: &Alert, service: &Service, outcome: &CheckOutcome) -> bool {
    if !alert.is_open() {
        return false;
    }
    if outcome.status == HealthStatus::Healthy {
        return true;
    }
    if alert.metric == AlertMetric::ResponseTime {
        if let Some(t) = &service.alert_thresholds.response_time {
            return outcome.response_time_ms < t.warning_ms;
        }
    }
    false
}
