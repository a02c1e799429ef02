//! Status classification for raw probe measurements.
//!
//! The classifier is a pure function over a [`Measurement`] and the service's
//! optional response-time thresholds. Precedence, first match wins:
//!
//! 1. explicit failure → `Down`
//! 2. anomaly (unexpected status code, missing content) → `Warning`
//! 3. latency at or above the critical threshold → `Critical`
//! 4. latency at or above the warning threshold → `Degraded`
//! 5. otherwise → `Healthy`
//!
//! Absent thresholds skip steps 3 and 4, so a service with no thresholds can
//! only ever be `Down`, `Warning`, or `Healthy`.

use crate::probes::models::{CheckMetadata, CheckOutcome, HealthStatus, ResponseTimeThresholds};
use chrono::Utc;

/// Raw measurements from a single probe, before classification.
#[derive(Debug, Clone, Default)]
pub struct Measurement {
    /// Transport-level failure (unreachable, timeout, refused)
    pub failure: Option<String>,
    /// Reachable but anomalous (wrong status code, missing expected content)
    pub anomaly: Option<String>,
    /// Measured latency in milliseconds
    pub latency_ms: u64,
}

/// Map a measurement and optional thresholds to a health status.
pub fn classify(measurement: &Measurement, thresholds: Option<&ResponseTimeThresholds>) -> HealthStatus {
    if measurement.failure.is_some() {
        return HealthStatus::Down;
    }
    if measurement.anomaly.is_some() {
        return HealthStatus::Warning;
    }
    if let Some(t) = thresholds {
        // Critical takes precedence even when the thresholds are inverted
        // (warning configured above critical).
        if measurement.latency_ms >= t.critical_ms {
            return HealthStatus::Critical;
        }
        if measurement.latency_ms >= t.warning_ms {
            return HealthStatus::Degraded;
        }
    }
    HealthStatus::Healthy
}

/// Build a full [`CheckOutcome`] from a measurement.
///
/// Classifies the measurement and attaches the matching error message:
/// the failure text for `Down`, the anomaly text for `Warning`, and a
/// response-time message for threshold breaches. The error text is what the
/// alert generator later inspects to infer the alert metric.
pub fn outcome(
    measurement: Measurement,
    thresholds: Option<&ResponseTimeThresholds>,
    metadata: CheckMetadata,
) -> CheckOutcome {
    let status = classify(&measurement, thresholds);
    let error = match (status, thresholds) {
        (HealthStatus::Down, _) => measurement.failure,
        (HealthStatus::Warning, _) => measurement.anomaly,
        (HealthStatus::Critical, Some(t)) => Some(format!(
            "Response time {}ms exceeds the critical threshold ({}ms)",
            measurement.latency_ms, t.critical_ms
        )),
        (HealthStatus::Degraded, Some(t)) => Some(format!(
            "Response time {}ms exceeds the warning threshold ({}ms)",
            measurement.latency_ms, t.warning_ms
        )),
        _ => None,
    };

    CheckOutcome {
        status,
        response_time_ms: measurement.latency_ms,
        error,
        metadata,
        timestamp: Utc::now(),
    }
}
