//! Data models for the health-check system.
//!
//! This module contains the core data structures used for monitoring external
//! services: the service definition, per-protocol check parameters, alert
//! thresholds, and the normalized outcome produced by every probe.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::errors::{Error, Result};

/// The protocol used to check a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    /// HTTP(S) request with status/content validation
    Http,
    /// ICMP echo via the OS ping binary
    Ping,
    /// TCP connect to the port from the target URL
    Tcp,
    /// Hostname resolution
    Dns,
    /// TCP connect to the explicitly configured `port`
    Port,
    /// TLS handshake and certificate expiry inspection
    Ssl,
    /// External command execution
    Custom,
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckType::Http => "http",
            CheckType::Ping => "ping",
            CheckType::Tcp => "tcp",
            CheckType::Dns => "dns",
            CheckType::Port => "port",
            CheckType::Ssl => "ssl",
            CheckType::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

/// Normalized health state of a service, as derived from its latest check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Reachable and within all thresholds
    Healthy,
    /// Reachable but slower than the warning threshold
    Degraded,
    /// Reachable but anomalous (unexpected status, missing content, cert expiring)
    Warning,
    /// Slower than the critical threshold, or certificate about to expire
    Critical,
    /// Unreachable or failing outright
    Down,
    /// Not yet checked
    Pending,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Down => "down",
            HealthStatus::Pending => "pending",
        };
        write!(f, "{s}")
    }
}

/// Response-time thresholds for a service, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTimeThresholds {
    /// Latency at or above this value classifies the check as degraded
    pub warning_ms: u64,
    /// Latency at or above this value classifies the check as critical
    pub critical_ms: u64,
}

/// Availability thresholds for a service, in percent.
///
/// No prober emits availability directly; these apply to alerts computed over
/// check history by an external producer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityThresholds {
    pub warning_pct: f64,
    pub critical_pct: f64,
}

/// Per-service alert thresholds. All thresholds are optional; absent
/// thresholds skip the corresponding severity escalation entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<ResponseTimeThresholds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<AvailabilityThresholds>,
}

/// A monitored service.
///
/// Carries the target address, the check protocol, protocol-specific
/// parameters, and the alert thresholds. The runner updates `status` and
/// `last_check` after every probe; everything else is configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Unique identifier for the service
    pub id: Uuid,
    /// Human-readable name
    pub name: String,
    /// Target address. A full URL for HTTP/SSL checks; a URL or bare
    /// hostname for the other protocols.
    pub url: String,
    /// The protocol used to check this service
    pub check_type: CheckType,
    /// Seconds between checks
    pub interval_secs: u64,
    /// Per-probe timeout, in seconds
    pub timeout_secs: u64,
    /// HTTP method for http checks (defaults to GET)
    pub http_method: Option<String>,
    /// Extra request headers for http checks
    pub request_headers: HashMap<String, String>,
    /// Expected HTTP status code; any other code is a warning. When unset,
    /// any 2xx code is accepted.
    pub expected_status_code: Option<u16>,
    /// Substring that must appear in the response body
    pub expected_response_content: Option<String>,
    /// Whether the HTTP client follows redirects
    pub follow_redirects: bool,
    /// Whether the HTTP client verifies TLS certificates
    pub verify_ssl: bool,
    /// Port for port checks; also overrides the URL port for tcp/ssl checks
    pub port: Option<u16>,
    /// Command (argv vector) for custom checks
    pub command: Option<Vec<String>>,
    /// Alert thresholds applied by the status classifier
    pub alert_thresholds: AlertThresholds,
    /// Health state derived from the most recent check
    pub status: HealthStatus,
    /// When the service was last checked
    pub last_check: Option<DateTime<Utc>>,
    /// Paused services are skipped by the runner
    pub paused: bool,
}

impl Service {
    /// Create a service with default check parameters (60s interval, 10s
    /// timeout, redirects followed, TLS verified, no thresholds).
    pub fn new(name: impl Into<String>, url: impl Into<String>, check_type: CheckType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            url: url.into(),
            check_type,
            interval_secs: 60,
            timeout_secs: 10,
            http_method: None,
            request_headers: HashMap::new(),
            expected_status_code: None,
            expected_response_content: None,
            follow_redirects: true,
            verify_ssl: true,
            port: None,
            command: None,
            alert_thresholds: AlertThresholds::default(),
            status: HealthStatus::Pending,
            last_check: None,
            paused: false,
        }
    }

    /// Per-probe timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether this service is due for a check at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if self.paused {
            return false;
        }
        match self.last_check {
            Some(last) => now - last >= chrono::Duration::seconds(self.interval_secs as i64),
            None => true,
        }
    }

    /// Extract the hostname from the target address.
    ///
    /// Accepts full URLs (`https://example.com/health`), `host:port` pairs,
    /// and bare hostnames.
    pub fn target_host(&self) -> Result<String> {
        if let Ok(url) = Url::parse(&self.url) {
            if let Some(host) = url.host_str() {
                return Ok(host.trim_matches(|c| c == '[' || c == ']').to_string());
            }
        }
        // "localhost:6379" parses as a URL with scheme "localhost" and no
        // host, so bare targets land here.
        let bare = self.url.split('/').next().unwrap_or(&self.url);
        let host = bare.split(':').next().unwrap_or(bare);
        if host.is_empty() {
            return Err(Error::InvalidCheck {
                service: self.name.clone(),
                reason: format!("no host in target `{}`", self.url),
            });
        }
        Ok(host.to_string())
    }

    /// Extract the port from the target address, if one is present or implied
    /// by the URL scheme.
    pub fn target_port(&self) -> Option<u16> {
        if let Ok(url) = Url::parse(&self.url) {
            if url.host_str().is_some() {
                return url.port_or_known_default();
            }
        }
        let bare = self.url.split('/').next().unwrap_or(&self.url);
        bare.split(':').nth(1).and_then(|p| p.parse().ok())
    }
}

/// Protocol-specific measurements attached to a check outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckMetadata {
    /// HTTP status code received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// HTTP response body size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_size: Option<u64>,
    /// Certificate validity window start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_not_before: Option<DateTime<Utc>>,
    /// Certificate validity window end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_not_after: Option<DateTime<Utc>>,
    /// Whole days until the certificate expires (negative once expired)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_expiry: Option<i64>,
    /// Packet loss percentage reported by ping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_loss_pct: Option<f64>,
    /// Addresses the hostname resolved to
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resolved_addrs: Vec<String>,
    /// Port the probe connected to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// The normalized result of a single probe.
///
/// Immutable once produced. Probers never fail past their boundary: transport
/// errors become a `Down` outcome with the error message attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Health state derived from the measurements
    pub status: HealthStatus,
    /// Elapsed time of the probe in milliseconds
    pub response_time_ms: u64,
    /// What went wrong, for any non-healthy state
    pub error: Option<String>,
    /// Protocol-specific measurements
    pub metadata: CheckMetadata,
    /// When the probe completed
    pub timestamp: DateTime<Utc>,
}

impl CheckOutcome {
    /// A `Down` outcome for a failed probe.
    pub fn down(error: impl Into<String>, response_time_ms: u64, metadata: CheckMetadata) -> Self {
        Self {
            status: HealthStatus::Down,
            response_time_ms,
            error: Some(error.into()),
            metadata,
            timestamp: Utc::now(),
        }
    }
}

/// A persisted check result referencing its service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    /// Unique identifier for this check
    pub id: Uuid,
    /// The service that was checked
    pub service_id: Uuid,
    /// The probe result
    pub outcome: CheckOutcome,
}
