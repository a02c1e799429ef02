//! DNS resolution prober.
//!
//! Resolves the target hostname through the system resolver and classifies
//! the resolution latency. The resolved addresses are carried in the outcome
//! metadata.

use std::time::Instant;

use async_trait::async_trait;

use crate::errors::Result;
use crate::probes::classify::{self, Measurement};
use crate::probes::models::{CheckMetadata, CheckOutcome, Service};
use crate::probes::prober::{Prober, elapsed_ms};

pub struct DnsProber;

#[async_trait]
impl Prober for DnsProber {
    async fn probe(&self, service: &Service) -> Result<CheckOutcome> {
        let host = service.target_host()?;

        let start = Instant::now();
        let resolved = tokio::time::timeout(service.timeout(), tokio::net::lookup_host((host.as_str(), 0u16))).await;
        let latency_ms = elapsed_ms(start);

        let addrs: Vec<String> = match resolved {
            Ok(Ok(addrs)) => addrs.map(|addr| addr.ip().to_string()).collect(),
            Ok(Err(e)) => {
                return Ok(CheckOutcome::down(
                    format!("DNS resolution of {host} failed: {e}"),
                    latency_ms,
                    CheckMetadata::default(),
                ));
            }
            Err(_) => {
                return Ok(CheckOutcome::down(
                    format!("DNS resolution of {host} timed out after {}s", service.timeout_secs),
                    latency_ms,
                    CheckMetadata::default(),
                ));
            }
        };

        if addrs.is_empty() {
            return Ok(CheckOutcome::down(
                format!("DNS resolution of {host} returned no addresses"),
                latency_ms,
                CheckMetadata::default(),
            ));
        }

        Ok(classify::outcome(
            Measurement {
                failure: None,
                anomaly: None,
                latency_ms,
            },
            service.alert_thresholds.response_time.as_ref(),
            CheckMetadata {
                resolved_addrs: addrs,
                ..Default::default()
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::models::{CheckType, HealthStatus};

    #[tokio::test]
    async fn localhost_resolves() {
        let service = Service::new("loopback", "localhost", CheckType::Dns);
        let outcome = DnsProber.probe(&service).await.unwrap();

        assert_eq!(outcome.status, HealthStatus::Healthy);
        assert!(!outcome.metadata.resolved_addrs.is_empty());
    }

    #[tokio::test]
    async fn unresolvable_host_is_down() {
        // .invalid is reserved and never resolves (RFC 2606)
        let service = Service::new("ghost", "does-not-exist.invalid", CheckType::Dns);
        let outcome = DnsProber.probe(&service).await.unwrap();

        assert_eq!(outcome.status, HealthStatus::Down);
        assert!(outcome.error.as_deref().unwrap().contains("does-not-exist.invalid"));
    }
}
