//! TCP connect prober, backing both the `tcp` and `port` check types.
//!
//! The two check types are semantically identical: open a socket to
//! `(host, port)` under the service timeout, treat a successful connect as
//! reachable, and classify the connect latency against the thresholds. They
//! differ only in where the port comes from: `tcp` reads it from the target
//! URL, `port` from the service's explicit `port` field.

use std::time::Instant;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::errors::{Error, Result};
use crate::probes::classify::{self, Measurement};
use crate::probes::models::{CheckMetadata, CheckOutcome, Service};
use crate::probes::prober::{Prober, elapsed_ms};

pub struct TcpProber {
    use_port_field: bool,
}

impl TcpProber {
    /// `use_port_field` selects the `port` check semantics; otherwise the
    /// port is taken from the target URL.
    pub fn new(use_port_field: bool) -> Self {
        Self { use_port_field }
    }

    fn resolve_port(&self, service: &Service) -> Result<u16> {
        let port = if self.use_port_field {
            service.port
        } else {
            service.target_port().or(service.port)
        };
        port.ok_or_else(|| Error::InvalidCheck {
            service: service.name.clone(),
            reason: "no port configured for connect check".into(),
        })
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, service: &Service) -> Result<CheckOutcome> {
        let host = service.target_host()?;
        let port = self.resolve_port(service)?;
        let metadata = CheckMetadata {
            port: Some(port),
            ..Default::default()
        };

        let start = Instant::now();
        match tokio::time::timeout(service.timeout(), TcpStream::connect((host.as_str(), port))).await {
            Ok(Ok(_stream)) => Ok(classify::outcome(
                Measurement {
                    failure: None,
                    anomaly: None,
                    latency_ms: elapsed_ms(start),
                },
                service.alert_thresholds.response_time.as_ref(),
                metadata,
            )),
            Ok(Err(e)) => Ok(CheckOutcome::down(
                format!("Connection to {host}:{port} failed: {e}"),
                elapsed_ms(start),
                metadata,
            )),
            Err(_) => Ok(CheckOutcome::down(
                format!("Connection to {host}:{port} timed out after {}s", service.timeout_secs),
                elapsed_ms(start),
                metadata,
            )),
        }
    }
}
