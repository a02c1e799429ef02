//! The prober trait and the per-protocol dispatcher.

use std::time::Instant;

use async_trait::async_trait;

use crate::errors::Result;
use crate::probes::custom::CommandProber;
use crate::probes::dns::DnsProber;
use crate::probes::http::HttpProber;
use crate::probes::models::{CheckOutcome, CheckType, Service};
use crate::probes::ping::PingProber;
use crate::probes::ssl::SslProber;
use crate::probes::tcp::TcpProber;

/// A single-protocol prober.
///
/// `probe` never fails for transport reasons: network errors, timeouts, and
/// malformed responses are converted into a `Down` outcome with the error
/// message attached. The only `Err` case is an invalid check configuration
/// (wrong target shape, missing port or command), which the runner surfaces
/// instead of recording.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, service: &Service) -> Result<CheckOutcome>;
}

/// Executes checks by dispatching to the prober for the service's check type.
pub struct ProbeExecutor {
    http: HttpProber,
    ping: PingProber,
    tcp: TcpProber,
    port: TcpProber,
    dns: DnsProber,
    ssl: SslProber,
    custom: CommandProber,
}

impl ProbeExecutor {
    pub fn new() -> Self {
        Self {
            http: HttpProber,
            ping: PingProber,
            tcp: TcpProber::new(false),
            port: TcpProber::new(true),
            dns: DnsProber,
            ssl: SslProber,
            custom: CommandProber,
        }
    }

    /// Execute one check against one service.
    pub async fn execute(&self, service: &Service) -> Result<CheckOutcome> {
        let prober: &dyn Prober = match service.check_type {
            CheckType::Http => &self.http,
            CheckType::Ping => &self.ping,
            CheckType::Tcp => &self.tcp,
            CheckType::Port => &self.port,
            CheckType::Dns => &self.dns,
            CheckType::Ssl => &self.ssl,
            CheckType::Custom => &self.custom,
        };
        prober.probe(service).await
    }
}

impl Default for ProbeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Milliseconds elapsed since `start`.
pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
