//! ICMP echo prober.
//!
//! Raw ICMP sockets need elevated privileges, so this prober shells out to
//! the OS `ping` binary (which is setuid or has the net_raw capability on
//! most systems) with a single echo request and the service timeout passed
//! through as the OS-level ping deadline. The reported round-trip time is
//! parsed from the output; the process wall clock is the fallback.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use crate::errors::Result;
use crate::probes::classify::{self, Measurement};
use crate::probes::models::{CheckMetadata, CheckOutcome, Service};
use crate::probes::prober::{Prober, elapsed_ms};

pub struct PingProber;

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, service: &Service) -> Result<CheckOutcome> {
        let target = service.target_host()?;
        let timeout_secs = service.timeout_secs.max(1);

        let start = Instant::now();
        let command = Command::new("ping")
            .arg("-c")
            .arg("1")
            .arg("-W")
            .arg(timeout_secs.to_string())
            .arg(&target)
            .output();

        // Guard above ping's own deadline in case the binary misbehaves
        let output = match tokio::time::timeout(service.timeout() + Duration::from_secs(1), command).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Ok(CheckOutcome::down(
                    format!("Failed to run ping: {e}"),
                    elapsed_ms(start),
                    CheckMetadata::default(),
                ));
            }
            Err(_) => {
                return Ok(CheckOutcome::down(
                    format!("Ping of {target} timed out after {timeout_secs}s"),
                    elapsed_ms(start),
                    CheckMetadata::default(),
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let metadata = CheckMetadata {
            packet_loss_pct: parse_packet_loss(&stdout),
            ..Default::default()
        };

        if !output.status.success() {
            return Ok(CheckOutcome::down(
                format!("Host {target} is unreachable"),
                elapsed_ms(start),
                metadata,
            ));
        }

        let latency_ms = parse_rtt_ms(&stdout).map(|rtt| rtt.round() as u64).unwrap_or_else(|| elapsed_ms(start));

        Ok(classify::outcome(
            Measurement {
                failure: None,
                anomaly: None,
                latency_ms,
            },
            service.alert_thresholds.response_time.as_ref(),
            metadata,
        ))
    }
}

/// Parse the `time=12.3 ms` round-trip from ping output.
fn parse_rtt_ms(output: &str) -> Option<f64> {
    let idx = output.find("time=")?;
    let rest = &output[idx + "time=".len()..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Parse the `N% packet loss` figure from ping output.
fn parse_packet_loss(output: &str) -> Option<f64> {
    let idx = output.find("% packet loss")?;
    let head = &output[..idx];
    let start = head
        .rfind(|c: char| !c.is_ascii_digit() && c != '.')
        .map(|i| i + 1)
        .unwrap_or(0);
    head[start..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PING_OK: &str = "\
PING localhost (127.0.0.1) 56(84) bytes of data.
64 bytes from localhost (127.0.0.1): icmp_seq=1 ttl=64 time=0.045 ms

--- localhost ping statistics ---
1 packets transmitted, 1 received, 0% packet loss, time 0ms
rtt min/avg/max/mdev = 0.045/0.045/0.045/0.000 ms
";

    const PING_LOST: &str = "\
PING 192.0.2.1 (192.0.2.1) 56(84) bytes of data.

--- 192.0.2.1 ping statistics ---
1 packets transmitted, 0 received, 100% packet loss, time 0ms
";

    #[test]
    fn parses_round_trip_time() {
        assert_eq!(parse_rtt_ms(PING_OK), Some(0.045));
        assert_eq!(parse_rtt_ms(PING_LOST), None);
    }

    #[test]
    fn parses_packet_loss() {
        assert_eq!(parse_packet_loss(PING_OK), Some(0.0));
        assert_eq!(parse_packet_loss(PING_LOST), Some(100.0));
        assert_eq!(parse_packet_loss("garbage"), None);
    }
}
