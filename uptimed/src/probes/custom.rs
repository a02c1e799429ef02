//! External-command prober.
//!
//! The extension point for checks none of the built-in protocols cover. The
//! service configures a command as an argv vector; the prober runs it under
//! the service timeout. The output contract is deliberately small: exit
//! status zero means the check passed (the command's wall-clock time then
//! goes through the usual latency classification), anything else is down,
//! with the command's stderr (or stdout) as the error message.

use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use crate::errors::{Error, Result};
use crate::probes::classify::{self, Measurement};
use crate::probes::models::{CheckMetadata, CheckOutcome, Service};
use crate::probes::prober::{Prober, elapsed_ms};

pub struct CommandProber;

#[async_trait]
impl Prober for CommandProber {
    async fn probe(&self, service: &Service) -> Result<CheckOutcome> {
        let argv = service
            .command
            .as_deref()
            .filter(|argv| !argv.is_empty())
            .ok_or_else(|| Error::InvalidCheck {
                service: service.name.clone(),
                reason: "custom checks require a command".into(),
            })?;

        let start = Instant::now();
        let result = tokio::time::timeout(
            service.timeout(),
            Command::new(&argv[0]).args(&argv[1..]).kill_on_drop(true).output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Ok(CheckOutcome::down(
                    format!("Failed to run `{}`: {e}", argv[0]),
                    elapsed_ms(start),
                    CheckMetadata::default(),
                ));
            }
            Err(_) => {
                return Ok(CheckOutcome::down(
                    format!("Command `{}` timed out after {}s", argv[0], service.timeout_secs),
                    elapsed_ms(start),
                    CheckMetadata::default(),
                ));
            }
        };
        let latency_ms = elapsed_ms(start);

        if !output.status.success() {
            let detail = first_line(&output.stderr).or_else(|| first_line(&output.stdout));
            let message = match detail {
                Some(line) => format!("Command exited with {}: {line}", output.status),
                None => format!("Command exited with {}", output.status),
            };
            return Ok(CheckOutcome::down(message, latency_ms, CheckMetadata::default()));
        }

        Ok(classify::outcome(
            Measurement {
                failure: None,
                anomaly: None,
                latency_ms,
            },
            service.alert_thresholds.response_time.as_ref(),
            CheckMetadata::default(),
        ))
    }
}

fn first_line(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let line = text.lines().next()?.trim();
    if line.is_empty() { None } else { Some(line.to_string()) }
}
