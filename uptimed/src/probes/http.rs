//! HTTP(S) prober.
//!
//! Issues a request with the service's configured method, headers, timeout,
//! redirect policy, and TLS-verification flag. Status validation happens here
//! rather than at the transport level, so non-2xx responses are inspected
//! instead of surfacing as errors: an unexpected status code or missing
//! expected content classifies as a warning, and latency is measured across
//! the full request (including body transfer) and classified against the
//! service's thresholds.

use std::time::Instant;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::redirect::Policy;

use crate::errors::{Error, Result};
use crate::probes::classify::{self, Measurement};
use crate::probes::models::{CheckMetadata, CheckOutcome, Service};
use crate::probes::prober::{Prober, elapsed_ms};

pub struct HttpProber;

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, service: &Service) -> Result<CheckOutcome> {
        let method = match &service.http_method {
            Some(m) => reqwest::Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| {
                Error::InvalidCheck {
                    service: service.name.clone(),
                    reason: format!("unsupported HTTP method `{m}`"),
                }
            })?,
            None => reqwest::Method::GET,
        };

        // Redirect policy and TLS verification are client-level settings in
        // reqwest and vary per service, so the client is built per probe.
        let redirect = if service.follow_redirects {
            Policy::limited(10)
        } else {
            Policy::none()
        };
        let client = reqwest::Client::builder()
            .timeout(service.timeout())
            .redirect(redirect)
            .danger_accept_invalid_certs(!service.verify_ssl)
            .build()
            .context("building HTTP client")?;

        let mut request = client.request(method, &service.url);
        for (name, value) in &service.request_headers {
            request = request.header(name, value);
        }

        let start = Instant::now();
        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("Request timed out after {}s", service.timeout_secs)
                } else {
                    format!("Request failed: {e}")
                };
                return Ok(CheckOutcome::down(message, elapsed_ms(start), CheckMetadata::default()));
            }
        };

        let status_code = response.status().as_u16();
        let mut metadata = CheckMetadata {
            status_code: Some(status_code),
            ..Default::default()
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(CheckOutcome::down(
                    format!("Failed to read response body: {e}"),
                    elapsed_ms(start),
                    metadata,
                ));
            }
        };
        let latency_ms = elapsed_ms(start);
        metadata.response_size = Some(body.len() as u64);

        let anomaly = if let Some(expected) = service.expected_status_code {
            if status_code != expected {
                Some(format!("Expected status code {expected}, got {status_code}"))
            } else {
                expected_content_anomaly(service, &body)
            }
        } else if !(200..300).contains(&status_code) {
            Some(format!("Unexpected status code {status_code}"))
        } else {
            expected_content_anomaly(service, &body)
        };

        Ok(classify::outcome(
            Measurement {
                failure: None,
                anomaly,
                latency_ms,
            },
            service.alert_thresholds.response_time.as_ref(),
            metadata,
        ))
    }
}

fn expected_content_anomaly(service: &Service, body: &str) -> Option<String> {
    let needle = service.expected_response_content.as_deref()?;
    if body.contains(needle) {
        None
    } else {
        Some(format!("Expected content `{needle}` not found in response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::models::{CheckType, HealthStatus, ResponseTimeThresholds};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_with(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    fn service_for(server: &MockServer) -> Service {
        Service::new("web", format!("{}/health", server.uri()), CheckType::Http)
    }

    #[tokio::test]
    async fn fast_ok_response_is_healthy() {
        let server = server_with(ResponseTemplate::new(200).set_body_string("OK")).await;
        let outcome = HttpProber.probe(&service_for(&server)).await.unwrap();

        assert_eq!(outcome.status, HealthStatus::Healthy);
        assert_eq!(outcome.metadata.status_code, Some(200));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn server_error_is_warning() {
        let server = server_with(ResponseTemplate::new(500)).await;
        let outcome = HttpProber.probe(&service_for(&server)).await.unwrap();

        assert_eq!(outcome.status, HealthStatus::Warning);
        assert!(outcome.error.as_deref().unwrap().contains("status code 500"));
    }

    #[tokio::test]
    async fn status_mismatch_is_warning() {
        let server = server_with(ResponseTemplate::new(200)).await;
        let mut service = service_for(&server);
        service.expected_status_code = Some(204);
        let outcome = HttpProber.probe(&service).await.unwrap();

        assert_eq!(outcome.status, HealthStatus::Warning);
        assert_eq!(outcome.error.as_deref(), Some("Expected status code 204, got 200"));
    }

    #[tokio::test]
    async fn missing_expected_content_is_warning() {
        let server = server_with(ResponseTemplate::new(200).set_body_string("maintenance page")).await;
        let mut service = service_for(&server);
        service.expected_response_content = Some("welcome".into());
        let outcome = HttpProber.probe(&service).await.unwrap();

        assert_eq!(outcome.status, HealthStatus::Warning);
        assert!(outcome.error.as_deref().unwrap().contains("welcome"));
    }

    #[tokio::test]
    async fn slow_response_breaches_critical_threshold() {
        let server = server_with(
            ResponseTemplate::new(200)
                .set_body_string("OK")
                .set_delay(Duration::from_millis(300)),
        )
        .await;
        let mut service = service_for(&server);
        service.alert_thresholds.response_time = Some(ResponseTimeThresholds {
            warning_ms: 50,
            critical_ms: 150,
        });
        let outcome = HttpProber.probe(&service).await.unwrap();

        assert_eq!(outcome.status, HealthStatus::Critical);
        assert!(outcome.error.as_deref().unwrap().contains("Response time"));
    }

    #[tokio::test]
    async fn unreachable_target_is_down() {
        // Port 1 on loopback is essentially never listening
        let service = Service::new("web", "http://127.0.0.1:1/health", CheckType::Http);
        let outcome = HttpProber.probe(&service).await.unwrap();

        assert_eq!(outcome.status, HealthStatus::Down);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn bad_method_is_a_configuration_error() {
        let mut service = Service::new("web", "http://127.0.0.1/health", CheckType::Http);
        service.http_method = Some("NOT A METHOD".into());
        assert!(HttpProber.probe(&service).await.is_err());
    }
}
