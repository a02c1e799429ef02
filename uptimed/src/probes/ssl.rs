//! SSL certificate prober.
//!
//! Performs a TLS handshake against the target and inspects the leaf
//! certificate's validity window. Certificate verification is disabled for
//! the handshake itself: the expiry window is exactly what this probe
//! measures, so an expired certificate has to be observable rather than
//! aborting the connection.
//!
//! Classification: expired → down, ≤7 days remaining → critical, ≤30 days →
//! warning, otherwise the handshake latency is classified against the
//! service's response-time thresholds.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use crate::errors::{Error, Result};
use crate::probes::classify::{self, Measurement};
use crate::probes::models::{CheckMetadata, CheckOutcome, HealthStatus, Service};
use crate::probes::prober::{Prober, elapsed_ms};

pub struct SslProber;

#[async_trait]
impl Prober for SslProber {
    async fn probe(&self, service: &Service) -> Result<CheckOutcome> {
        let host = service.target_host()?;
        let port = service.port.or_else(|| service.target_port()).unwrap_or(443);
        let server_name =
            rustls::pki_types::ServerName::try_from(host.clone()).map_err(|_| Error::InvalidCheck {
                service: service.name.clone(),
                reason: format!("`{host}` is not a valid TLS server name"),
            })?;

        let config = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(danger::AcceptAnyCert::new(
                rustls::crypto::aws_lc_rs::default_provider(),
            )))
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));

        let mut metadata = CheckMetadata {
            port: Some(port),
            ..Default::default()
        };

        let start = Instant::now();
        let tcp = match tokio::time::timeout(service.timeout(), TcpStream::connect((host.as_str(), port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Ok(CheckOutcome::down(
                    format!("Connection to {host}:{port} failed: {e}"),
                    elapsed_ms(start),
                    metadata,
                ));
            }
            Err(_) => {
                return Ok(CheckOutcome::down(
                    format!("Connection to {host}:{port} timed out after {}s", service.timeout_secs),
                    elapsed_ms(start),
                    metadata,
                ));
            }
        };
        let tls = match tokio::time::timeout(service.timeout(), connector.connect(server_name, tcp)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Ok(CheckOutcome::down(
                    format!("TLS handshake with {host}:{port} failed: {e}"),
                    elapsed_ms(start),
                    metadata,
                ));
            }
            Err(_) => {
                return Ok(CheckOutcome::down(
                    format!("TLS handshake with {host}:{port} timed out after {}s", service.timeout_secs),
                    elapsed_ms(start),
                    metadata,
                ));
            }
        };
        let latency_ms = elapsed_ms(start);

        let (_, conn) = tls.get_ref();
        let Some(cert) = conn.peer_certificates().and_then(|certs| certs.first()) else {
            return Ok(CheckOutcome::down("Server presented no certificate", latency_ms, metadata));
        };
        let (_, parsed) = match X509Certificate::from_der(cert.as_ref()) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Ok(CheckOutcome::down(
                    format!("Failed to parse server certificate: {e}"),
                    latency_ms,
                    metadata,
                ));
            }
        };

        let validity = parsed.validity();
        let days_left = days_until(validity.not_after.timestamp(), Utc::now().timestamp());
        metadata.cert_not_before = Utc.timestamp_opt(validity.not_before.timestamp(), 0).single();
        metadata.cert_not_after = Utc.timestamp_opt(validity.not_after.timestamp(), 0).single();
        metadata.days_until_expiry = Some(days_left);

        if let Some((status, message)) = classify_expiry(days_left) {
            return Ok(CheckOutcome {
                status,
                response_time_ms: latency_ms,
                error: Some(message),
                metadata,
                timestamp: Utc::now(),
            });
        }

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

/// Whole days until `not_after`, rounding toward negative infinity so a
/// certificate expired by any amount reports a negative count.
fn days_until(not_after: i64, now: i64) -> i64 {
    (not_after - now).div_euclid(86_400)
}

/// Map days-until-expiry to a status override, or `None` when the window is
/// comfortable and plain latency classification applies.
fn classify_expiry(days_left: i64) -> Option<(HealthStatus, String)> {
    if days_left < 0 {
        Some((
            HealthStatus::Down,
            format!("Certificate expired {} days ago", -days_left),
        ))
    } else if days_left <= 7 {
        Some((
            HealthStatus::Critical,
            format!("Certificate expires in {days_left} days"),
        ))
    } else if days_left <= 30 {
        Some((
            HealthStatus::Warning,
            format!("Certificate expires in {days_left} days"),
        ))
    } else {
        None
    }
}

mod danger {
    use rustls::DigitallySignedStruct;
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};

    /// Accepts any server certificate. Signatures are still verified so the
    /// handshake is a real one; only the trust/validity decision is skipped.
    #[derive(Debug)]
    pub(super) struct AcceptAnyCert(CryptoProvider);

    impl AcceptAnyCert {
        pub(super) fn new(provider: CryptoProvider) -> Self {
            Self(provider)
        }
    }

    impl ServerCertVerifier for AcceptAnyCert {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> std::result::Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }
}
