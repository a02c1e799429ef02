//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` and can be specified
//! via the `-f` flag or the `UPTIMED_CONFIG` environment variable.
//!
//! ## Loading priority
//!
//! Sources are merged in order, later sources overriding earlier ones:
//!
//! 1. **YAML config file** - base configuration (default: `config.yaml`)
//! 2. **Environment variables** - variables prefixed with `UPTIMED_`
//!
//! Nested values use double underscores in environment variables, e.g.
//! `UPTIMED_SCHEDULER__TICK_INTERVAL=30s`.
//!
//! ## Structure
//!
//! - **scheduler**: `tick_interval`, `batch_deadline`,
//!   `correlation_window_minutes`
//! - **services**: the list of monitored services, each with a `name`, a
//!   target `url`, a `check_type`, and optional protocol parameters and
//!   alert thresholds. See the repository's `config.yaml` for a complete
//!   example.

use std::collections::HashMap;
use std::time::Duration;

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::probes::models::{AlertThresholds, CheckType, Service};

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "UPTIMED_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the daemon.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Runner scheduling configuration
    pub scheduler: SchedulerConfig,
    /// The services to monitor
    pub services: Vec<ServiceConfig>,
}

/// Runner scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// How often the runner looks for due services
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    /// Hard wall-clock ceiling on one whole batch of sequential probes
    #[serde(with = "humantime_serde")]
    pub batch_deadline: Duration,
    /// Alerts across services within this window of each other correlate
    /// into one incident
    pub correlation_window_minutes: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            batch_deadline: Duration::from_secs(300),
            correlation_window_minutes: crate::alerts::incidents::DEFAULT_WINDOW_MINUTES,
        }
    }
}

/// A monitored service as declared in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Human-readable name
    pub name: String,
    /// Target address
    pub url: String,
    /// Check protocol
    pub check_type: CheckType,
    /// Seconds between checks
    pub interval_secs: u64,
    /// Per-probe timeout in seconds
    pub timeout_secs: u64,
    /// HTTP method for http checks
    pub http_method: Option<String>,
    /// Extra request headers for http checks
    pub request_headers: HashMap<String, String>,
    /// Expected HTTP status code
    pub expected_status_code: Option<u16>,
    /// Substring that must appear in the response body
    pub expected_response_content: Option<String>,
    /// Whether the HTTP client follows redirects
    pub follow_redirects: bool,
    /// Whether the HTTP client verifies TLS certificates
    pub verify_ssl: bool,
    /// Port for port checks
    pub port: Option<u16>,
    /// Command (argv vector) for custom checks
    pub command: Option<Vec<String>>,
    /// Alert thresholds
    pub alert_thresholds: AlertThresholds,
    /// Paused services are declared but not checked
    pub paused: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            check_type: CheckType::Http,
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
            paused: false,
        }
    }
}

impl ServiceConfig {
    /// Materialize the declaration as a pending service.
    pub fn into_service(self) -> Service {
        let mut service = Service::new(self.name, self.url, self.check_type);
        service.interval_secs = self.interval_secs;
        service.timeout_secs = self.timeout_secs;
        service.http_method = self.http_method;
        service.request_headers = self.request_headers;
        service.expected_status_code = self.expected_status_code;
        service.expected_response_content = self.expected_response_content;
        service.follow_redirects = self.follow_redirects;
        service.verify_ssl = self.verify_ssl;
        service.port = self.port;
        service.command = self.command;
        service.alert_thresholds = self.alert_thresholds;
        service.paused = self.paused;
        service
    }
}

impl Config {
    /// Load configuration from the YAML file and environment overrides.
    pub fn load(args: &Args) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("UPTIMED_").split("__"))
            .extract()
            .map_err(|e| Error::Config { message: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject declarations the probers would refuse at runtime.
    pub fn validate(&self) -> Result<()> {
        for service in &self.services {
            let fail = |reason: String| Error::Config {
                message: format!("service `{}`: {reason}", service.name),
            };
            if service.name.is_empty() {
                return Err(Error::Config {
                    message: "every service needs a name".into(),
                });
            }
            if service.url.is_empty() {
                return Err(fail("no target url".into()));
            }
            if service.interval_secs == 0 {
                return Err(fail("interval_secs must be positive".into()));
            }
            if service.timeout_secs == 0 {
                return Err(fail("timeout_secs must be positive".into()));
            }
            if service.check_type == CheckType::Port && service.port.is_none() {
                return Err(fail("port checks require `port`".into()));
            }
            if service.check_type == CheckType::Tcp
                && service.port.is_none()
                && service.clone().into_service().target_port().is_none()
            {
                return Err(fail("tcp checks need a port in the url or via `port`".into()));
            }
            if service.check_type == CheckType::Custom
                && !service.command.as_ref().is_some_and(|argv| !argv.is_empty())
            {
                return Err(fail("custom checks require a non-empty `command`".into()));
            }
        }
        Ok(())
    }
}
