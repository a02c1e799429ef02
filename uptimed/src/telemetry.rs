//! Tracing initialization.
//!
//! Sets up the `tracing` subscriber with an environment-driven filter and a
//! formatted output layer. The filter defaults to `info` for dependencies and
//! `debug` for this crate; override it with the standard `RUST_LOG` variable:
//!
//! ```bash
//! RUST_LOG=uptimed=trace,reqwest=warn uptimed -f config.yaml
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// Must be called once, before any spans or events are emitted. Panics if a
/// global subscriber is already installed.
pub fn init_telemetry() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,uptimed=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
