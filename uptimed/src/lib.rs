//! # uptimed: Service Health-Check and Alerting Daemon
//!
//! `uptimed` monitors external services over multiple protocols and turns
//! check failures into deduplicated alerts and correlated incidents. It is
//! the engine behind a status dashboard: the dashboard, its HTTP API, and its
//! database are external collaborators; this crate owns the probing and the
//! alerting decisions.
//!
//! ## Overview
//!
//! Each monitored [`Service`](probes::Service) declares a target, a check
//! protocol (HTTP, ICMP ping, TCP/port connect, DNS resolution, SSL
//! certificate expiry, or an external command), a check interval, a timeout,
//! and optional response-time thresholds. A single background
//! [`Runner`](runner::Runner) probes due services sequentially - one probe at
//! a time, deliberately, to avoid overwhelming target hosts - and feeds each
//! normalized [`CheckOutcome`](probes::CheckOutcome) through a pure status
//! classifier and the alert pipeline.
//!
//! ## Architecture
//!
//! Data flows one way:
//!
//! ```text
//! Runner → Prober → Classifier → Alert generator → Dedup / Auto-resolve
//!                                                → Incident correlator
//! ```
//!
//! - [`probes`] - per-protocol probers behind the
//!   [`Prober`](probes::Prober) trait, dispatched by check type, plus the
//!   pure [`classify`](probes::classify) function mapping raw measurements
//!   and thresholds to a health status. Probers never fail for transport
//!   reasons; failures become `down` outcomes.
//! - [`alerts`] - pure decision functions: a generator turning non-healthy
//!   outcomes into drafts, a deduplicator keeping at most one open alert per
//!   (service, metric) pair, an auto-resolver closing alerts on recovery,
//!   and a correlator grouping concurrent multi-service alerts into one
//!   incident.
//! - [`store`] - the persistence seam. The runner only talks to the
//!   [`Store`](store::Store) trait; an in-memory implementation backs the
//!   daemon and the tests.
//! - [`runner`] - the periodic batch loop with its wall-clock deadline.
//! - [`notifications`] - lifecycle events, emitted as structured logs
//!   (delivery channels are out of scope).

pub mod alerts;
pub mod config;
pub mod errors;
pub mod notifications;
pub mod probes;
pub mod runner;
pub mod store;
pub mod telemetry;

pub use config::{Args, Config};
pub use errors::{Error, Result};
pub use notifications::Notifier;
pub use runner::Runner;
pub use store::{MemoryStore, Store};
