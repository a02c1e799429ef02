//! Multi-protocol health-check probing.

pub mod classify;
pub mod custom;
pub mod dns;
pub mod http;
pub mod models;
pub mod ping;
pub mod prober;
pub mod ssl;
pub mod tcp;

pub use models::{CheckOutcome, CheckRecord, CheckType, HealthStatus, Service};
pub use prober::{ProbeExecutor, Prober};
