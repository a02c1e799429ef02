//! Alert generation, deduplication, auto-resolution, and incident
//! correlation.

pub mod engine;
pub mod incidents;
pub mod models;

pub use models::{
    Alert, AlertDraft, AlertMetric, AlertSeverity, AlertStatus, Incident, IncidentDraft, IncidentSeverity,
    IncidentStatus, IncidentUpdate,
};
