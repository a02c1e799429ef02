use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Check configuration the prober cannot execute (fatal for that service,
    /// surfaced to the runner rather than converted into an outcome)
    #[error("Invalid check for service {service}: {reason}")]
    InvalidCheck { service: String, reason: String },

    /// Invalid configuration file or environment override
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Requested resource not found in the store
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
