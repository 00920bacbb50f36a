//! services/client/src/error.rs
//!
//! Defines the primary error type for the client service.

use crate::config::ConfigError;
use spamwall_core::ports::PortError;

/// The primary error type for the `spamwall-client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the session or history logic, already worded for users.
    #[error("{0}")]
    Core(#[from] spamwall_core::Error),

    /// Represents an error that propagated up from one of the adapters directly.
    #[error("{0}")]
    Port(#[from] PortError),

    /// Represents an error from building the HTTP client.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., creating the session file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A task spawned by the client panicked or was aborted.
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
