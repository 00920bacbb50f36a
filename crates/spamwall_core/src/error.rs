//! crates/spamwall_core/src/error.rs
//!
//! Defines the error type returned by the session and history operations.

use crate::ports::PortError;
use crate::validation::ValidationError;

/// The primary error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Local input was rejected before any request was made.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Represents an error that propagated up from one of the service ports.
    #[error(transparent)]
    Port(#[from] PortError),

    /// A logout happened while the request was in flight; its result was dropped.
    #[error("The session changed while the request was in flight")]
    Superseded,
}

impl Error {
    /// True for 401-class failures, which force a logout.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Port(PortError::Unauthorized))
    }
}

/// A convenience type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
