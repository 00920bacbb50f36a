//! crates/spamwall_core/src/ports.rs
//!
//! Defines the service contracts (traits) the session and history logic consume.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete backend, transport, and storage medium.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{Credential, HistoryItem, UserIdentity};

/// The single durable key under which the credential is persisted.
pub const SESSION_KEY: &str = "spamwall_token";

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, filesystem).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The backend refused the credential (401-class). Triggers a forced logout.
    #[error("Session expired. Please login again.")]
    Unauthorized,
    /// Any other non-2xx answer. The message is the backend's, or a fallback.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Cannot connect to server. Check that the backend is running and reachable.")]
    Unreachable,
    #[error("Request timed out. The server may be slow or unreachable.")]
    TimedOut,
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// True when the server could not be reached at all, as opposed to rejecting the request.
    pub fn is_transport(&self) -> bool {
        matches!(self, PortError::Unreachable | PortError::TimedOut)
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Port Payloads
//=========================================================================================

/// What the backend hands back after a successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub credential: Credential,
    pub user: UserIdentity,
    pub message: Option<String>,
}

/// The answer to a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub user: Option<UserIdentity>,
}

impl Verification {
    pub fn accepted(user: UserIdentity) -> Self {
        Self {
            valid: true,
            user: Some(user),
        }
    }

    pub fn rejected() -> Self {
        Self {
            valid: false,
            user: None,
        }
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Checks a stored credential and reports who it belongs to.
    async fn verify(&self, credential: &Credential) -> PortResult<Verification>;

    async fn login(&self, email: &str, password: &str) -> PortResult<AuthGrant>;

    async fn register(&self, email: &str, password: &str) -> PortResult<AuthGrant>;

    /// Requests a reset email. Returns the backend's confirmation message.
    async fn forgot_password(&self, email: &str) -> PortResult<String>;

    async fn reset_password(&self, token: &str, new_password: &str) -> PortResult<String>;
}

#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetches every past analysis for the credential's owner, in backend order.
    async fn fetch_all(&self, credential: &Credential) -> PortResult<Vec<HistoryItem>>;
}

//=========================================================================================
// Durable Key-Value Storage
//=========================================================================================

/// Identifies the execution context (tab, process) that wrote a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

impl ContextId {
    /// Writes observed from outside the process, e.g. by polling a shared file.
    pub const EXTERNAL: ContextId = ContextId(0);
}

/// A change to one key, as seen by the other contexts sharing the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
    pub origin: ContextId,
}

/// A stream of storage changes made by contexts other than the subscriber's own.
pub struct StorageSubscription {
    receiver: broadcast::Receiver<StorageEvent>,
    own: ContextId,
}

impl StorageSubscription {
    pub fn new(receiver: broadcast::Receiver<StorageEvent>, own: ContextId) -> Self {
        Self { receiver, own }
    }

    /// Waits for the next foreign change. Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.origin == self.own => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "storage subscriber lagged behind");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// A durable key-value store with change notification.
///
/// Reads and writes are synchronous, like browser storage. Implementations only
/// notify when a value actually changes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    fn remove(&self, key: &str) -> PortResult<()>;

    fn subscribe(&self) -> StorageSubscription;
}
