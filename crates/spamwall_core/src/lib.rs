pub mod browser;
pub mod domain;
pub mod error;
pub mod history;
pub mod ports;
pub mod session;
pub mod storage;
pub mod validation;

pub use browser::{EmptyState, HistoryBrowser, DEFAULT_PAGE_SIZE};
pub use domain::{
    Credential, FilterCounts, FilterType, HistoryItem, Session, SessionStatus, UserIdentity, ViewKey,
};
pub use error::{Error, Result};
pub use history::{filter_items, paginate, FilteredView, HistoryViewCache, Page, PageWindow};
pub use ports::{
    AuthGrant, ContextId, HistorySource, KeyValueStore, PortError, PortResult, SessionBackend,
    StorageEvent, StorageSubscription, Verification, SESSION_KEY,
};
pub use session::{SessionStore, AUTHORIZATION_HEADER};
pub use storage::MemoryStorage;
pub use validation::{ValidationError, ValidationResult};
