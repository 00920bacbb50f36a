//! services/client/src/app.rs
//!
//! Defines the client's shared state: the adapters and core components, wired
//! together once at startup and handed to every command.

use std::sync::Arc;

use spamwall_core::{HistoryBrowser, SessionStore};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapters::{FileStorage, HttpBackend};
use crate::config::Config;
use crate::error::ClientError;

//=========================================================================================
// AppState (Shared Across All Commands)
//=========================================================================================

/// The shared application state, created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<HttpBackend>,
    pub storage: FileStorage,
    pub session: Arc<SessionStore>,
    /// Cancels the background watchers on shutdown.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Builds the adapters from `config` and injects them into the core components.
    pub fn build(config: Arc<Config>) -> Result<Self, ClientError> {
        let backend = Arc::new(HttpBackend::from_config(&config)?);
        let storage = FileStorage::open(config.session_file.clone())?;
        info!(
            api = %backend.base_url(),
            session_file = %storage.path().display(),
            "Client state initialized"
        );

        let session = Arc::new(SessionStore::new(
            backend.clone(),
            Arc::new(storage.clone()),
        ));

        Ok(Self {
            config,
            backend,
            storage,
            session,
            shutdown: CancellationToken::new(),
        })
    }

    /// A history browser sharing this state's backend and session.
    pub fn history_browser(&self) -> HistoryBrowser {
        HistoryBrowser::new(self.backend.clone(), self.session.clone())
            .with_page_size(self.config.page_size)
    }

    /// Starts following session changes made by other processes.
    pub fn spawn_watchers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        vec![
            self.storage
                .spawn_watcher(self.config.storage_poll_interval, self.shutdown.clone()),
            self.session.watch_storage(self.shutdown.clone()),
        ]
    }
}
