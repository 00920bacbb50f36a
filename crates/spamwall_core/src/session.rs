//! crates/spamwall_core/src/session.rs
//!
//! The authentication session state machine.
//!
//! `Unverified -> Verifying -> {Valid, Invalid}`. `Valid -> Invalid` on logout or a
//! failed check, `Invalid -> Verifying` on the next login, registration, or check.
//! Every transition is published on a `watch` channel so views can re-render.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{Credential, Session, SessionStatus, UserIdentity};
use crate::error::{Error, Result};
use crate::ports::{KeyValueStore, PortError, SessionBackend, SESSION_KEY};
use crate::validation::{
    validate_forgot_password, validate_login, validate_password_reset, validate_registration,
};

/// The name of the header produced by [`SessionStore::auth_headers`].
pub const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Clone, Copy)]
enum AuthMode {
    Login,
    Register,
}

/// Owns the credential and the session lifecycle.
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    storage: Arc<dyn KeyValueStore>,
    state: watch::Sender<Session>,
    /// Serializes verify, login and register so only one network call drives the state.
    /// Holds the token the last completed check ran against.
    gate: Mutex<Option<String>>,
    /// Number of finished credential checks, used to join an in-flight `initialize`.
    checks_completed: AtomicU64,
    /// Bumped by `logout`; results started under an older epoch are dropped.
    epoch: AtomicU64,
    initial_check_running: AtomicBool,
    initial_check_done: AtomicBool,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>, storage: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(Session::unverified());
        Self {
            backend,
            storage,
            state,
            gate: Mutex::new(None),
            checks_completed: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
            initial_check_running: AtomicBool::new(false),
            initial_check_done: AtomicBool::new(false),
        }
    }

    //-------------------------------------------------------------------------------------
    // Reads
    //-------------------------------------------------------------------------------------

    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// A receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// True only while the first credential check is outstanding.
    pub fn is_loading(&self) -> bool {
        self.initial_check_running.load(Ordering::Acquire)
            && self.state.borrow().status() == SessionStatus::Verifying
    }

    /// The persisted credential, if any.
    pub fn credential(&self) -> Option<Credential> {
        match self.storage.get(SESSION_KEY) {
            Ok(value) => value.filter(|token| !token.is_empty()).map(Credential::new),
            Err(e) => {
                error!("Failed to read the stored credential: {}", e);
                None
            }
        }
    }

    /// The bearer header for authenticated requests, or nothing when signed out.
    pub fn auth_headers(&self) -> Vec<(&'static str, String)> {
        self.credential()
            .map(|credential| vec![(AUTHORIZATION_HEADER, credential.bearer())])
            .unwrap_or_default()
    }

    //-------------------------------------------------------------------------------------
    // Transitions
    //-------------------------------------------------------------------------------------

    /// Checks the persisted credential with the backend.
    ///
    /// A call that arrives while another check is outstanding waits for it and
    /// returns its result instead of issuing a second request, as long as the
    /// stored credential is still the one that check verified.
    pub async fn initialize(&self) -> Session {
        let ticket = self.checks_completed.load(Ordering::Acquire);
        let mut last_checked = self.gate.lock().await;
        let stored = self.credential();
        if self.checks_completed.load(Ordering::Acquire) != ticket
            && last_checked.as_deref() == stored.as_ref().map(Credential::expose)
        {
            debug!("Joined an in-flight session check");
            return self.session();
        }

        let first = !self.initial_check_done.load(Ordering::Acquire);
        if first {
            self.initial_check_running.store(true, Ordering::Release);
        }
        *last_checked = stored.as_ref().map(|c| c.expose().to_string());
        let session = self.verify_stored(stored).await;
        self.checks_completed.fetch_add(1, Ordering::AcqRel);
        if first {
            self.initial_check_running.store(false, Ordering::Release);
            self.initial_check_done.store(true, Ordering::Release);
        }
        session
    }

    async fn verify_stored(&self, credential: Option<Credential>) -> Session {
        let Some(credential) = credential else {
            debug!("No stored credential; session is invalid");
            self.publish(Session::invalid());
            return self.session();
        };

        let epoch = self.epoch.load(Ordering::Acquire);
        self.publish(Session::verifying());

        let outcome = self.backend.verify(&credential).await;
        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!("Dropping a session check that was superseded by logout");
            return self.session();
        }

        match outcome {
            Ok(verification) if verification.valid => match verification.user {
                Some(user) => {
                    debug!(user_id = user.id, "Stored credential verified");
                    self.publish(Session::valid(user));
                }
                None => {
                    warn!("Backend accepted the credential but returned no user");
                    self.discard(&credential);
                }
            },
            Ok(_) => {
                info!("Stored credential was rejected; clearing it");
                self.discard(&credential);
            }
            Err(e) => {
                warn!("Session check failed: {}", e);
                self.discard(&credential);
            }
        }
        self.session()
    }

    /// Signs in with an existing account and persists the returned credential.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserIdentity> {
        validate_login(email, password)?;
        self.authenticate(AuthMode::Login, email, password).await
    }

    /// Creates an account and signs in with it.
    pub async fn register(&self, email: &str, password: &str) -> Result<UserIdentity> {
        validate_registration(email, password)?;
        self.authenticate(AuthMode::Register, email, password).await
    }

    async fn authenticate(&self, mode: AuthMode, email: &str, password: &str) -> Result<UserIdentity> {
        let _gate = self.gate.lock().await;
        let epoch = self.epoch.load(Ordering::Acquire);
        let previous = self.credential();
        self.publish(Session::verifying());

        let outcome = match mode {
            AuthMode::Login => self.backend.login(email, password).await,
            AuthMode::Register => self.backend.register(email, password).await,
        };
        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!("Dropping an authentication result that was superseded by logout");
            return Err(Error::Superseded);
        }

        let grant = match outcome {
            Ok(grant) => grant,
            Err(e) => {
                // Invalid never keeps a credential around.
                match previous {
                    Some(previous) => self.discard(&previous),
                    None => self.publish(Session::invalid()),
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.storage.set(SESSION_KEY, grant.credential.expose()) {
            error!("Failed to persist the credential: {}", e);
            self.publish(Session::invalid());
            return Err(e.into());
        }

        info!(user_id = grant.user.id, "Signed in");
        self.publish(Session::valid(grant.user.clone()));
        Ok(grant.user)
    }

    /// Clears the credential and returns to the unauthenticated state. Never fails.
    pub fn logout(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if let Err(e) = self.storage.remove(SESSION_KEY) {
            error!("Failed to clear the stored credential: {}", e);
        }
        info!("Signed out");
        self.publish(Session::invalid());
    }

    /// Applies the forced-logout reaction to a 401-class failure.
    ///
    /// Returns true when the error was an authorization failure.
    pub fn escalate(&self, error: &PortError) -> bool {
        if *error != PortError::Unauthorized {
            return false;
        }
        warn!("Backend rejected the session; signing out");
        self.logout();
        true
    }

    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        validate_forgot_password(email)?;
        Ok(self.backend.forgot_password(email.trim()).await?)
    }

    pub async fn reset_password(&self, token: &str, password: &str, confirmation: &str) -> Result<String> {
        validate_password_reset(token, password, confirmation)?;
        Ok(self.backend.reset_password(token.trim(), password).await?)
    }

    //-------------------------------------------------------------------------------------
    // Cross-context synchronization
    //-------------------------------------------------------------------------------------

    /// Re-checks the session whenever another context changes the stored credential.
    pub fn watch_storage(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut changes = self.storage.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    change = changes.changed() => match change {
                        Some(event) if event.key == SESSION_KEY => {
                            debug!(origin = event.origin.0, "Credential changed in another context");
                            store.initialize().await;
                        }
                        Some(_) => {}
                        None => break,
                    },
                }
            }
            debug!("Storage watcher stopped");
        })
    }

    //-------------------------------------------------------------------------------------
    // Helpers
    //-------------------------------------------------------------------------------------

    fn publish(&self, session: Session) {
        debug!(status = ?session.status(), "Session transition");
        self.state.send_replace(session);
    }

    /// Removes `credential` unless another context replaced it meanwhile.
    fn discard(&self, credential: &Credential) {
        match self.storage.get(SESSION_KEY) {
            Ok(Some(current)) if current == credential.expose() => {
                if let Err(e) = self.storage.remove(SESSION_KEY) {
                    error!("Failed to clear the stored credential: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => error!("Failed to read the stored credential: {}", e),
        }
        self.publish(Session::invalid());
    }
}
