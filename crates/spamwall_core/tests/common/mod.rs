//! Fakes for the core ports, shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use spamwall_core::{
    AuthGrant, Credential, HistoryItem, HistorySource, MemoryStorage, PortError, PortResult,
    SessionBackend, SessionStore, UserIdentity, Verification,
};
use tokio::sync::Notify;

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct-horse";

pub fn ada() -> UserIdentity {
    UserIdentity {
        id: 1,
        email: EMAIL.to_string(),
    }
}

#[derive(Default)]
pub struct FakeBackend {
    accounts: Mutex<HashMap<String, (String, UserIdentity)>>,
    tokens: Mutex<HashMap<String, UserIdentity>>,
    issued: AtomicUsize,
    verify_error: Mutex<Option<PortError>>,
    verify_gate: Mutex<Option<Arc<Notify>>>,
    login_gate: Mutex<Option<Arc<Notify>>>,
    pub verify_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub reset_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn with_account() -> Arc<Self> {
        let backend = Self::default();
        backend
            .accounts
            .lock()
            .unwrap()
            .insert(EMAIL.to_string(), (PASSWORD.to_string(), ada()));
        Arc::new(backend)
    }

    /// Makes every verify fail with `error` instead of consulting the token table.
    pub fn fail_verify_with(&self, error: PortError) {
        *self.verify_error.lock().unwrap() = Some(error);
    }

    /// Makes the next verify wait until the returned handle is notified.
    pub fn hold_verify(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.verify_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Makes the next login wait until the returned handle is notified.
    pub fn hold_login(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.login_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn revoke_all(&self) {
        self.tokens.lock().unwrap().clear();
    }

    pub fn calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
            + self.login_calls.load(Ordering::SeqCst)
            + self.register_calls.load(Ordering::SeqCst)
    }

    fn issue(&self, user: UserIdentity) -> AuthGrant {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let token = format!("token-{}-{}", user.id, n);
        self.tokens.lock().unwrap().insert(token.clone(), user.clone());
        AuthGrant {
            credential: Credential::new(token),
            user,
            message: Some("ok".to_string()),
        }
    }
}

#[async_trait]
impl SessionBackend for FakeBackend {
    async fn verify(&self, credential: &Credential) -> PortResult<Verification> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.verify_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(error) = self.verify_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(match self.tokens.lock().unwrap().get(credential.expose()) {
            Some(user) => Verification::accepted(user.clone()),
            None => Verification::rejected(),
        })
    }

    async fn login(&self, email: &str, password: &str) -> PortResult<AuthGrant> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.login_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let account = self.accounts.lock().unwrap().get(email).cloned();
        match account {
            Some((expected, user)) if expected == password => Ok(self.issue(user)),
            _ => Err(PortError::Rejected {
                status: 401,
                message: "Invalid credentials".to_string(),
            }),
        }
    }

    async fn register(&self, email: &str, password: &str) -> PortResult<AuthGrant> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(PortError::Rejected {
                status: 400,
                message: "User already exists".to_string(),
            });
        }
        let user = UserIdentity {
            id: accounts.len() as i64 + 1,
            email: email.to_string(),
        };
        accounts.insert(email.to_string(), (password.to_string(), user.clone()));
        drop(accounts);
        Ok(self.issue(user))
    }

    async fn forgot_password(&self, _email: &str) -> PortResult<String> {
        Ok("If the account exists, a reset email was sent".to_string())
    }

    async fn reset_password(&self, _token: &str, _new_password: &str) -> PortResult<String> {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
        Ok("Password reset successful".to_string())
    }
}

#[derive(Default)]
pub struct FakeHistory {
    responses: Mutex<VecDeque<PortResult<Vec<HistoryItem>>>>,
    pub calls: AtomicUsize,
}

impl FakeHistory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: PortResult<Vec<HistoryItem>>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistorySource for FakeHistory {
    async fn fetch_all(&self, _credential: &Credential) -> PortResult<Vec<HistoryItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn store(backend: &Arc<FakeBackend>, storage: &MemoryStorage) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(backend.clone(), Arc::new(storage.clone())))
}

pub fn numbered_items(count: usize) -> Vec<HistoryItem> {
    (0..count)
        .map(|i| HistoryItem::new(format!("message {}", i), i % 2 == 0, "2024-05-01T10:00:00"))
        .collect()
}
