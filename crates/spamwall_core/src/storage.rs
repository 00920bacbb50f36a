//! crates/spamwall_core/src/storage.rs
//!
//! An in-memory `KeyValueStore` shared between any number of contexts.
//!
//! Each `MemoryStorage` handle is one context (think: one browser tab). Handles
//! opened from the same store see each other's writes and receive change
//! events for writes made by the other handles only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::ports::{ContextId, KeyValueStore, PortError, PortResult, StorageEvent, StorageSubscription};

const EVENT_BUFFER: usize = 64;

struct Shared {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    next_context: AtomicU64,
}

#[derive(Clone)]
pub struct MemoryStorage {
    shared: Arc<Shared>,
    context: ContextId,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let shared = Arc::new(Shared {
            entries: Mutex::new(HashMap::new()),
            events,
            // 0 is reserved for `ContextId::EXTERNAL`.
            next_context: AtomicU64::new(1),
        });
        Self::attach(shared)
    }

    /// Opens another context over the same entries.
    pub fn open_context(&self) -> Self {
        Self::attach(self.shared.clone())
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    fn attach(shared: Arc<Shared>) -> Self {
        let context = ContextId(shared.next_context.fetch_add(1, Ordering::Relaxed));
        Self { shared, context }
    }

    fn write(&self, key: &str, value: Option<&str>) -> PortResult<()> {
        let mut entries = self
            .shared
            .entries
            .lock()
            .map_err(|_| PortError::Storage("memory storage lock poisoned".to_string()))?;
        let changed = match value {
            Some(value) => entries.insert(key.to_string(), value.to_string()).as_deref() != Some(value),
            None => entries.remove(key).is_some(),
        };
        drop(entries);

        if changed {
            // No receivers is fine; nobody is listening yet.
            let _ = self.shared.events.send(StorageEvent {
                key: key.to_string(),
                new_value: value.map(str::to_string),
                origin: self.context,
            });
        }
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let entries = self
            .shared
            .entries
            .lock()
            .map_err(|_| PortError::Storage("memory storage lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.write(key, Some(value))
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.write(key, None)
    }

    fn subscribe(&self) -> StorageSubscription {
        StorageSubscription::new(self.shared.events.subscribe(), self.context)
    }
}
