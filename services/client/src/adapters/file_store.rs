//! services/client/src/adapters/file_store.rs
//!
//! A `KeyValueStore` persisted as a JSON object in a single file, so the
//! credential survives restarts and is shared by every process pointed at the
//! same file. Changes made by other processes are picked up by polling.

use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spamwall_core::ports::{
    ContextId, KeyValueStore, PortError, PortResult, StorageEvent, StorageSubscription,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

const EVENT_BUFFER: usize = 64;
const LOCAL: ContextId = ContextId(1);

type Entries = HashMap<String, String>;

struct Shared {
    path: PathBuf,
    /// The file contents as last written or observed by this process.
    baseline: Mutex<Entries>,
    events: broadcast::Sender<StorageEvent>,
}

#[derive(Clone)]
pub struct FileStorage {
    shared: Arc<Shared>,
}

impl FileStorage {
    /// Opens (or prepares to create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> PortResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, e))?;
        }
        let baseline = read_entries(&path)?;
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Ok(Self {
            shared: Arc::new(Shared {
                path,
                baseline: Mutex::new(baseline),
                events,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Polls the file and reports keys changed by other processes until `shutdown`.
    pub fn spawn_watcher(&self, poll_interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        let storage = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = storage.poll() {
                            error!("Failed to poll the session file: {}", e);
                        }
                    }
                }
            }
            debug!("Session file watcher stopped");
        })
    }

    /// Compares the file against the baseline and emits an event per changed key.
    fn poll(&self) -> PortResult<usize> {
        let mut baseline = self.lock()?;
        let current = read_entries(&self.shared.path)?;

        let keys: BTreeSet<&String> = baseline.keys().chain(current.keys()).collect();
        let mut changed = Vec::new();
        for key in keys {
            if baseline.get(key) != current.get(key) {
                changed.push(StorageEvent {
                    key: key.clone(),
                    new_value: current.get(key).cloned(),
                    origin: ContextId::EXTERNAL,
                });
            }
        }
        *baseline = current;
        drop(baseline);

        let count = changed.len();
        for event in changed {
            debug!(key = %event.key, "Session file changed externally");
            let _ = self.shared.events.send(event);
        }
        Ok(count)
    }

    fn update(&self, key: &str, value: Option<&str>) -> PortResult<()> {
        let mut baseline = self.lock()?;
        let mut entries = read_entries(&self.shared.path)?;
        let unchanged = match value {
            Some(value) => entries.get(key).map(String::as_str) == Some(value),
            None => !entries.contains_key(key),
        };
        if unchanged {
            return Ok(());
        }

        match value {
            Some(value) => {
                entries.insert(key.to_string(), value.to_string());
            }
            None => {
                entries.remove(key);
            }
        }
        write_entries(&self.shared.path, &entries)?;
        *baseline = entries;
        Ok(())
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, Entries>> {
        self.shared
            .baseline
            .lock()
            .map_err(|_| PortError::Storage("session file lock poisoned".to_string()))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(read_entries(&self.shared.path)?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.update(key, Some(value))
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.update(key, None)
    }

    fn subscribe(&self) -> StorageSubscription {
        StorageSubscription::new(self.shared.events.subscribe(), LOCAL)
    }
}

//=========================================================================================
// File Helpers
//=========================================================================================

fn storage_error(path: &Path, e: impl std::fmt::Display) -> PortError {
    PortError::Storage(format!("{}: {}", path.display(), e))
}

fn read_entries(path: &Path) -> PortResult<Entries> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
        Err(e) => return Err(storage_error(path, e)),
    };
    if raw.trim().is_empty() {
        return Ok(Entries::new());
    }
    serde_json::from_str(&raw).map_err(|e| storage_error(path, e))
}

/// Writes next to the target and renames, so readers never see a partial file.
fn write_entries(path: &Path, entries: &Entries) -> PortResult<()> {
    let json = serde_json::to_vec_pretty(entries).map_err(|e| storage_error(path, e))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json).map_err(|e| storage_error(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| storage_error(path, e))
}
