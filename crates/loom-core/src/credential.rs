//! Credential source and presence monitoring.
//!
//! The API key lives in an external key-value store that is read synchronously.
//! Without it the assistant stays in its static explanatory state and never
//! touches the network. Presence is observed through a `watch` channel: stores
//! that can notify on change push updates; the rest are re-read on a bounded
//! interval as a compatibility shim.

use crate::error::AssistResult;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Storage key for the assistant's API key.
pub const DEFAULT_CREDENTIAL_KEY: &str = "loom_anthropic_api_key";

/// Synchronous key-value credential source.
pub trait CredentialStore: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;

    /// Change notifications, when the store can produce them. The value is a
    /// revision counter; receivers only care that it changed.
    fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        None
    }
}

/// Read `key` and keep it only when it holds a non-blank value.
pub fn resolve(store: &dyn CredentialStore, key: &str) -> Option<String> {
    store
        .read(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Flat TOML table on disk, e.g. `loom_anthropic_api_key = "sk-..."`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_table(&self) -> AssistResult<toml::Table> {
        if !self.path.exists() {
            return Ok(toml::Table::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn save_table(&self, table: &toml::Table) -> AssistResult<()> {
        let content = toml::to_string_pretty(table)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn write(&self, key: &str, value: &str) -> AssistResult<()> {
        let mut table = self.load_table()?;
        table.insert(key.to_string(), toml::Value::String(value.trim().to_string()));
        self.save_table(&table)
    }

    pub fn remove(&self, key: &str) -> AssistResult<()> {
        let mut table = self.load_table()?;
        if table.remove(key).is_some() {
            self.save_table(&table)?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn read(&self, key: &str) -> Option<String> {
        match self.load_table() {
            Ok(table) => table.get(key).and_then(|v| v.as_str()).map(str::to_string),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "credential file unreadable");
                None
            }
        }
    }
}

/// Environment variables; the key is upper-cased (`LOOM_ANTHROPIC_API_KEY`).
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialStore;

impl CredentialStore for EnvCredentialStore {
    fn read(&self, key: &str) -> Option<String> {
        std::env::var(key.to_ascii_uppercase()).ok()
    }
}

/// In-memory store with native change notification.
#[derive(Debug)]
pub struct MemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
    revision: watch::Sender<u64>,
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            values: RwLock::new(HashMap::new()),
            revision,
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        self.revision.send_modify(|r| *r += 1);
    }

    pub fn remove(&self, key: &str) {
        let removed = self
            .values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some();
        if removed {
            self.revision.send_modify(|r| *r += 1);
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn read(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        Some(self.revision.subscribe())
    }
}

/// First store holding a non-blank value wins. Priority: user file > environment.
pub struct ChainedCredentialStore {
    stores: Vec<Arc<dyn CredentialStore>>,
}

impl ChainedCredentialStore {
    pub fn new(stores: Vec<Arc<dyn CredentialStore>>) -> Self {
        Self { stores }
    }
}

impl CredentialStore for ChainedCredentialStore {
    fn read(&self, key: &str) -> Option<String> {
        self.stores.iter().find_map(|s| resolve(s.as_ref(), key))
    }
}

/// Publishes "credential present" for one key.
///
/// Must be started inside a tokio runtime. The background task stops when the
/// monitor is dropped.
pub struct CredentialMonitor {
    present: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl CredentialMonitor {
    pub fn start(store: Arc<dyn CredentialStore>, key: impl Into<String>, poll_interval: Duration) -> Self {
        let key = key.into();
        let initial = resolve(store.as_ref(), &key).is_some();
        let (tx, present) = watch::channel(initial);

        let task = match store.subscribe() {
            Some(mut changes) => {
                debug!(target: "loom::credential", key = %key, "observing credential via change notification");
                tokio::spawn(async move {
                    while changes.changed().await.is_ok() {
                        publish(&tx, &key, resolve(store.as_ref(), &key).is_some());
                    }
                })
            }
            None => {
                // Compatibility shim: the store cannot notify, so re-read it on a
                // bounded interval and publish only real changes.
                let period = poll_interval.max(Duration::from_millis(50));
                debug!(
                    target: "loom::credential",
                    key = %key,
                    interval_ms = period.as_millis() as u64,
                    "observing credential by polling"
                );
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(period);
                    interval.tick().await;
                    while !tx.is_closed() {
                        interval.tick().await;
                        publish(&tx, &key, resolve(store.as_ref(), &key).is_some());
                    }
                })
            }
        };

        Self { present, task }
    }

    pub fn is_present(&self) -> bool {
        *self.present.borrow()
    }

    pub fn receiver(&self) -> watch::Receiver<bool> {
        self.present.clone()
    }
}

impl Drop for CredentialMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn publish(tx: &watch::Sender<bool>, key: &str, present: bool) {
    let changed = tx.send_if_modified(|current| {
        if *current == present {
            return false;
        }
        *current = present;
        true
    });
    if changed {
        info!(target: "loom::credential", key, present, "credential presence changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_and_ignores_blank_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("user_config.toml"));
        assert!(store.read(DEFAULT_CREDENTIAL_KEY).is_none());

        store.write(DEFAULT_CREDENTIAL_KEY, "  sk-test  ").unwrap();
        assert_eq!(resolve(&store, DEFAULT_CREDENTIAL_KEY).as_deref(), Some("sk-test"));

        store.write(DEFAULT_CREDENTIAL_KEY, "   ").unwrap();
        assert!(resolve(&store, DEFAULT_CREDENTIAL_KEY).is_none());

        store.remove(DEFAULT_CREDENTIAL_KEY).unwrap();
        assert!(store.read(DEFAULT_CREDENTIAL_KEY).is_none());
    }

    #[test]
    fn chained_store_prefers_first_non_blank() {
        let first = Arc::new(MemoryCredentialStore::new());
        let second = Arc::new(MemoryCredentialStore::new());
        second.set("k", "from-second");
        let chain = ChainedCredentialStore::new(vec![first.clone() as Arc<dyn CredentialStore>, second.clone()]);
        assert_eq!(chain.read("k").as_deref(), Some("from-second"));
        first.set("k", "from-first");
        assert_eq!(chain.read("k").as_deref(), Some("from-first"));
    }

    #[tokio::test]
    async fn monitor_follows_memory_store_notifications() {
        let store = Arc::new(MemoryCredentialStore::new());
        let monitor = CredentialMonitor::start(store.clone(), "k", Duration::from_secs(60));
        let mut rx = monitor.receiver();
        assert!(!monitor.is_present());

        store.set("k", "secret");
        rx.changed().await.unwrap();
        assert!(*rx.borrow());

        store.remove("k");
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());
    }

    #[tokio::test]
    async fn monitor_polls_stores_without_notifications() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.toml");
        let file = FileCredentialStore::new(&path);
        let monitor = CredentialMonitor::start(Arc::new(file.clone()), "k", Duration::from_millis(50));
        let mut rx = monitor.receiver();

        file.write("k", "secret").unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("poll shim should publish within timeout")
            .unwrap();
        assert!(monitor.is_present());
    }
}
