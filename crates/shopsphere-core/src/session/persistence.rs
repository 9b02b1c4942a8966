use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::state::SessionState;
use crate::utils::lock;

/// Storage key holding the serialized session snapshot.
pub const SESSION_KEY: &str = "applicationState";

/// Durable key/value storage backing the persistence layer.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, or `None` when nothing is stored.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// One JSON file per key inside a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read storage file: {}", path.display()))?;
        Ok(Some(contents))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create storage dir: {}", self.dir.display()))?;

        // Write to a sibling file and rename so a crash never leaves half a snapshot.
        let path = self.key_path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .with_context(|| format!("Failed to write storage file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace storage file: {}", path.display()))?;
        Ok(())
    }
}

/// Process-local storage; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Best-effort write-through persistence of the session snapshot.
///
/// Neither operation ever fails from the caller's point of view: write errors
/// are logged and dropped, unreadable snapshots are reported as absent.
#[derive(Clone)]
pub struct PersistenceLayer {
    storage: Arc<dyn Storage>,
}

impl PersistenceLayer {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn save(&self, snapshot: &SessionState) {
        let contents = match serde_json::to_string(snapshot) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to serialize session snapshot");
                return;
            }
        };
        if let Err(e) = self.storage.write(SESSION_KEY, &contents) {
            warn!(error = %e, "Failed to persist session snapshot");
        }
    }

    pub fn load(&self) -> Option<SessionState> {
        let contents = match self.storage.read(SESSION_KEY) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read session snapshot");
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(error = %e, "Ignoring malformed session snapshot");
                None
            }
        }
    }
}
