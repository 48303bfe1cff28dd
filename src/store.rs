//! Persistence of the encoded handle field.
//!
//! The engine owns exactly one text field per task: the encoded list of
//! issued notification handles (see [`crate::notify::registry`]). The host's
//! task store implements [`HandleStore`] to read and write that field.
//! [`InMemoryHandleStore`] backs tests, and [`JsonFileHandleStore`] keeps the
//! fields in a JSON snapshot file for standalone use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::error::{NudgeError, Result};

/// Read/write access to each task's encoded handle field.
#[async_trait]
pub trait HandleStore: Send + Sync {
    /// The stored field for `task_id`, or `""` when none is stored.
    async fn load(&self, task_id: i64) -> Result<String>;

    /// Overwrite the field for `task_id`. An empty string clears it.
    async fn save(&self, task_id: i64, encoded: &str) -> Result<()>;
}

// ─── In-memory store ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryState {
    fields: HashMap<i64, String>,
    fail_saves: bool,
}

/// [`HandleStore`] held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryHandleStore {
    state: Mutex<MemoryState>,
}

impl InMemoryHandleStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a field, as if written by an earlier run.
    pub fn insert(&self, task_id: i64, encoded: impl Into<String>) {
        self.lock().fields.insert(task_id, encoded.into());
    }

    /// Current field for `task_id`, without going through the trait.
    pub fn get(&self, task_id: i64) -> Option<String> {
        self.lock().fields.get(&task_id).cloned()
    }

    /// Make every subsequent save fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }
}

#[async_trait]
impl HandleStore for InMemoryHandleStore {
    async fn load(&self, task_id: i64) -> Result<String> {
        Ok(self.get(task_id).unwrap_or_default())
    }

    async fn save(&self, task_id: i64, encoded: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_saves {
            return Err(NudgeError::Store(format!("save refused for task {task_id}")));
        }
        if encoded.is_empty() {
            state.fields.remove(&task_id);
        } else {
            state.fields.insert(task_id, encoded.to_owned());
        }
        Ok(())
    }
}

// ─── JSON file store ──────────────────────────────────────────────────────────

const SNAPSHOT_VERSION: u32 = 1;

fn default_snapshot_version() -> u32 {
    SNAPSHOT_VERSION
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HandleSnapshot {
    #[serde(default = "default_snapshot_version")]
    version: u32,
    #[serde(default)]
    handles: BTreeMap<i64, String>,
}

/// [`HandleStore`] persisted as a pretty-printed JSON file.
///
/// Every save rewrites the whole file through a temporary sibling and a
/// rename, so a concurrent load sees either the old or the new snapshot.
/// A missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileHandleStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileHandleStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Default location: `<config_dir>/handles.json`.
    pub fn default_path() -> PathBuf {
        crate::config::EngineConfig::config_dir().join("handles.json")
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_snapshot(&self) -> Result<HandleSnapshot> {
        let bytes = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HandleSnapshot::default());
            }
            Err(e) => return Err(NudgeError::Store(format!("cannot read handle store: {e}"))),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| NudgeError::Store(format!("cannot parse handle store: {e}")))
    }

    fn write_snapshot(&self, snapshot: &HandleSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| NudgeError::Store(format!("cannot create handle store dir: {e}")))?;
        }
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| NudgeError::Store(format!("cannot serialize handle store: {e}")))?;
        // Readers do not take the write lock; they must only ever see a
        // complete file.
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .map_err(|e| NudgeError::Store(format!("cannot write handle store tmp: {e}")))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| NudgeError::Store(format!("cannot replace handle store: {e}")))
    }
}

#[async_trait]
impl HandleStore for JsonFileHandleStore {
    async fn load(&self, task_id: i64) -> Result<String> {
        let snapshot = self.read_snapshot()?;
        Ok(snapshot.handles.get(&task_id).cloned().unwrap_or_default())
    }

    async fn save(&self, task_id: i64, encoded: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = self.read_snapshot()?;
        if encoded.is_empty() {
            snapshot.handles.remove(&task_id);
        } else {
            snapshot.handles.insert(task_id, encoded.to_owned());
        }
        snapshot.version = SNAPSHOT_VERSION;
        self.write_snapshot(&snapshot)?;
        debug!(task_id, path = %self.path.display(), "saved handle field");
        Ok(())
    }
}
