// File: ./src/store.rs
// Task stores the scheduler reads from and writes reminder changes back to.
//
// ⚠️ VERSION BUMP REQUIRED:
// Changes to the serialized shape of TaskRecord require incrementing
// STORE_VERSION below.
use crate::model::{ReminderPatch, TaskId, TaskRecord};
use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

const STORE_VERSION: u32 = 1;

/// The boundary between the scheduler and whatever owns the task records.
///
/// `update` must have committed durably by the time it returns.
pub trait ReminderStore: Send + Sync {
    /// Name used in logs and notification payloads.
    fn name(&self) -> &str;

    fn read_non_deleted(&self) -> Result<Vec<TaskRecord>>;

    fn update(&self, id: TaskId, patch: &ReminderPatch) -> Result<()>;
}

/// Runs `f` while holding an exclusive lock on a sidecar `<file>.lock`.
pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let lock_path = lock_path_for(file_path);
    let file = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file {:?}", lock_path))?;

    file.lock_exclusive()?;
    let result = f();
    file.unlock()?;
    result
}

/// Atomic write: Write to .tmp file then rename
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
    let path = path.as_ref();
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}

fn lock_path_for(file_path: &Path) -> PathBuf {
    let mut lock_path = file_path.to_path_buf();
    if let Some(ext) = lock_path.extension() {
        let mut new_ext = ext.to_os_string();
        new_ext.push(".lock");
        lock_path.set_extension(new_ext);
    } else {
        lock_path.set_extension("lock");
    }
    lock_path
}

#[derive(Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    version: u32,
    tasks: Vec<TaskRecord>,
}

/// Tasks kept in a single versioned JSON file.
#[derive(Debug, Clone)]
pub struct JsonTaskStore {
    name: String,
    path: PathBuf,
}

impl JsonTaskStore {
    pub fn new(name: &str, path: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every record, deleted ones included. A missing file is an empty store.
    pub fn load_all(&self) -> Result<Vec<TaskRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        with_lock(&self.path, || self.read_unlocked())
    }

    /// Replaces the file contents with `tasks`.
    pub fn save_all(&self, tasks: &[TaskRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        with_lock(&self.path, || self.write_unlocked(tasks))
    }

    fn read_unlocked(&self) -> Result<Vec<TaskRecord>> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read store '{}'", self.path.display()))?;
        let data: StoreData = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse store '{}'", self.path.display()))?;
        if data.version > STORE_VERSION {
            anyhow::bail!(
                "Store '{}' has version {}, newer than supported version {}",
                self.path.display(),
                data.version,
                STORE_VERSION
            );
        }
        Ok(data.tasks)
    }

    fn write_unlocked(&self, tasks: &[TaskRecord]) -> Result<()> {
        let data = StoreData {
            version: STORE_VERSION,
            tasks: tasks.to_vec(),
        };
        let json = serde_json::to_string_pretty(&data)?;
        atomic_write(&self.path, json)
    }
}

impl ReminderStore for JsonTaskStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_non_deleted(&self) -> Result<Vec<TaskRecord>> {
        let mut tasks = self.load_all()?;
        tasks.retain(|t| !t.deleted);
        Ok(tasks)
    }

    fn update(&self, id: TaskId, patch: &ReminderPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        // Read and write under one lock so a concurrent editor cannot interleave.
        with_lock(&self.path, || {
            let mut tasks = self.read_unlocked()?;
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| anyhow::anyhow!("Task {} not found in '{}'", id, self.name))?;
            patch.apply_to(&mut task.reminder);
            self.write_unlocked(&tasks)
        })
    }
}

/// In-memory store, used by tests and embedders. Failures can be injected.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    tasks: Mutex<Vec<TaskRecord>>,
    fail_reads: AtomicBool,
    fail_updates: AtomicBool,
}

impl MemoryStore {
    pub fn new(name: &str, tasks: Vec<TaskRecord>) -> Self {
        Self {
            name: name.to_string(),
            tasks: Mutex::new(tasks),
            ..Default::default()
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every record, deleted ones included.
    pub fn snapshot(&self) -> Vec<TaskRecord> {
        self.tasks.lock().map(|t| t.to_vec()).unwrap_or_default()
    }

    pub fn get(&self, id: TaskId) -> Option<TaskRecord> {
        self.snapshot().into_iter().find(|t| t.id == id)
    }
}

impl ReminderStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_non_deleted(&self) -> Result<Vec<TaskRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("Store '{}' is unavailable", self.name);
        }
        let tasks = self
            .tasks
            .lock()
            .map_err(|_| anyhow::anyhow!("Store '{}' lock poisoned", self.name))?;
        Ok(tasks.iter().filter(|t| !t.deleted).cloned().collect())
    }

    fn update(&self, id: TaskId, patch: &ReminderPatch) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            anyhow::bail!("Store '{}' rejected the update", self.name);
        }
        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| anyhow::anyhow!("Store '{}' lock poisoned", self.name))?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow::anyhow!("Task {} not found in '{}'", id, self.name))?;
        patch.apply_to(&mut task.reminder);
        Ok(())
    }
}
