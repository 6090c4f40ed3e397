//! Task storage for todolist.
//!
//! The whole collection is persisted as one JSON snapshot (`tasks.json`).
//! Every mutation is a read-modify-write of that snapshot under the store
//! lock, committed by an atomic replace, so each operation (and each bulk
//! seed insert as a unit) is either fully visible or not at all.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::lock::{FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::storage::Storage;

const TASKS_SCHEMA_VERSION: &str = "todolist.tasks.v1";
const PREVIEW_TASK_COUNT: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Case-insensitive substring match on title or detail.
    ///
    /// `query_lower` must already be lowercased; empty matches everything.
    fn matches(&self, query_lower: &str) -> bool {
        if query_lower.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(query_lower)
            || self.detail.to_lowercase().contains(query_lower)
    }
}

/// A task as delivered by the remote seed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTask {
    pub id: i64,
    pub text: String,
    pub completed: bool,
}

impl SeedTask {
    fn to_task(&self, created_at: DateTime<Utc>) -> Task {
        Task {
            id: self.id,
            title: self.text.clone(),
            detail: String::new(),
            comment: None,
            completed: self.completed,
            created_at,
        }
    }
}

/// The mutable fields of a task, written together by [`TaskStore::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: String,
    pub detail: String,
    pub comment: Option<String>,
    pub completed: bool,
}

impl From<&Task> for TaskEdit {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            detail: task.detail.clone(),
            comment: task.comment.clone(),
            completed: task.completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_local_id: Option<i64>,
    /// Insertion order; queries sort their own copy.
    pub tasks: Vec<Task>,
}

impl TaskSnapshot {
    pub fn empty() -> Self {
        Self {
            schema_version: TASKS_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            last_local_id: None,
            tasks: Vec::new(),
        }
    }

    fn find_mut(&mut self, id: i64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    /// Next id for a locally created task.
    ///
    /// Local ids live below zero, remote ids above it. The candidate is the
    /// negated epoch second, pushed further down whenever it is not strictly
    /// below every negative id already issued or stored.
    fn next_local_id(&self, now_secs: i64) -> Result<i64> {
        let candidate = -now_secs.max(1);
        let floor = self
            .tasks
            .iter()
            .map(|task| task.id)
            .chain(self.last_local_id)
            .filter(|id| *id < 0)
            .min();
        match floor {
            Some(floor) if candidate >= floor => {
                floor.checked_sub(1).ok_or(Error::LocalIdsExhausted)
            }
            _ => Ok(candidate),
        }
    }
}

/// Most recent first; `sort_by` is stable so ties keep insertion order.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| right.created_at.cmp(&left.created_at));
}

enum Commit<T> {
    Write(T),
    Skip(T),
}

#[derive(Debug, Clone)]
enum Backing {
    Memory(Arc<Mutex<TaskSnapshot>>),
    Disk {
        storage: Storage,
        lock_timeout_ms: u64,
    },
}

/// Owner of the durable task collection.
///
/// Clones share the same underlying collection.
#[derive(Debug, Clone)]
pub struct TaskStore {
    backing: Backing,
}

impl TaskStore {
    /// Open (or create) a durable store in `data_dir`.
    ///
    /// Fails with [`Error::StoreCorrupted`] if an existing snapshot cannot
    /// be read back.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(Storage::new(data_dir), DEFAULT_LOCK_TIMEOUT_MS)
    }

    pub fn open_with(storage: Storage, lock_timeout_ms: u64) -> Result<Self> {
        storage.init()?;
        let snapshot = load_snapshot(&storage)?;
        debug!(
            path = %storage.tasks_file().display(),
            tasks = snapshot.tasks.len(),
            "opened task store"
        );
        Ok(Self {
            backing: Backing::Disk {
                storage,
                lock_timeout_ms,
            },
        })
    }

    /// A volatile store, for tests and previews.
    pub fn in_memory() -> Self {
        Self {
            backing: Backing::Memory(Arc::new(Mutex::new(TaskSnapshot::empty()))),
        }
    }

    /// In-memory store with a handful of sample tasks.
    pub fn preview() -> Self {
        let now = Utc::now();
        let mut snapshot = TaskSnapshot::empty();
        snapshot.tasks = (1..=PREVIEW_TASK_COUNT)
            .map(|i| Task {
                id: i,
                title: format!("Sample {i}"),
                detail: format!("Description of task {i}"),
                comment: None,
                completed: i % 2 == 0,
                created_at: now,
            })
            .collect();
        Self {
            backing: Backing::Memory(Arc::new(Mutex::new(snapshot))),
        }
    }

    /// Backing storage of a durable store
    pub fn storage(&self) -> Option<&Storage> {
        match &self.backing {
            Backing::Memory(_) => None,
            Backing::Disk { storage, .. } => Some(storage),
        }
    }

    pub fn has_any(&self) -> Result<bool> {
        self.read(|snapshot| !snapshot.tasks.is_empty())
    }

    pub fn len(&self) -> Result<usize> {
        self.read(|snapshot| snapshot.tasks.len())
    }

    pub fn get(&self, id: i64) -> Result<Option<Task>> {
        self.read(|snapshot| snapshot.tasks.iter().find(|task| task.id == id).cloned())
    }

    /// Tasks whose title or detail contains `search_text` (case-insensitive),
    /// most recently created first.
    ///
    /// Matching folds case only: `"cafe"` does not match `"Café"`.
    pub fn fetch_all(&self, search_text: &str) -> Result<Vec<Task>> {
        let query = search_text.to_lowercase();
        self.read(|snapshot| {
            let mut tasks: Vec<Task> = snapshot
                .tasks
                .iter()
                .filter(|task| task.matches(&query))
                .cloned()
                .collect();
            sort_tasks(&mut tasks);
            tasks
        })
    }

    pub fn add(
        &self,
        title: impl Into<String>,
        detail: impl Into<String>,
        completed: bool,
    ) -> Result<Task> {
        let title = title.into();
        let detail = detail.into();
        let now = Utc::now();
        self.mutate("add", move |snapshot| {
            let id = snapshot.next_local_id(now.timestamp())?;
            let task = Task {
                id,
                title,
                detail,
                comment: None,
                completed,
                created_at: now,
            };
            snapshot.last_local_id = Some(id);
            snapshot.tasks.push(task.clone());
            Ok(Commit::Write(task))
        })
    }

    /// Flip `completed`. Returns `false` if the task no longer exists.
    pub fn toggle(&self, id: i64) -> Result<bool> {
        self.mutate("toggle", |snapshot| match snapshot.find_mut(id) {
            Some(task) => {
                task.completed = !task.completed;
                Ok(Commit::Write(true))
            }
            None => Ok(Commit::Skip(false)),
        })
    }

    /// Overwrite the mutable fields. Returns `false` if the task no longer exists.
    pub fn update(&self, id: i64, edit: TaskEdit) -> Result<bool> {
        self.mutate("update", move |snapshot| match snapshot.find_mut(id) {
            Some(task) => {
                task.title = edit.title;
                task.detail = edit.detail;
                task.comment = edit.comment;
                task.completed = edit.completed;
                Ok(Commit::Write(true))
            }
            None => Ok(Commit::Skip(false)),
        })
    }

    /// Remove a task. Returns `false` if it was already absent.
    pub fn delete(&self, id: i64) -> Result<bool> {
        self.mutate("delete", |snapshot| {
            match snapshot.tasks.iter().position(|task| task.id == id) {
                Some(index) => {
                    snapshot.tasks.remove(index);
                    Ok(Commit::Write(true))
                }
                None => Ok(Commit::Skip(false)),
            }
        })
    }

    /// Remove every task; returns how many were removed.
    pub fn clear_all(&self) -> Result<usize> {
        self.mutate("clear_all", |snapshot| {
            let removed = snapshot.tasks.len();
            if removed == 0 {
                return Ok(Commit::Skip(0));
            }
            snapshot.tasks.clear();
            Ok(Commit::Write(removed))
        })
    }

    /// Insert seed tasks in a single commit.
    ///
    /// A non-positive id, or an id clashing with a stored task or with
    /// another seed in the batch, rejects the whole batch.
    pub fn bulk_insert_seed(&self, seeds: &[SeedTask]) -> Result<usize> {
        let now = Utc::now();
        self.mutate("bulk_insert_seed", |snapshot| {
            let mut seen: HashSet<i64> = snapshot.tasks.iter().map(|task| task.id).collect();
            for seed in seeds {
                if seed.id <= 0 {
                    return Err(Error::InvalidSeedId(seed.id));
                }
                if !seen.insert(seed.id) {
                    return Err(Error::DuplicateTask(seed.id));
                }
            }
            if seeds.is_empty() {
                return Ok(Commit::Skip(0));
            }
            snapshot
                .tasks
                .extend(seeds.iter().map(|seed| seed.to_task(now)));
            Ok(Commit::Write(seeds.len()))
        })
    }

    fn read<T>(&self, f: impl FnOnce(&TaskSnapshot) -> T) -> Result<T> {
        match &self.backing {
            Backing::Memory(cell) => {
                let guard = cell.lock().map_err(|_| Error::LockPoisoned)?;
                Ok(f(&*guard))
            }
            Backing::Disk { storage, .. } => {
                // Commits are atomic renames, so an unlocked read sees a whole snapshot.
                let snapshot = load_snapshot(storage)?;
                Ok(f(&snapshot))
            }
        }
    }

    fn mutate<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut TaskSnapshot) -> Result<Commit<T>>,
    ) -> Result<T> {
        match &self.backing {
            Backing::Memory(cell) => {
                let mut guard = cell.lock().map_err(|_| Error::LockPoisoned)?;
                let mut draft = guard.clone();
                match f(&mut draft)? {
                    Commit::Write(value) => {
                        draft.generated_at = Utc::now();
                        *guard = draft;
                        Ok(value)
                    }
                    Commit::Skip(value) => Ok(value),
                }
            }
            Backing::Disk {
                storage,
                lock_timeout_ms,
            } => {
                let _lock = FileLock::acquire(storage.tasks_lock_file(), *lock_timeout_ms)?;
                let mut draft = load_snapshot(storage)?;
                match f(&mut draft)? {
                    Commit::Write(value) => {
                        draft.generated_at = Utc::now();
                        storage.write_json(&storage.tasks_file(), &draft)?;
                        debug!(op, tasks = draft.tasks.len(), "committed task snapshot");
                        Ok(value)
                    }
                    Commit::Skip(value) => Ok(value),
                }
            }
        }
    }
}

fn load_snapshot(storage: &Storage) -> Result<TaskSnapshot> {
    let path = storage.tasks_file();
    let snapshot = match storage.read_json_opt::<TaskSnapshot>(&path) {
        Ok(snapshot) => snapshot.unwrap_or_else(TaskSnapshot::empty),
        Err(Error::Json(err)) => {
            return Err(Error::StoreCorrupted {
                path,
                reason: err.to_string(),
            })
        }
        Err(err) => return Err(err),
    };
    if snapshot.schema_version != TASKS_SCHEMA_VERSION {
        return Err(Error::StoreCorrupted {
            path,
            reason: format!("unsupported schema version '{}'", snapshot.schema_version),
        });
    }
    Ok(snapshot)
}
