//! Storage layer for todolist
//!
//! All durable state lives in one data directory:
//!
//! ```text
//! <data_dir>/
//!   tasks.json        # Task snapshot (schema todolist.tasks.v1)
//!   tasks.json.lock   # fs2 lock guarding read-modify-write of tasks.json
//! ```
//!
//! The default data directory comes from `directories::ProjectDirs`; tests
//! and embedders pass an explicit path.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock;

/// File name of the task snapshot
pub const TASKS_FILE: &str = "tasks.json";

const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "todolist";
const APP_NAME: &str = "todolist";

/// Storage manager for the task data directory
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Create storage rooted at `data_dir` (not created until [`Storage::init`])
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path to the task snapshot
    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir.join(TASKS_FILE)
    }

    /// Path to the lock file guarding the task snapshot
    pub fn tasks_lock_file(&self) -> PathBuf {
        lock_path_for(&self.tasks_file())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Create the data directory
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    // =========================================================================
    // JSON I/O (atomic writes)
    // =========================================================================

    /// Write pretty JSON atomically (temp file, fsync, rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    /// Read JSON from a file
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let data: T = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Read JSON if the file exists
    pub fn read_json_opt<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        self.read_json(path).map(Some)
    }
}

/// Platform data directory for todolist
pub fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidConfig("no home directory; set store.path explicitly".to_string())
        })
}

fn lock_path_for(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.lock", path.display()))
}
