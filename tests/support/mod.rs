#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use todolist::error::{Error, Result};
use todolist::seed::SeedSource;
use todolist::task::{SeedTask, TaskStore};

/// Seed source that replays a canned response and counts calls.
pub struct FakeSeedSource {
    response: std::result::Result<Vec<SeedTask>, String>,
    calls: AtomicUsize,
}

impl FakeSeedSource {
    pub fn ok(tasks: Vec<SeedTask>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(tasks),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn network_failure(message: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeedSource for FakeSeedSource {
    async fn fetch_seed_tasks(&self) -> Result<Vec<SeedTask>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map_err(Error::Network)
    }
}

pub fn seed(id: i64, text: &str, completed: bool) -> SeedTask {
    SeedTask {
        id,
        text: text.to_string(),
        completed,
    }
}

pub fn sample_seeds() -> Vec<SeedTask> {
    vec![
        seed(1, "Buy milk", false),
        seed(2, "Walk the dog", true),
        seed(3, "Call mom", false),
    ]
}

/// A durable store rooted in a fresh temp directory.
pub fn disk_store() -> (TempDir, Arc<TaskStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = TaskStore::open(dir.path()).expect("open store");
    (dir, Arc::new(store))
}
