use std::sync::{Arc, Barrier};
use std::thread;

use todolist::lock::FileLock;
use todolist::storage::Storage;
use todolist::task::{TaskSnapshot, TaskStore};

const THREADS: usize = 8;
const TOGGLES_PER_THREAD: usize = 25;
const CONTENDED_LOCK_TIMEOUT_MS: u64 = 30_000;

fn contended_store(dir: &std::path::Path) -> TaskStore {
    TaskStore::open_with(Storage::new(dir), CONTENDED_LOCK_TIMEOUT_MS).expect("open")
}

#[test]
fn concurrent_toggles_serialize_through_lock() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = contended_store(dir.path());
    let task = store.add("Contended", "", false).expect("add");

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..TOGGLES_PER_THREAD {
                    assert!(store.toggle(task.id).expect("toggle"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread");
    }

    let total = THREADS * TOGGLES_PER_THREAD;
    let stored = store.get(task.id).expect("get").expect("task");
    assert_eq!(stored.completed, total % 2 == 1);

    let storage = Storage::new(dir.path());
    let snapshot: TaskSnapshot = storage
        .read_json(&storage.tasks_file())
        .expect("snapshot stays valid JSON");
    assert_eq!(snapshot.tasks.len(), 1);
}

#[test]
fn concurrent_adds_get_unique_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = contended_store(dir.path());

    let handles: Vec<_> = (0..THREADS)
        .map(|n| {
            let store = store.clone();
            thread::spawn(move || {
                (0..5)
                    .map(|i| store.add(format!("t{n}-{i}"), "", false).expect("add").id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let mut ids: Vec<i64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("thread"))
        .collect();

    assert_eq!(ids.len(), THREADS * 5);
    assert!(ids.iter().all(|id| *id < 0));
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), THREADS * 5);
    assert_eq!(store.len().expect("len"), THREADS * 5);
}

#[test]
fn held_lock_times_out_writers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = Storage::new(dir.path());
    let store = TaskStore::open_with(storage.clone(), 50).expect("open");

    let _held = FileLock::acquire(storage.tasks_lock_file(), 1000).expect("hold lock");
    let err = store.add("Blocked", "", false).expect_err("lock timeout");

    assert!(matches!(err, todolist::Error::LockFailed(_)), "unexpected: {err:?}");
    assert!(!store.has_any().expect("has_any"));
}
