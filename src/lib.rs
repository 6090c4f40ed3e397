//! todolist - Local to-do storage with a one-time remote seed
//!
//! This library provides the storage and orchestration layer behind a
//! to-do list screen: a durable task store, a remote seed source used to
//! populate an empty store, and a controller that keeps a list view's state
//! in sync with both.
//!
//! # Core Concepts
//!
//! - **Tasks**: Local records with a title, detail, optional comment, and a
//!   completion flag; locally created tasks get negative ids
//! - **Seeding**: A one-time bulk import of remote todos into an empty store
//! - **Search**: Case-insensitive substring filter over title and detail,
//!   newest first
//!
//! # Module Organization
//!
//! - `config`: Configuration loading from `todolist.toml`
//! - `controller`: List state, mutations, and the seed-then-load pipeline
//! - `error`: Error types and result aliases
//! - `lock`: File locking and atomic writes for concurrency safety
//! - `logging`: `tracing` subscriber setup
//! - `seed`: Remote seed source over HTTP
//! - `storage`: Data directory and JSON file helpers
//! - `task`: Task model and the task store

pub mod config;
pub mod controller;
pub mod error;
pub mod lock;
pub mod logging;
pub mod seed;
pub mod storage;
pub mod task;

pub use controller::{TaskListController, TaskListState};
pub use error::{Error, Result};
pub use task::{SeedTask, Task, TaskEdit, TaskStore};
