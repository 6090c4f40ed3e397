//! Task list controller.
//!
//! Owns the UI-facing state (`is_loading`, `error_message`, `tasks`,
//! `search_text`). Only the task holding the controller can mutate it; store
//! work runs on the blocking pool and the seed pipeline on a spawned task,
//! and both report back through their join handles before any state changes.
//! Every change is published on a `watch` channel for observers.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::seed::{HttpSeedSource, SeedSource};
use crate::storage::Storage;
use crate::task::{Task, TaskEdit, TaskStore};

/// Snapshot of everything a list view renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListState {
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub tasks: Vec<Task>,
    pub search_text: String,
}

/// What the background seed pipeline did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store already had tasks.
    AlreadySeeded,
    /// No seed source is configured.
    Disabled,
    /// This many tasks were inserted.
    Inserted(usize),
}

pub struct TaskListController {
    store: Arc<TaskStore>,
    seed_source: Option<Arc<dyn SeedSource>>,
    state: TaskListState,
    publisher: watch::Sender<TaskListState>,
}

impl TaskListController {
    pub fn new(store: Arc<TaskStore>) -> Self {
        let state = TaskListState::default();
        let (publisher, _) = watch::channel(state.clone());
        Self {
            store,
            seed_source: None,
            state,
            publisher,
        }
    }

    pub fn with_seed_source(mut self, source: Arc<dyn SeedSource>) -> Self {
        self.seed_source = Some(source);
        self
    }

    /// Open the configured durable store and wire the HTTP seed source.
    ///
    /// A corrupted store is returned as a fatal error; callers abort startup.
    pub fn from_config(config: &Config) -> Result<Self> {
        let data_dir = config.store.resolved_path()?;
        let storage = Storage::new(data_dir);
        let store = TaskStore::open_with(storage, config.store.lock_timeout_ms)?;
        let controller = Self::new(Arc::new(store));
        if !config.seed.enabled {
            return Ok(controller);
        }
        let source = HttpSeedSource::from_config(&config.seed)?;
        Ok(controller.with_seed_source(Arc::new(source)))
    }

    pub fn state(&self) -> &TaskListState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskListState> {
        self.publisher.subscribe()
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Seed an empty store once, then load the list.
    ///
    /// Seeding failures are reported through `error_message` and never
    /// stop the load.
    pub async fn initial_load(&mut self) {
        self.state.is_loading = true;
        self.publish();

        let pipeline = tokio::spawn(seed_if_empty(
            Arc::clone(&self.store),
            self.seed_source.clone(),
        ));
        let outcome = match pipeline.await {
            Ok(result) => result,
            Err(err) => Err(Error::Background(err.to_string())),
        };
        match outcome {
            Ok(outcome) => debug!(?outcome, "seed pipeline finished"),
            Err(err) => {
                warn!(error = %err, "seeding failed; continuing without seed data");
                self.state.error_message = Some(err.to_string());
            }
        }

        self.state.is_loading = false;
        self.reload().await;
    }

    /// Re-query the store with the current search text.
    pub async fn reload(&mut self) {
        let search_text = self.state.search_text.clone();
        match self
            .run_store(move |store| store.fetch_all(&search_text))
            .await
        {
            Ok(tasks) => self.state.tasks = tasks,
            Err(err) => {
                warn!(error = %err, "reload failed");
                self.state.error_message = Some(err.to_string());
            }
        }
        self.publish();
    }

    pub async fn set_search_text(&mut self, text: impl Into<String>) {
        self.state.search_text = text.into();
        self.reload().await;
    }

    pub async fn add(&mut self, title: impl Into<String>, detail: impl Into<String>) {
        let title = title.into();
        let detail = detail.into();
        let result = self
            .run_store(move |store| store.add(title, detail, false))
            .await;
        self.finish_mutation("add", result).await;
    }

    pub async fn toggle(&mut self, id: i64) {
        let result = self.run_store(move |store| store.toggle(id)).await;
        self.finish_mutation("toggle", result).await;
    }

    pub async fn delete(&mut self, id: i64) {
        let result = self.run_store(move |store| store.delete(id)).await;
        self.finish_mutation("delete", result).await;
    }

    pub async fn update(&mut self, id: i64, edit: TaskEdit) {
        let result = self.run_store(move |store| store.update(id, edit)).await;
        self.finish_mutation("update", result).await;
    }

    /// Fetch remote todos and add each one as a new local task.
    ///
    /// Unlike seeding this runs on demand and ignores whether the store
    /// already has tasks; imported tasks get fresh local ids.
    pub async fn import_from_remote(&mut self) {
        let Some(source) = self.seed_source.clone() else {
            self.state.error_message = Some("import failed: no seed source configured".into());
            self.publish();
            return;
        };

        self.state.is_loading = true;
        self.publish();

        let fetched = match tokio::spawn(async move { source.fetch_seed_tasks().await }).await {
            Ok(result) => result,
            Err(err) => Err(Error::Background(err.to_string())),
        };
        let result = match fetched {
            Ok(seeds) => {
                self.run_store(move |store| {
                    for seed in &seeds {
                        store.add(seed.text.clone(), "", seed.completed)?;
                    }
                    Ok(seeds.len())
                })
                .await
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(count) => info!(count, "imported remote tasks"),
            Err(err) => {
                warn!(error = %err, "import failed");
                self.state.error_message = Some(format!("import failed: {err}"));
            }
        }

        self.state.is_loading = false;
        self.reload().await;
    }

    pub fn dismiss_error(&mut self) {
        if self.state.error_message.take().is_some() {
            self.publish();
        }
    }

    async fn finish_mutation<T>(&mut self, op: &'static str, result: Result<T>) {
        if let Err(err) = result {
            warn!(op, error = %err, "task mutation failed");
            self.state.error_message = Some(err.to_string());
        }
        self.reload().await;
    }

    async fn run_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&TaskStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|err| Error::Background(err.to_string()))?
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }
}

async fn seed_if_empty(
    store: Arc<TaskStore>,
    source: Option<Arc<dyn SeedSource>>,
) -> Result<SeedOutcome> {
    let reader = Arc::clone(&store);
    let has_any = tokio::task::spawn_blocking(move || reader.has_any())
        .await
        .map_err(|err| Error::Background(err.to_string()))??;
    if has_any {
        return Ok(SeedOutcome::AlreadySeeded);
    }
    let Some(source) = source else {
        return Ok(SeedOutcome::Disabled);
    };

    let seeds = source.fetch_seed_tasks().await?;
    let inserted = tokio::task::spawn_blocking(move || store.bulk_insert_seed(&seeds))
        .await
        .map_err(|err| Error::Background(err.to_string()))??;
    info!(inserted, "seeded task store");
    Ok(SeedOutcome::Inserted(inserted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::SeedTask;
    use async_trait::async_trait;

    struct StaticSource(Vec<SeedTask>);

    #[async_trait]
    impl SeedSource for StaticSource {
        async fn fetch_seed_tasks(&self) -> Result<Vec<SeedTask>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl SeedSource for FailingSource {
        async fn fetch_seed_tasks(&self) -> Result<Vec<SeedTask>> {
            Err(Error::Network("timeout".to_string()))
        }
    }

    fn seed(id: i64, text: &str, completed: bool) -> SeedTask {
        SeedTask {
            id,
            text: text.to_string(),
            completed,
        }
    }

    #[tokio::test]
    async fn initial_load_without_source_leaves_store_empty() {
        let mut controller = TaskListController::new(Arc::new(TaskStore::in_memory()));
        controller.initial_load().await;

        let state = controller.state();
        assert!(!state.is_loading);
        assert!(state.error_message.is_none());
        assert!(state.tasks.is_empty());
    }

    #[tokio::test]
    async fn initial_load_seeds_empty_store() {
        let source = StaticSource(vec![seed(1, "Buy milk", false), seed(2, "Walk dog", true)]);
        let mut controller = TaskListController::new(Arc::new(TaskStore::in_memory()))
            .with_seed_source(Arc::new(source));
        controller.initial_load().await;

        let mut ids: Vec<i64> = controller.state().tasks.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn seeding_failure_is_surfaced_not_fatal() {
        let store = Arc::new(TaskStore::in_memory());
        let mut controller =
            TaskListController::new(Arc::clone(&store)).with_seed_source(Arc::new(FailingSource));
        controller.initial_load().await;

        let state = controller.state();
        assert!(!state.is_loading);
        assert_eq!(
            state.error_message.as_deref(),
            Some("Network error: timeout")
        );
        assert!(state.tasks.is_empty());
    }

    #[tokio::test]
    async fn mutations_reload_the_list() {
        let mut controller = TaskListController::new(Arc::new(TaskStore::in_memory()));
        controller.add("Write report", "quarterly").await;
        assert_eq!(controller.state().tasks.len(), 1);
        let id = controller.state().tasks[0].id;
        assert!(id < 0);

        controller.toggle(id).await;
        assert!(controller.state().tasks[0].completed);

        let mut edit = TaskEdit::from(&controller.state().tasks[0]);
        edit.comment = Some("due friday".to_string());
        controller.update(id, edit).await;
        assert_eq!(
            controller.state().tasks[0].comment.as_deref(),
            Some("due friday")
        );

        controller.delete(id).await;
        assert!(controller.state().tasks.is_empty());
        assert!(controller.state().error_message.is_none());
    }

    #[tokio::test]
    async fn import_without_source_reports_error() {
        let mut controller = TaskListController::new(Arc::new(TaskStore::in_memory()));
        controller.import_from_remote().await;

        let message = controller.state().error_message.clone().expect("error");
        assert!(message.starts_with("import failed: "));

        controller.dismiss_error();
        assert!(controller.state().error_message.is_none());
    }

    #[tokio::test]
    async fn subscribers_see_published_state() {
        let mut controller = TaskListController::new(Arc::new(TaskStore::in_memory()));
        let receiver = controller.subscribe();
        controller.add("Observe me", "").await;

        let published = receiver.borrow().clone();
        assert_eq!(&published, controller.state());
        assert_eq!(published.tasks.len(), 1);
    }
}
