use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::storage::BlobStorage;
use crate::task::{Status, Task, TaskPatch};

/// Key the whole task collection is stored under.
pub const STORAGE_KEY: &str = "splendid_todo_tasks";

/// The in-memory task list plus the storage it is mirrored to.
///
/// Every successful mutation re-serializes the full collection. A failed
/// write is logged and otherwise ignored: the in-memory list stays
/// authoritative for the rest of the session.
#[derive(Debug)]
pub struct TaskStore<S> {
    storage: S,
    tasks: Vec<Task>,
}

impl<S: BlobStorage> TaskStore<S> {
    /// Loads the stored collection. A missing blob gives an empty store,
    /// and so does an unreadable or corrupt one, after a warning. The bad
    /// blob is left in place until the next save replaces it.
    #[tracing::instrument(skip(storage))]
    pub fn load(storage: S) -> Self {
        let tasks = match read_tasks(&storage) {
            Ok(Some(tasks)) => {
                info!(count = tasks.len(), "loaded tasks");
                tasks
            }
            Ok(None) => {
                debug!("no stored tasks; starting empty");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "discarding unreadable task data; starting empty");
                Vec::new()
            }
        };

        Self { storage, tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    #[tracing::instrument(skip(self, task), fields(id = %task.id, horizon = %task.horizon))]
    pub fn add(&mut self, task: Task) {
        self.tasks.push(task);
        debug!(count = self.tasks.len(), "task added");
        self.persist();
    }

    /// Merges `patch` into the task with `id`. Returns `Ok(false)` when no
    /// such task exists; an invalid patch is rejected before anything
    /// changes.
    #[tracing::instrument(skip(self, patch, now))]
    pub fn update(&mut self, id: &str, patch: &TaskPatch, now: DateTime<Utc>) -> anyhow::Result<bool> {
        patch.validate()?;

        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            warn!("update for unknown task ignored");
            return Ok(false);
        };

        patch.apply(task, now);
        debug!(status = %task.status, "task updated");
        self.persist();
        Ok(true)
    }

    pub fn set_status(&mut self, id: &str, status: Status, now: DateTime<Utc>) -> bool {
        // A status-only patch always validates.
        self.update(id, &TaskPatch::status(status), now).unwrap_or(false)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() == before {
            debug!("delete for unknown task ignored");
            return false;
        }

        debug!(count = self.tasks.len(), "task deleted");
        self.persist();
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn save(&mut self) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(&self.tasks).context("failed to serialize tasks")?;
        self.storage
            .set(STORAGE_KEY, &serialized)
            .with_context(|| format!("failed to save {STORAGE_KEY}"))
    }

    fn persist(&mut self) {
        if let Err(err) = self.save() {
            warn!(error = %format!("{err:#}"), "failed to save tasks; keeping in-memory state");
        }
    }
}

fn read_tasks<S: BlobStorage>(storage: &S) -> anyhow::Result<Option<Vec<Task>>> {
    let Some(raw) = storage.get(STORAGE_KEY)? else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let tasks = serde_json::from_str(&raw).with_context(|| format!("failed parsing {STORAGE_KEY}"))?;
    Ok(Some(tasks))
}
