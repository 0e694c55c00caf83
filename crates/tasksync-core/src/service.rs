//! Mutation pipeline: every change lands in the local store first, then is
//! pushed to the remote store if it is reachable. Remote failures are deferred
//! work for the sync coordinator, never errors for the caller.

use crate::connectivity::ConnectivitySignal;
use crate::error::{Error, RemoteWriteFault, Result};
use crate::models::{NewTask, Task, TaskPatch};
use crate::remote::RemoteStore;
use crate::store::TaskStore;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// What happened to the opportunistic remote push of a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Remote unreachable, nothing attempted
    Skipped,
    /// Remote accepted the write and the local copy is clean
    Converged,
    /// Remote accepted the write but the task was modified locally meanwhile
    Superseded,
    /// Remote write failed; the task stays dirty for the next sync pass
    Deferred(RemoteWriteFault),
}

/// Local result and remote result of one mutation, kept apart
#[derive(Debug, Clone)]
pub struct Mutation {
    pub task: Task,
    pub push: PushOutcome,
}

/// Entry points for creating, editing and deleting tasks
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<dyn ConnectivitySignal>,
    background: TaskTracker,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<dyn ConnectivitySignal>,
    ) -> Self {
        Self {
            store,
            remote,
            connectivity,
            background: TaskTracker::new(),
        }
    }

    /// Create a task for `owner_id`
    pub async fn add(&self, owner_id: &str, fields: NewTask) -> Result<Task> {
        Ok(self.add_with_outcome(owner_id, fields).await?.task)
    }

    pub async fn add_with_outcome(&self, owner_id: &str, fields: NewTask) -> Result<Mutation> {
        if owner_id.trim().is_empty() {
            return Err(Error::Unauthenticated);
        }
        let task = Task::new(owner_id, fields, Utc::now());
        debug!(id = %task.id, "adding task");
        self.write_then_push(task).await
    }

    /// Merge `patch` onto an existing task
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        Ok(self.update_with_outcome(id, patch).await?.task)
    }

    pub async fn update_with_outcome(&self, id: &str, patch: TaskPatch) -> Result<Mutation> {
        self.mutate(id, |task| task.apply(patch)).await
    }

    /// Flip the completed flag
    pub async fn toggle_completed(&self, id: &str) -> Result<Task> {
        let mutation = self
            .mutate(id, |task| task.completed = !task.completed)
            .await?;
        Ok(mutation.task)
    }

    /// Remove a task locally and, if reachable, fire a detached remote delete.
    ///
    /// Returns as soon as the local removal is durable. A failed remote delete
    /// is logged only; the local record is never brought back.
    pub async fn delete(&self, id: &str, owner_id: &str) -> Result<()> {
        if owner_id.trim().is_empty() {
            return Err(Error::Unauthenticated);
        }
        if !self.store.remove(id, owner_id)? {
            return Err(Error::not_found(id));
        }

        if !self.connectivity.is_reachable() {
            debug!(id = %id, "offline, remote delete skipped");
            return Ok(());
        }

        let remote = Arc::clone(&self.remote);
        let id = id.to_string();
        self.background.spawn(async move {
            match remote.delete(&id).await {
                Ok(()) => debug!(id = %id, "remote delete done"),
                Err(e) => warn!(id = %id, "remote delete failed: {e}"),
            }
        });
        Ok(())
    }

    /// All tasks of `owner_id` in insertion order
    pub fn tasks(&self, owner_id: &str) -> Result<Vec<Task>> {
        self.store.list(owner_id)
    }

    pub fn task(&self, id: &str) -> Result<Option<Task>> {
        self.store.get(id)
    }

    /// Wait for detached remote deletes to finish. For processes about to exit.
    pub async fn flush_background(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Read the stored task once, change it, restamp it and write it back
    async fn mutate(&self, id: &str, change: impl FnOnce(&mut Task)) -> Result<Mutation> {
        let mut task = self.store.get(id)?.ok_or_else(|| Error::not_found(id))?;
        change(&mut task);
        task.touch(Utc::now());
        self.write_then_push(task).await
    }

    async fn write_then_push(&self, mut task: Task) -> Result<Mutation> {
        task.dirty = true;
        self.store.upsert(&task)?;

        let push = self.push(&task).await?;
        if push == PushOutcome::Converged {
            task.dirty = false;
        }
        Ok(Mutation { task, push })
    }

    async fn push(&self, task: &Task) -> Result<PushOutcome> {
        if !self.connectivity.is_reachable() {
            return Ok(PushOutcome::Skipped);
        }
        match self.remote.put(task).await {
            Ok(()) => {
                if self.store.mark_synced(&task.id, task.updated_at)? {
                    Ok(PushOutcome::Converged)
                } else {
                    debug!(id = %task.id, "task changed during push, left dirty");
                    Ok(PushOutcome::Superseded)
                }
            }
            Err(fault) => {
                warn!(id = %task.id, "remote push failed, will retry on next sync: {fault}");
                Ok(PushOutcome::Deferred(fault))
            }
        }
    }
}
