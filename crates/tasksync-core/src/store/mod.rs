//! Local record store: durable, owner-scoped persistence for tasks.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::models::Task;
use chrono::{DateTime, Utc};

/// Durable keyed storage for tasks.
///
/// Every method is a single atomic statement, so concurrent callers never see
/// a half-written row. Last `upsert` for an id wins; there is no merge.
pub trait TaskStore: Send + Sync {
    /// Insert or fully replace the task stored under `task.id`
    fn upsert(&self, task: &Task) -> Result<()>;

    /// Fetch a task by id regardless of owner
    fn get(&self, id: &str) -> Result<Option<Task>>;

    /// All tasks of `owner_id` in insertion order
    fn list(&self, owner_id: &str) -> Result<Vec<Task>>;

    /// Tasks of `owner_id` not yet confirmed by the remote store, in insertion order
    fn list_dirty(&self, owner_id: &str) -> Result<Vec<Task>>;

    fn count_dirty(&self, owner_id: &str) -> Result<usize>;

    /// Delete the task if it belongs to `owner_id`. Returns whether a row was removed.
    fn remove(&self, id: &str, owner_id: &str) -> Result<bool>;

    /// Clear the dirty flag, but only if the stored version is still the one
    /// stamped `updated_at`. Returns false when the task changed or vanished.
    fn mark_synced(&self, id: &str, updated_at: DateTime<Utc>) -> Result<bool>;

    /// Persist the completion time of the last successful sync pass
    fn record_pass(&self, owner_id: &str, completed_at: DateTime<Utc>) -> Result<()>;

    fn last_pass(&self, owner_id: &str) -> Result<Option<DateTime<Utc>>>;
}
