//! Bridge to the authoritative remote document store.

pub mod http;
pub mod memory;

pub use http::HttpRemote;
pub use memory::MemoryRemote;

use crate::error::RemoteWriteFault;
use crate::models::Task;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-record upsert/delete against the remote store.
///
/// Each call either applies fully or fails; there are no retries at this
/// level. Implementations own their per-call timeout.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Idempotent upsert keyed by `task.id`
    async fn put(&self, task: &Task) -> Result<(), RemoteWriteFault>;

    /// Idempotent delete; an absent document is success
    async fn delete(&self, id: &str) -> Result<(), RemoteWriteFault>;
}

/// Wire form of a task in the remote store. The local dirty flag stays local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTask {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub priority: crate::models::Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for RemoteTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            owner_id: task.owner_id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            completed: task.completed,
            priority: task.priority,
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}
