//! Error types shared by the store, the mutation pipeline and the sync coordinator.

use thiserror::Error;

/// Errors surfaced to callers of the task service and the sync coordinator.
///
/// Remote failures never show up here: they are absorbed into the dirty flag
/// and the pending count. The variants carry strings so results can be shared
/// between every caller that joined the same sync pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No signed-in user
    #[error("not signed in")]
    Unauthenticated,

    /// Remote store unreachable when a sync pass was requested
    #[error("remote store is unreachable")]
    Offline,

    /// Local persistence failed; durability of the change is not guaranteed
    #[error("could not save locally: {0}")]
    StorageFault(String),

    /// No task with this id in the local store
    #[error("task not found: {0}")]
    NotFound(String),

    /// The background task running a sync pass died before reporting
    #[error("sync pass aborted: {0}")]
    PassAborted(String),
}

impl Error {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageFault(message.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::StorageFault(err.to_string())
    }
}

impl From<r2d2::Error> for Error {
    fn from(err: r2d2::Error) -> Self {
        Self::StorageFault(format!("connection pool: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single remote write. Retrying is the sync coordinator's job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteWriteFault {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote call timed out")]
    Timeout,

    #[error("remote store denied the write")]
    PermissionDenied,

    #[error("remote store rejected the write with status {status}")]
    Rejected { status: u16 },
}

impl From<reqwest::Error> for RemoteWriteFault {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}
