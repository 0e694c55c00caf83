pub mod config;
pub mod connectivity;
pub mod error;
pub mod identity;
pub mod models;
pub mod remote;
pub mod service;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use config::Config;
pub use connectivity::{Connectivity, ConnectivitySignal};
pub use error::{Error, RemoteWriteFault, Result};
pub use identity::{Identity, Session};
pub use models::{NewTask, Priority, SortKey, Task, TaskFilter, TaskPatch};
pub use remote::{HttpRemote, MemoryRemote, RemoteStore};
pub use service::TaskService;
pub use store::{SqliteStore, TaskStore};
pub use sync::{PassReport, SyncCoordinator};
