use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tasksync_core::config::expand_tilde;
use tasksync_core::{
    Config, Connectivity, ConnectivitySignal, HttpRemote, Identity, MemoryRemote, RemoteStore,
    Session, SqliteStore, SyncCoordinator, TaskService,
};
use tracing::{debug, info};

/// Everything one CLI invocation needs, wired from the config
pub struct App {
    pub service: TaskService,
    pub coordinator: SyncCoordinator,
    pub session: Arc<Session>,
    pub connectivity: Arc<Connectivity>,
    pub remote_url: Option<String>,
    pub database_path: std::path::PathBuf,
}

impl App {
    /// Open the local store and, unless `offline`, probe the remote once
    pub async fn open(config: &Config, offline: bool) -> Result<Self> {
        let database_path = expand_tilde(&config.store.database_path.to_string_lossy())?;
        let store = Arc::new(
            SqliteStore::open(&database_path)
                .with_context(|| format!("Failed to open task store {}", database_path.display()))?,
        );

        let session = Arc::new(Session::new(config.auth.user_id.clone()));
        let connectivity = Arc::new(Connectivity::new(false));

        let remote: Arc<dyn RemoteStore> = match HttpRemote::from_config(&config.remote)? {
            Some(http) => {
                if offline {
                    debug!("--offline given, remote not probed");
                } else if http.probe().await {
                    connectivity.set_reachable(true);
                } else {
                    info!("remote store unreachable, working offline");
                }
                Arc::new(http)
            }
            // Local-only: connectivity never turns true, so this is never written to
            None => Arc::new(MemoryRemote::new()),
        };

        let service = TaskService::new(store.clone(), remote.clone(), connectivity.clone());
        let coordinator =
            SyncCoordinator::new(store, remote, connectivity.clone(), session.clone());

        Ok(Self {
            service,
            coordinator,
            session,
            connectivity,
            remote_url: config.remote.url.clone().filter(|u| !u.trim().is_empty()),
            database_path,
        })
    }

    /// Id of the signed-in user, or a hint on how to sign in
    pub fn owner(&self) -> Result<String> {
        match self.session.current_user_id() {
            Some(id) => Ok(id),
            None => bail!("Not signed in. Run 'tasksync login <user-id>' first"),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.connectivity.is_reachable()
    }

    /// Resolve a full id or a unique prefix among the owner's tasks
    pub fn resolve_id(&self, owner: &str, id_or_prefix: &str) -> Result<String> {
        let needle = id_or_prefix.trim();
        if needle.is_empty() {
            bail!("Task id must not be empty");
        }
        let tasks = self.service.tasks(owner)?;
        if let Some(exact) = tasks.iter().find(|t| t.id == needle) {
            return Ok(exact.id.clone());
        }

        let matches: Vec<&str> = tasks
            .iter()
            .filter(|t| t.id.starts_with(needle))
            .map(|t| t.id.as_str())
            .collect();
        match matches.as_slice() {
            [one] => Ok(one.to_string()),
            [] => bail!("No task matching '{}'", needle),
            many => bail!(
                "'{}' is ambiguous, matches {} tasks. Use more characters",
                needle,
                many.len()
            ),
        }
    }
}
