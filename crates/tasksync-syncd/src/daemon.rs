use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tasksync_core::config::{expand_tilde, SyncSettings};
use tasksync_core::{
    Config, Connectivity, ConnectivitySignal, HttpRemote, PassReport, Session, SqliteStore,
    SyncCoordinator,
};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Keeps the connectivity signal current and drives sync passes
pub struct Daemon {
    remote: Arc<HttpRemote>,
    connectivity: Arc<Connectivity>,
    coordinator: SyncCoordinator,
    settings: SyncSettings,
}

impl Daemon {
    pub fn from_config(config: &Config) -> Result<Self> {
        let remote = HttpRemote::from_config(&config.remote)?
            .context("No remote configured. Set [remote] url in the config file")?;

        let database_path = expand_tilde(&config.store.database_path.to_string_lossy())?;
        let store = Arc::new(
            SqliteStore::open(&database_path)
                .with_context(|| format!("Failed to open task store {}", database_path.display()))?,
        );

        if config.auth.user_id.is_none() {
            warn!("No user signed in; sync passes will be refused until 'tasksync login'");
        }
        let session = Arc::new(Session::new(config.auth.user_id.clone()));

        let remote = Arc::new(remote);
        let connectivity = Arc::new(Connectivity::new(false));
        let coordinator =
            SyncCoordinator::new(store, remote.clone(), connectivity.clone(), session);

        Ok(Self {
            remote,
            connectivity,
            coordinator,
            settings: config.sync.clone(),
        })
    }

    /// Probe the remote once and feed the result into the connectivity signal
    pub async fn probe_once(&self) -> bool {
        let reachable = self.remote.probe().await;
        if self.connectivity.set_reachable(reachable) {
            if reachable {
                info!("remote store reachable");
            } else {
                warn!("remote store unreachable, pending tasks will wait");
            }
        }
        reachable
    }

    /// Run a pass if the remote is currently reachable
    pub async fn periodic_pass(&self) -> Option<PassReport> {
        if !self.connectivity.is_reachable() {
            debug!("skipping periodic sync, offline");
            return None;
        }
        match self.coordinator.run_sync_pass().await {
            Ok(report) => {
                if report.converged > 0 || report.failed > 0 {
                    info!(
                        converged = report.converged,
                        failed = report.failed,
                        "periodic sync done"
                    );
                }
                Some(report)
            }
            Err(e) => {
                warn!("periodic sync failed: {e}");
                None
            }
        }
    }

    /// Main loop: probe, reconnect-triggered passes, periodic passes, until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let listener = self
            .coordinator
            .watch_connectivity(self.connectivity.subscribe());

        let mut probe_tick = interval(Duration::from_secs(self.settings.probe_interval_seconds.max(1)));
        probe_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sync_tick = interval(Duration::from_secs(self.settings.interval_seconds.max(1)));
        sync_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first pass comes from the reconnect listener, not from the timer
        sync_tick.tick().await;

        loop {
            tokio::select! {
                _ = probe_tick.tick() => {
                    self.probe_once().await;
                }

                _ = sync_tick.tick() => {
                    self.periodic_pass().await;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping tasksync-syncd");
                    break;
                }
            }
        }

        listener.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasksync_core::{NewTask, TaskService, TaskStore};

    fn config_for(server_url: Option<String>, dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.remote.url = server_url;
        config.store.database_path = dir.path().join("tasks.db");
        config.auth.user_id = Some("alice".into());
        config
    }

    #[test]
    fn requires_a_remote() {
        let dir = tempfile::tempdir().unwrap();
        let err = Daemon::from_config(&config_for(None, &dir)).err().unwrap();
        assert!(err.to_string().contains("No remote configured"));
    }

    #[tokio::test]
    async fn probe_drives_connectivity() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let daemon = Daemon::from_config(&config_for(Some(server.url()), &dir)).unwrap();

        let up = server
            .mock("GET", "/api/health")
            .with_status(200)
            .create_async()
            .await;
        assert!(daemon.probe_once().await);
        assert!(daemon.connectivity.is_reachable());
        up.assert_async().await;
        up.remove_async().await;

        server
            .mock("GET", "/api/health")
            .with_status(503)
            .create_async()
            .await;
        assert!(!daemon.probe_once().await);
        assert!(!daemon.connectivity.is_reachable());
    }

    #[tokio::test]
    async fn periodic_pass_pushes_tasks_written_by_another_process() {
        let mut server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(Some(server.url()), &dir);

        // Written offline, the way the CLI would
        let cli_store = Arc::new(SqliteStore::open(&config.store.database_path).unwrap());
        let offline_service = TaskService::new(
            cli_store.clone(),
            Arc::new(tasksync_core::MemoryRemote::new()),
            Arc::new(Connectivity::new(false)),
        );
        let task = offline_service
            .add("alice", NewTask::titled("from the cli"))
            .await
            .unwrap();

        let daemon = Daemon::from_config(&config).unwrap();
        assert_eq!(daemon.periodic_pass().await, None);

        server
            .mock("GET", "/api/health")
            .with_status(200)
            .create_async()
            .await;
        let put = server
            .mock("PUT", format!("/api/tasks/{}", task.id).as_str())
            .with_status(200)
            .create_async()
            .await;

        assert!(daemon.probe_once().await);
        let report = daemon.periodic_pass().await.unwrap();
        assert_eq!(report, PassReport { converged: 1, failed: 0 });
        put.assert_async().await;
        assert!(!cli_store.get(&task.id).unwrap().unwrap().dirty);
        assert_eq!(daemon.coordinator.pending_count().unwrap(), 0);
    }
}
