//! Sync coordinator: reconciliation passes that push every dirty task of the
//! signed-in user to the remote store.
//!
//! A pass goes `Idle -> Running -> Idle`. At most one pass runs per
//! coordinator; asking for a pass while one is running joins it and yields the
//! same report. The pass itself runs on a spawned task, so it always finishes
//! even if every caller stops waiting.

use crate::connectivity::ConnectivitySignal;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::remote::RemoteStore;
use crate::store::TaskStore;
use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Tasks the remote store accepted during this pass
    pub converged: usize,
    /// Tasks whose remote write failed; they stay dirty
    pub failed: usize,
}

type PassHandle = Shared<BoxFuture<'static, Result<PassReport>>>;

enum PassState {
    Idle,
    Running(PassHandle),
}

struct Inner {
    store: Arc<dyn TaskStore>,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<dyn ConnectivitySignal>,
    identity: Arc<dyn Identity>,
    state: Mutex<PassState>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, PassState> {
        // Poisoning only means a pass panicked; the token is always whole
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn execute_pass(&self) -> Result<PassReport> {
        let owner = self
            .identity
            .current_user_id()
            .ok_or(Error::Unauthenticated)?;
        if !self.connectivity.is_reachable() {
            return Err(Error::Offline);
        }

        // The working set is fixed here; later edits wait for the next pass
        let working_set = self.store.list_dirty(&owner)?;
        info!(owner = %owner, dirty = working_set.len(), "sync pass started");

        let mut report = PassReport::default();
        for task in working_set {
            match self.remote.put(&task).await {
                Ok(()) => {
                    if !self.store.mark_synced(&task.id, task.updated_at)? {
                        debug!(id = %task.id, "task changed mid-pass, stays dirty");
                    }
                    report.converged += 1;
                }
                Err(fault) => {
                    warn!(id = %task.id, "push failed: {fault}");
                    report.failed += 1;
                }
            }
        }

        self.store.record_pass(&owner, Utc::now())?;
        info!(
            owner = %owner,
            converged = report.converged,
            failed = report.failed,
            "sync pass finished"
        );
        Ok(report)
    }
}

/// Puts the token back to `Idle` when the pass task ends, panics included
struct IdleOnExit(Arc<Inner>);

impl Drop for IdleOnExit {
    fn drop(&mut self) {
        *self.0.state() = PassState::Idle;
    }
}

/// Drives dirty tasks of the current user to the remote store
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn TaskStore>,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<dyn ConnectivitySignal>,
        identity: Arc<dyn Identity>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                remote,
                connectivity,
                identity,
                state: Mutex::new(PassState::Idle),
            }),
        }
    }

    /// Run a reconciliation pass, or join the one already running.
    ///
    /// Fails with `Unauthenticated` or `Offline` before touching anything;
    /// neither is retried here. Individual remote failures only show up in
    /// `PassReport::failed`.
    pub async fn run_sync_pass(&self) -> Result<PassReport> {
        self.begin_or_join().await
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.inner.state(), PassState::Running(_))
    }

    /// Number of dirty tasks of the current user, read straight from the store.
    /// May race with an in-flight pass.
    pub fn pending_count(&self) -> Result<usize> {
        match self.inner.identity.current_user_id() {
            Some(owner) => self.inner.store.count_dirty(&owner),
            None => Ok(0),
        }
    }

    /// Completion time of the last pass that got past its preconditions
    pub fn last_pass_at(&self) -> Result<Option<DateTime<Utc>>> {
        match self.inner.identity.current_user_id() {
            Some(owner) => self.inner.store.last_pass(&owner),
            None => Ok(None),
        }
    }

    /// Run a pass on every unreachable -> reachable transition of `rx`.
    /// The listener ends when the signal's sender is dropped.
    pub fn watch_connectivity(&self, mut rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let coordinator = self.clone();
        // Baseline is taken before spawning so a transition racing the spawn is not lost
        let mut was_reachable = *rx.borrow_and_update();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let reachable = *rx.borrow_and_update();
                if reachable && !was_reachable {
                    info!("connectivity regained, starting sync pass");
                    match coordinator.run_sync_pass().await {
                        Ok(report) => debug!(?report, "reconnect sync done"),
                        Err(e) => warn!("reconnect sync failed: {e}"),
                    }
                }
                was_reachable = reachable;
            }
        })
    }

    fn begin_or_join(&self) -> PassHandle {
        let mut state = self.inner.state();
        if let PassState::Running(handle) = &*state {
            debug!("sync pass already running, joining it");
            return handle.clone();
        }

        let inner = Arc::clone(&self.inner);
        let join = tokio::spawn(async move {
            let _idle = IdleOnExit(Arc::clone(&inner));
            let result = inner.execute_pass().await;
            if let Err(Error::StorageFault(msg)) = &result {
                error!("sync pass aborted by local storage fault: {msg}");
            }
            result
        });

        let handle = join
            .map(|joined| {
                joined.unwrap_or_else(|e| Err(Error::PassAborted(e.to_string())))
            })
            .boxed()
            .shared();
        *state = PassState::Running(handle.clone());
        handle
    }
}
