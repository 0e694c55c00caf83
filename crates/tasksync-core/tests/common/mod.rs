#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tasksync_core::{
    Connectivity, Error, MemoryRemote, Result, Session, SqliteStore, SyncCoordinator, Task,
    TaskService, TaskStore,
};
use tempfile::TempDir;

pub const USER: &str = "user-1";

/// One client: local store, in-memory remote, connectivity and session,
/// wired into a service and a coordinator the same way the binaries do.
pub struct Client<S = SqliteStore> {
    pub _dir: TempDir,
    pub store: Arc<S>,
    pub remote: Arc<MemoryRemote>,
    pub connectivity: Arc<Connectivity>,
    pub session: Arc<Session>,
    pub service: TaskService,
    pub coordinator: SyncCoordinator,
}

fn open_sqlite(dir: &TempDir) -> SqliteStore {
    SqliteStore::open(&dir.path().join("tasks.db")).expect("open store")
}

fn wire<S: TaskStore + 'static>(dir: TempDir, store: Arc<S>, reachable: bool) -> Client<S> {
    let remote = Arc::new(MemoryRemote::new());
    let connectivity = Arc::new(Connectivity::new(reachable));
    let session = Arc::new(Session::new(Some(USER.to_string())));

    let service = TaskService::new(store.clone(), remote.clone(), connectivity.clone());
    let coordinator = SyncCoordinator::new(
        store.clone(),
        remote.clone(),
        connectivity.clone(),
        session.clone(),
    );

    Client {
        _dir: dir,
        store,
        remote,
        connectivity,
        session,
        service,
        coordinator,
    }
}

impl Client {
    pub fn new(reachable: bool) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Arc::new(open_sqlite(&dir));
        wire(dir, store, reachable)
    }
}

impl Client<FaultyStore> {
    /// Client whose local store can be told to fail writes
    pub fn faulty(reachable: bool) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = Arc::new(FaultyStore::new(open_sqlite(&dir)));
        wire(dir, store, reachable)
    }
}

impl<S: TaskStore> Client<S> {
    pub fn dirty_ids(&self) -> Vec<String> {
        self.store
            .list_dirty(USER)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect()
    }
}

/// SQLite store that fails `upsert` or `mark_synced` on demand and counts reads
pub struct FaultyStore {
    inner: SqliteStore,
    fail_upsert: AtomicBool,
    fail_mark_synced: AtomicBool,
    gets: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            fail_upsert: AtomicBool::new(false),
            fail_mark_synced: AtomicBool::new(false),
            gets: AtomicUsize::new(0),
        }
    }

    pub fn fail_upsert(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mark_synced(&self, fail: bool) {
        self.fail_mark_synced.store(fail, Ordering::SeqCst);
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn reset_gets(&self) {
        self.gets.store(0, Ordering::SeqCst);
    }
}

impl TaskStore for FaultyStore {
    fn upsert(&self, task: &Task) -> Result<()> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(Error::storage("disk full"));
        }
        self.inner.upsert(task)
    }

    fn get(&self, id: &str) -> Result<Option<Task>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id)
    }

    fn list(&self, owner_id: &str) -> Result<Vec<Task>> {
        self.inner.list(owner_id)
    }

    fn list_dirty(&self, owner_id: &str) -> Result<Vec<Task>> {
        self.inner.list_dirty(owner_id)
    }

    fn count_dirty(&self, owner_id: &str) -> Result<usize> {
        self.inner.count_dirty(owner_id)
    }

    fn remove(&self, id: &str, owner_id: &str) -> Result<bool> {
        self.inner.remove(id, owner_id)
    }

    fn mark_synced(&self, id: &str, updated_at: DateTime<Utc>) -> Result<bool> {
        if self.fail_mark_synced.load(Ordering::SeqCst) {
            return Err(Error::storage("disk I/O error"));
        }
        self.inner.mark_synced(id, updated_at)
    }

    fn record_pass(&self, owner_id: &str, completed_at: DateTime<Utc>) -> Result<()> {
        self.inner.record_pass(owner_id, completed_at)
    }

    fn last_pass(&self, owner_id: &str) -> Result<Option<DateTime<Utc>>> {
        self.inner.last_pass(owner_id)
    }
}
