use crate::error::RemoteWriteFault;
use crate::models::Task;
use crate::remote::{RemoteStore, RemoteTask};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-process remote store.
///
/// Holds documents in a map and can be told to fail writes for specific ids,
/// fail everything, or answer slowly. Call counters make it usable as a probe
/// of what the sync engine actually sent.
#[derive(Default)]
pub struct MemoryRemote {
    documents: Mutex<HashMap<String, RemoteTask>>,
    failing_ids: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    latency: Mutex<Option<Duration>>,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write touching `id` fail until cleared
    pub fn fail_id(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_ids.lock().unwrap().clear();
        self.fail_all.store(false, Ordering::SeqCst);
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn document(&self, id: &str) -> Option<RemoteTask> {
        self.documents.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    async fn simulate(&self, id: &str) -> Result<(), RemoteWriteFault> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_all.load(Ordering::SeqCst) || self.failing_ids.lock().unwrap().contains(id) {
            return Err(RemoteWriteFault::Transport(format!(
                "injected failure for {id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn put(&self, task: &Task) -> Result<(), RemoteWriteFault> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(&task.id).await?;
        self.documents
            .lock()
            .unwrap()
            .insert(task.id.clone(), RemoteTask::from(task));
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteWriteFault> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(id).await?;
        self.documents.lock().unwrap().remove(id);
        Ok(())
    }
}
