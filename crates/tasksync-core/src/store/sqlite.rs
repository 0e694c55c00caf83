use crate::error::{Error, Result};
use crate::models::{Priority, Task};
use crate::store::TaskStore;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    completed INTEGER NOT NULL DEFAULT 0,
    priority TEXT NOT NULL DEFAULT 'medium',
    due_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    dirty INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_tasks_owner_dirty ON tasks (owner_id, dirty);
CREATE TABLE IF NOT EXISTS sync_passes (
    owner_id TEXT PRIMARY KEY,
    completed_at TEXT NOT NULL
);";

const COLUMNS: &str =
    "id, owner_id, title, description, completed, priority, due_date, created_at, updated_at, dirty";

/// SQLite-backed task store
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open the database at the given path and initialize tables if needed
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::storage(format!(
                    "failed to create db directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.execute_batch("PRAGMA journal_mode = WAL;")
        });
        let pool = Pool::new(manager)?;

        let store = Self { pool };
        store.init()?;
        debug!(path = %path.display(), "opened task store");
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn init(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn query_tasks(&self, sql: &str, owner_id: &str) -> Result<Vec<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![owner_id], task_from_row)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get(5)?;
    let priority = priority.parse::<Priority>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        completed: row.get(4)?,
        priority,
        due_date: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        dirty: row.get(9)?,
    })
}

impl TaskStore for SqliteStore {
    fn upsert(&self, task: &Task) -> Result<()> {
        // ON CONFLICT keeps the rowid, which is what insertion order is read from
        self.conn()?.execute(
            "INSERT INTO tasks (id, owner_id, title, description, completed, priority, due_date, created_at, updated_at, dirty)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                title = excluded.title,
                description = excluded.description,
                completed = excluded.completed,
                priority = excluded.priority,
                due_date = excluded.due_date,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                dirty = excluded.dirty",
            params![
                task.id,
                task.owner_id,
                task.title,
                task.description,
                task.completed,
                task.priority.as_str(),
                task.due_date,
                task.created_at,
                task.updated_at,
                task.dirty,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.conn()?;
        let task = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    fn list(&self, owner_id: &str) -> Result<Vec<Task>> {
        self.query_tasks(
            &format!("SELECT {COLUMNS} FROM tasks WHERE owner_id = ?1 ORDER BY rowid"),
            owner_id,
        )
    }

    fn list_dirty(&self, owner_id: &str) -> Result<Vec<Task>> {
        self.query_tasks(
            &format!("SELECT {COLUMNS} FROM tasks WHERE owner_id = ?1 AND dirty = 1 ORDER BY rowid"),
            owner_id,
        )
    }

    fn count_dirty(&self, owner_id: &str) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM tasks WHERE owner_id = ?1 AND dirty = 1",
            params![owner_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn remove(&self, id: &str, owner_id: &str) -> Result<bool> {
        let removed = self.conn()?.execute(
            "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        Ok(removed > 0)
    }

    fn mark_synced(&self, id: &str, updated_at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE tasks SET dirty = 0 WHERE id = ?1 AND updated_at = ?2",
            params![id, updated_at],
        )?;
        Ok(changed > 0)
    }

    fn record_pass(&self, owner_id: &str, completed_at: DateTime<Utc>) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO sync_passes (owner_id, completed_at) VALUES (?1, ?2)
             ON CONFLICT(owner_id) DO UPDATE SET completed_at = excluded.completed_at",
            params![owner_id, completed_at],
        )?;
        Ok(())
    }

    fn last_pass(&self, owner_id: &str) -> Result<Option<DateTime<Utc>>> {
        let at = self
            .conn()?
            .query_row(
                "SELECT completed_at FROM sync_passes WHERE owner_id = ?1",
                params![owner_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTask;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = SqliteStore::open(&dir.path().join("nested").join("tasks.db")).expect("open store");
        (dir, store)
    }

    fn task(owner: &str, title: &str) -> Task {
        Task::new(owner, NewTask::titled(title), Utc::now())
    }

    #[test]
    fn upsert_then_get_round_trips_every_field() {
        let (_dir, store) = open_store();
        let mut t = task("alice", "buy milk");
        t.description = "two litres".into();
        t.priority = Priority::High;
        t.due_date = Some(Utc::now() + ChronoDuration::days(1));
        store.upsert(&t).unwrap();

        assert_eq!(store.get(&t.id).unwrap(), Some(t));
    }

    #[test]
    fn list_is_scoped_by_owner_and_keeps_insertion_order() {
        let (_dir, store) = open_store();
        let first = task("alice", "first");
        let second = task("alice", "second");
        let other = task("bob", "not yours");
        store.upsert(&first).unwrap();
        store.upsert(&other).unwrap();
        store.upsert(&second).unwrap();

        // Replacing a row must not move it to the end
        let mut edited = first.clone();
        edited.title = "first, edited".into();
        store.upsert(&edited).unwrap();

        let titles: Vec<_> = store
            .list("alice")
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["first, edited", "second"]);
        assert!(store.list("nobody").unwrap().is_empty());
    }

    #[test]
    fn dirty_queries_follow_the_flag() {
        let (_dir, store) = open_store();
        let dirty = task("alice", "dirty");
        let mut clean = task("alice", "clean");
        clean.dirty = false;
        store.upsert(&dirty).unwrap();
        store.upsert(&clean).unwrap();

        let pending = store.list_dirty("alice").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, dirty.id);
        assert_eq!(store.count_dirty("alice").unwrap(), 1);
        assert_eq!(store.count_dirty("bob").unwrap(), 0);
    }

    #[test]
    fn remove_requires_matching_owner_and_ignores_missing_ids() {
        let (_dir, store) = open_store();
        let t = task("alice", "mine");
        store.upsert(&t).unwrap();

        assert!(!store.remove(&t.id, "bob").unwrap());
        assert!(store.get(&t.id).unwrap().is_some());
        assert!(store.remove(&t.id, "alice").unwrap());
        assert!(store.get(&t.id).unwrap().is_none());
        assert!(!store.remove("does-not-exist", "alice").unwrap());
    }

    #[test]
    fn mark_synced_skips_newer_versions() {
        let (_dir, store) = open_store();
        let pushed = task("alice", "v1");
        store.upsert(&pushed).unwrap();

        let mut newer = pushed.clone();
        newer.title = "v2".into();
        newer.touch(pushed.updated_at + ChronoDuration::milliseconds(5));
        store.upsert(&newer).unwrap();

        assert!(!store.mark_synced(&pushed.id, pushed.updated_at).unwrap());
        assert!(store.get(&pushed.id).unwrap().unwrap().dirty);

        assert!(store.mark_synced(&newer.id, newer.updated_at).unwrap());
        assert!(!store.get(&newer.id).unwrap().unwrap().dirty);
    }

    #[test]
    fn last_pass_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let at = Utc::now();
        {
            let store = SqliteStore::open(&path).unwrap();
            assert_eq!(store.last_pass("alice").unwrap(), None);
            store.record_pass("alice", at).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.last_pass("alice").unwrap(), Some(at));
        assert_eq!(store.last_pass("bob").unwrap(), None);
    }
}
