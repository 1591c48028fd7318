use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{Connection, params};

use super::models::Snapshot;

/// Fixed key the full board snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "current_stages";

/// Durable get/put of the board snapshot. The store holds this behind a
/// trait object injected at construction, so tests swap in [`MemoryStore`]
/// and production wires a [`DbHandle`].
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the persisted snapshot, `None` when nothing was ever saved.
    async fn load(&self) -> Result<Option<Snapshot>>;

    /// Persist the snapshot, replacing whatever was stored before.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Remove the persisted snapshot.
    async fn clear(&self) -> Result<()>;
}

/// Async-safe handle to the snapshot database.
///
/// Wraps `SnapshotDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, preventing synchronous SQLite
/// I/O from tying up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<SnapshotDb>>,
}

impl DbHandle {
    pub fn new(db: SnapshotDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&SnapshotDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

#[async_trait]
impl SnapshotStore for DbHandle {
    async fn load(&self) -> Result<Option<Snapshot>> {
        let raw = self.call(|db| db.get(SNAPSHOT_KEY)).await?;
        match raw {
            Some(json) => {
                let snapshot = serde_json::from_str(&json)
                    .context("Failed to decode stored board snapshot")?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json =
            serde_json::to_string(snapshot).context("Failed to encode board snapshot")?;
        self.call(move |db| db.put(SNAPSHOT_KEY, &json)).await
    }

    async fn clear(&self) -> Result<()> {
        self.call(|db| db.delete(SNAPSHOT_KEY)).await
    }
}

pub struct SnapshotDb {
    conn: Connection,
}

impl SnapshotDb {
    /// Open (or create) a SQLite database at the given path and set up the
    /// snapshots table.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS snapshots (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );",
            )
            .context("Failed to create snapshots table")?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM snapshots WHERE key = ?1")
            .context("Failed to prepare snapshot get")?;
        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .context("Failed to query snapshot")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("Failed to read snapshot row")?)),
            None => Ok(None),
        }
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO snapshots (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                params![key, value],
            )
            .context("Failed to upsert snapshot")?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM snapshots WHERE key = ?1", params![key])
            .context("Failed to delete snapshot")?;
        Ok(())
    }
}

/// In-memory [`SnapshotStore`] double. `failing()` makes every save/clear
/// error and `failing_reads()` makes every load error, for exercising the
/// graceful-degradation paths.
#[derive(Default)]
pub struct MemoryStore {
    value: std::sync::Mutex<Option<String>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        store
    }

    pub fn failing_reads() -> Self {
        let store = Self::default();
        store.fail_reads.store(true, Ordering::SeqCst);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    /// How many saves have succeeded; lets tests assert that seeding
    /// persisted exactly once.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn saved_json(&self) -> Option<String> {
        self.value.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("Simulated storage read failure");
        }
        let guard = self
            .value
            .lock()
            .map_err(|e| anyhow::anyhow!("Store lock poisoned: {}", e))?;
        match guard.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("Simulated storage failure");
        }
        let json = serde_json::to_string(snapshot)?;
        let mut guard = self
            .value
            .lock()
            .map_err(|e| anyhow::anyhow!("Store lock poisoned: {}", e))?;
        *guard = Some(json);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("Simulated storage failure");
        }
        let mut guard = self
            .value
            .lock()
            .map_err(|e| anyhow::anyhow!("Store lock poisoned: {}", e))?;
        *guard = None;
        Ok(())
    }
}
