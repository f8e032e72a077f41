use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::oneshot;

pub mod helpers;
pub mod keys;
mod migrations;
pub mod models;
pub mod repositories;

use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to store thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join store thread: {join_err:?}");
            }
        }
    }
}

/// Key-value store backing every persisted entity.
///
/// All access is serialized through one worker thread, so a single
/// `execute` task (and therefore `update_value`) is atomic with respect to
/// other store calls. Sequences of separate calls are not.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Option<Arc<PathBuf>>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create store directory {}", parent.display())
            })?;
        }

        let path_for_thread = db_path.clone();
        let inner = spawn_worker(move || {
            let conn = Connection::open(&path_for_thread)?;
            if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                error!("Failed to enable WAL mode: {err}");
            }
            Ok(conn)
        })?;

        info!("Store initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(inner),
            db_path: Some(Arc::new(db_path)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let inner = spawn_worker(Connection::open_in_memory)?;
        Ok(Self {
            inner: Arc::new(inner),
            db_path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref().map(PathBuf::as_path)
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("Store caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to store thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("store thread terminated unexpectedly"))?
    }

    /// Reads `key`. Missing keys and values that no longer deserialize
    /// into `T` both come back as `None`.
    pub async fn get_value<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let key = key.to_string();
        self.execute(move |conn| read_json(conn, &key)).await
    }

    pub async fn set_value<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let key = key.to_string();
        let serialized = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize '{key}'"))?;
        self.execute(move |conn| write_raw(conn, &key, &serialized))
            .await
    }

    /// Read-modify-write of one key inside a single store task.
    pub async fn update_value<T, R, F>(&self, key: &str, mutate: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize + Default + 'static,
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        let key = key.to_string();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open store transaction")?;
            let mut value: T = read_json(&tx, &key)?.unwrap_or_default();
            let output = mutate(&mut value);
            let serialized = serde_json::to_string(&value)
                .with_context(|| format!("failed to serialize '{key}'"))?;
            write_raw(&tx, &key, &serialized)?;
            tx.commit()
                .with_context(|| format!("failed to commit update of '{key}'"))?;
            Ok(output)
        })
        .await
    }

    pub async fn remove_keys(&self, keys: &[&str]) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        self.execute(move |conn| {
            for key in &keys {
                conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
                    .with_context(|| format!("failed to remove '{key}'"))?;
            }
            Ok(())
        })
        .await
    }

    pub async fn contains_key(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.execute(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM kv_store WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }
}

fn spawn_worker<O>(open: O) -> Result<DatabaseInner>
where
    O: FnOnce() -> rusqlite::Result<Connection> + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
    let (ready_tx, ready_rx) = mpsc::channel();

    let worker = thread::Builder::new()
        .name("focuslens-store".into())
        .spawn(move || {
            let mut conn = match open() {
                Ok(connection) => connection,
                Err(err) => {
                    let _ = ready_tx.send(Err(
                        anyhow::Error::new(err).context("failed to open SQLite store")
                    ));
                    return;
                }
            };

            let init_result = run_migrations(&mut conn).context("failed to run store migrations");
            if ready_tx.send(init_result).is_err() {
                error!("Store initialization receiver dropped before ready signal");
                return;
            }

            while let Ok(command) = command_rx.recv() {
                match command {
                    DbCommand::Execute(task) => task(&mut conn),
                    DbCommand::Shutdown => break,
                }
            }

            info!("Store thread shutting down");
        })
        .context("failed to spawn store worker thread")?;

    ready_rx
        .recv()
        .context("store worker exited before signaling readiness")??;

    Ok(DatabaseInner {
        sender: command_tx,
        worker: Mutex::new(Some(worker)),
    })
}

fn read_json<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to read '{key}'"))?;

    match raw {
        None => Ok(None),
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!("Ignoring malformed value stored under '{key}': {err}");
                Ok(None)
            }
        },
    }
}

fn write_raw(conn: &Connection, key: &str, serialized: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, serialized, Utc::now().to_rfc3339()],
    )
    .with_context(|| format!("failed to write '{key}'"))?;
    Ok(())
}
