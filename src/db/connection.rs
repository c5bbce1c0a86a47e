use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use log::{error, info};
use rusqlite::Connection;

use super::migrations::run_migrations;

/// Shared handle to the cache database.
///
/// Work runs synchronously on the calling thread; the mutex only serializes
/// access to the single connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<Arc<PathBuf>>,
}

impl Database {
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open SQLite database {}", db_path.display()))?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("Failed to enable WAL mode: {err}");
        }

        let database = Self::initialize(conn, Some(db_path))?;
        if let Some(path) = database.path() {
            info!("Cache database initialized at {}", path.display());
        }
        Ok(database)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::initialize(conn, None)
    }

    fn initialize(mut conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        // Commits must be on disk before a replace returns.
        conn.pragma_update(None, "synchronous", "FULL")
            .context("failed to set synchronous pragma")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("failed to enable foreign keys")?;
        run_migrations(&mut conn).context("failed to run database migrations")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: db_path.map(Arc::new),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref().map(PathBuf::as_path)
    }

    pub fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        task(&mut guard)
    }
}
