//! Database module - persistence port for the application state blob

use std::cell::RefCell;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::StoreError;
use crate::model::AppState;

/// Fixed key the whole state is stored under
pub const STORAGE_KEY: &str = "wykuci_black_edition_v3";

type Result<T> = std::result::Result<T, StoreError>;

/// Load/save pair for the whole application state
pub trait StateStore {
    /// `None` when nothing has been saved yet
    fn load(&self) -> Result<Option<AppState>>;
    fn save(&self, state: &AppState) -> Result<()>;
    /// Account reset
    fn clear(&self) -> Result<()>;
}

/// SQLite-backed store
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self { conn: Connection::open_in_memory()? };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS app_state (
                key TEXT PRIMARY KEY,
                blob TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl StateStore for Database {
    fn load(&self) -> Result<Option<AppState>> {
        let blob: Option<String> = self
            .conn
            .query_row(
                "SELECT blob FROM app_state WHERE key = ?1",
                params![STORAGE_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match blob {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &AppState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.conn.execute(
            "INSERT INTO app_state (key, blob, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET blob = excluded.blob, updated_at = excluded.updated_at",
            params![STORAGE_KEY, json, Utc::now().to_rfc3339()],
        )?;
        debug!(bytes = json.len(), "state saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM app_state WHERE key = ?1", params![STORAGE_KEY])?;
        Ok(())
    }
}

/// In-process store, used by tests and dry runs.
///
/// `fail_saves` makes every save fail, to exercise error paths.
#[derive(Default)]
pub struct MemoryStore {
    blob: RefCell<Option<String>>,
    pub fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { blob: RefCell::new(None), fail_saves: true }
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<AppState>> {
        match self.blob.borrow().as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &AppState) -> Result<()> {
        if self.fail_saves {
            return Err(StoreError::Unavailable("save disabled".into()));
        }
        *self.blob.borrow_mut() = Some(serde_json::to_string(state)?);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.blob.borrow_mut() = None;
        Ok(())
    }
}
