pub mod account_store;
pub mod event_store;
pub mod state_store;

pub use account_store::{AccountRecord, AccountStore};
pub use event_store::EventStore;
pub use state_store::{StateStore, StoredState};

use crate::error::{Result, ShotError};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ShotError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    pub async fn in_memory() -> Result<Self> {
        let storage = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        // Engine state, single row
        conn.execute(
            "CREATE TABLE IF NOT EXISTS engine_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                snapshot TEXT NOT NULL,
                oracle_height INTEGER NOT NULL,
                oracle_seed TEXT NOT NULL,
                custody TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Event journal
        conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                height INTEGER NOT NULL,
                emitted_at INTEGER NOT NULL,
                kind TEXT NOT NULL,
                account TEXT,
                payload TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_account ON events(account)",
            [],
        )?;

        // Named accounts
        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                name TEXT PRIMARY KEY,
                id TEXT UNIQUE NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
