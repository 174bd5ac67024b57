use crate::custody::InMemoryBank;
use crate::engine::EngineSnapshot;
use crate::error::Result;
use crate::events::EventRecord;
use crate::storage::{EventStore, Storage};
use crate::types::{parse_hash32, Hash32, Height};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// Everything needed to resume a locally simulated engine.
#[derive(Debug, Clone)]
pub struct StoredState {
    pub snapshot: EngineSnapshot,
    pub oracle_height: Height,
    pub oracle_seed: Hash32,
    pub custody: InMemoryBank,
    pub updated_at: DateTime<Utc>,
}

pub struct StateStore<'a> {
    storage: &'a Storage,
}

impl<'a> StateStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_state(&self, state: &StoredState) -> Result<()> {
        let conn = self.storage.get_connection().await;
        Self::write_state(&conn, state)
    }

    /// Journals `events` and persists `state` in one transaction, so the
    /// journal never runs ahead of the stored engine.
    pub async fn save_with_events(&self, state: &StoredState, events: &[EventRecord]) -> Result<()> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;
        EventStore::insert_records(&tx, events)?;
        Self::write_state(&tx, state)?;
        tx.commit()?;

        tracing::debug!(
            "Saved engine state at height {} with {} events",
            state.oracle_height,
            events.len()
        );
        Ok(())
    }

    fn write_state(conn: &Connection, state: &StoredState) -> Result<()> {
        let snapshot = serde_json::to_string(&state.snapshot)?;
        let custody = serde_json::to_string(&state.custody)?;

        conn.execute(
            "INSERT OR REPLACE INTO engine_state (id, snapshot, oracle_height, oracle_seed, custody, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                snapshot,
                state.oracle_height as i64,
                hex::encode(state.oracle_seed),
                custody,
                state.updated_at.timestamp(),
            ],
        )?;

        Ok(())
    }

    pub async fn load_state(&self) -> Result<Option<StoredState>> {
        let conn = self.storage.get_connection().await;

        let row = conn
            .query_row(
                "SELECT snapshot, oracle_height, oracle_seed, custody, updated_at
                 FROM engine_state WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((snapshot, height, seed, custody, updated_at)) = row else {
            return Ok(None);
        };

        Ok(Some(StoredState {
            snapshot: serde_json::from_str(&snapshot)?,
            oracle_height: height as Height,
            oracle_seed: parse_hash32(&seed)?,
            custody: serde_json::from_str(&custody)?,
            updated_at: DateTime::from_timestamp(updated_at, 0).unwrap_or_else(Utc::now),
        }))
    }

    pub async fn has_state(&self) -> Result<bool> {
        let conn = self.storage.get_connection().await;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM engine_state", [], |row| row.get(0))?;
        Ok(count > 0)
    }
}
