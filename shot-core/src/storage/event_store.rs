use crate::error::Result;
use crate::events::{EventRecord, ShotEvent};
use crate::storage::Storage;
use crate::types::AccountId;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

/// Append-only journal of drained engine events.
pub struct EventStore<'a> {
    storage: &'a Storage,
}

impl<'a> EventStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn append(&self, records: &[EventRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;
        Self::insert_records(&tx, records)?;
        tx.commit()?;

        tracing::debug!("Journaled {} events", records.len());
        Ok(records.len())
    }

    /// Writes `records` on `conn` without committing, so callers can fold
    /// them into a wider transaction.
    pub(crate) fn insert_records(conn: &Connection, records: &[EventRecord]) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT INTO events (height, emitted_at, kind, account, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        for record in records {
            stmt.execute(params![
                record.height as i64,
                record.emitted_at.timestamp_millis(),
                record.event.kind(),
                record.event.account().map(|a| a.to_string()),
                serde_json::to_string(&record.event)?,
            ])?;
        }
        Ok(())
    }

    /// Drops the whole journal. Used when an engine is replaced.
    pub async fn clear(&self) -> Result<usize> {
        let conn = self.storage.get_connection().await;
        let removed = conn.execute("DELETE FROM events", [])?;
        tracing::debug!("Cleared {} journaled events", removed);
        Ok(removed)
    }

    /// Most recent events, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<EventRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT height, emitted_at, payload FROM events ORDER BY seq DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::decode(row?)?);
        }
        Ok(records)
    }

    /// Events concerning `account`, newest first.
    pub async fn list_for_account(&self, account: &AccountId, limit: usize) -> Result<Vec<EventRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT height, emitted_at, payload FROM events
             WHERE account = ?1 ORDER BY seq DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![account.to_string(), limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::decode(row?)?);
        }
        Ok(records)
    }

    pub async fn count(&self) -> Result<u64> {
        let conn = self.storage.get_connection().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn decode((height, emitted_at, payload): (i64, i64, String)) -> Result<EventRecord> {
        let event: ShotEvent = serde_json::from_str(&payload)?;
        Ok(EventRecord {
            height: height as u64,
            emitted_at: DateTime::from_timestamp_millis(emitted_at).unwrap_or_else(Utc::now),
            event,
        })
    }
}
