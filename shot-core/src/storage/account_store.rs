use crate::error::{Result, ShotError};
use crate::storage::Storage;
use crate::types::AccountId;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub name: String,
    pub id: AccountId,
    pub created_at: DateTime<Utc>,
}

/// Human-readable names for account ids.
pub struct AccountStore<'a> {
    storage: &'a Storage,
}

impl<'a> AccountStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_account(&self, name: &str, id: AccountId) -> Result<AccountRecord> {
        if name.trim().is_empty() {
            return Err(ShotError::invalid_input("Account name cannot be empty"));
        }

        let conn = self.storage.get_connection().await;

        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(ShotError::invalid_input(format!(
                "Account '{}' already exists",
                name
            )));
        }

        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO accounts (name, id, created_at) VALUES (?1, ?2, ?3)",
            params![name, id.to_string(), created_at.timestamp()],
        )?;

        Ok(AccountRecord {
            name: name.to_string(),
            id,
            created_at,
        })
    }

    pub async fn get_account(&self, name: &str) -> Result<Option<AccountRecord>> {
        let conn = self.storage.get_connection().await;

        let row = conn
            .query_row(
                "SELECT name, id, created_at FROM accounts WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(Self::decode).transpose()
    }

    pub async fn find_by_id(&self, id: &AccountId) -> Result<Option<AccountRecord>> {
        let conn = self.storage.get_connection().await;

        let row = conn
            .query_row(
                "SELECT name, id, created_at FROM accounts WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(Self::decode).transpose()
    }

    pub async fn list_accounts(&self) -> Result<Vec<AccountRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare("SELECT name, id, created_at FROM accounts ORDER BY created_at, name")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(Self::decode(row?)?);
        }
        Ok(accounts)
    }

    fn decode((name, id, created_at): (String, String, i64)) -> Result<AccountRecord> {
        Ok(AccountRecord {
            name,
            id: id.parse()?,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
        })
    }
}
