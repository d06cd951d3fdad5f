//! SQLite-backed journal store: user records and daily entries.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::journal::analysis::{AnalysisResult, Mood};
use crate::journal::gateway::{JournalStore, StoreError, UserFilter};
use crate::journal::user_key::UserKey;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new in-memory database.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Self { conn: Mutex::new(Connection::open_in_memory()?) };
        db.init_schema()?;
        Ok(db)
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Self { conn: Mutex::new(Connection::open(path)?) };
        db.init_schema()?;

        let (users, entries) = db.get_counts()?;
        info!("Loaded database from {:?} ({} users, {} entries)", path, users, entries);
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS users (
                user_key TEXT PRIMARY KEY,
                last_created_session INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entries (
                user_key TEXT NOT NULL,
                date TEXT NOT NULL,
                summary TEXT NOT NULL,
                mood TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (user_key, date)
            );

            CREATE INDEX IF NOT EXISTS idx_users_last_created ON users(last_created_session);
            CREATE INDEX IF NOT EXISTS idx_entries_created ON entries(user_key, created_at);
        "#)?;
        Ok(())
    }

    fn get_counts(&self) -> Result<(i64, i64), StoreError> {
        let conn = self.lock();
        let users = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let entries = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok((users, entries))
    }
}

fn corrupt(key: &str, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt { key: key.to_string(), reason: reason.into() }
}

#[async_trait]
impl JournalStore for Database {
    async fn recent_entries(&self, key: &UserKey, limit: usize) -> Result<Vec<AnalysisResult>, StoreError> {
        let key_str = key.to_string();
        let rows: Vec<(String, String, i64)> = {
            let conn = self.lock();
            let mut stmt = conn.prepare(
                "SELECT summary, mood, created_at FROM entries
                 WHERE user_key = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![key_str, limit as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut entries = Vec::with_capacity(rows.len());
        for (summary, mood, created_at) in rows.into_iter().rev() {
            let mood: Vec<Mood> = serde_json::from_str(&mood)
                .map_err(|e| corrupt(&key_str, format!("mood: {e}")))?;
            let created_at = DateTime::from_timestamp_millis(created_at)
                .ok_or_else(|| corrupt(&key_str, "created_at out of range"))?;
            entries.push(AnalysisResult { summary, mood, created_at });
        }

        debug!("Loaded {} entries for {}", entries.len(), key);
        Ok(entries)
    }

    async fn put_entry(&self, key: &UserKey, date: NaiveDate, entry: &AnalysisResult) -> Result<(), StoreError> {
        let mood = serde_json::to_string(&entry.mood)
            .map_err(|e| corrupt(&key.to_string(), format!("mood: {e}")))?;
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO entries (user_key, date, summary, mood, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key.to_string(),
                date.format("%Y-%m-%d").to_string(),
                entry.summary,
                mood,
                entry.created_at.timestamp_millis()
            ],
        )?;
        Ok(())
    }

    async fn mark_session_started(&self, key: &UserKey, at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO users (user_key, last_created_session) VALUES (?1, ?2)
             ON CONFLICT(user_key) DO UPDATE SET last_created_session = ?2",
            params![key.to_string(), at.timestamp_millis()],
        )?;
        Ok(())
    }

    async fn query_users(&self, filter: UserFilter) -> Result<Vec<UserKey>, StoreError> {
        let (sql, bound) = match filter {
            UserFilter::StartedBefore(t) => (
                "SELECT user_key FROM users WHERE last_created_session < ?1 ORDER BY user_key",
                t,
            ),
            UserFilter::StartedSince(t) => (
                "SELECT user_key FROM users WHERE last_created_session >= ?1 ORDER BY user_key",
                t,
            ),
        };

        let raw: Vec<String> = {
            let conn = self.lock();
            let mut stmt = conn.prepare(sql)?;
            let keys = stmt
                .query_map(params![bound.timestamp_millis()], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            keys
        };

        let mut users = Vec::with_capacity(raw.len());
        for key in raw {
            match key.parse::<UserKey>() {
                Ok(k) => users.push(k),
                Err(e) => warn!("Skipping user record: {e}"),
            }
        }
        Ok(users)
    }
}
