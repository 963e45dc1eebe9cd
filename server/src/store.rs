//! Per-owner persistence of retained histories.
//!
//! A history is stored whole, as one JSON document per owner, and replaced on
//! every save.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use shared::models::WindObservation;
use std::path::Path;
use std::sync::Mutex;

#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Retained history of an owner; empty when nothing was saved yet.
    async fn load(&self, owner_id: &str) -> Result<Vec<WindObservation>>;

    /// Replace the retained history of an owner.
    async fn save(&self, owner_id: &str, observations: &[WindObservation]) -> Result<()>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_tables(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        f(&conn)
    }
}

/// Initialize the wind_histories table
pub fn init_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS wind_histories (
            owner_id TEXT PRIMARY KEY,
            observations TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
        );
        ",
    )?;
    Ok(())
}

#[async_trait]
impl ObservationStore for SqliteStore {
    async fn load(&self, owner_id: &str) -> Result<Vec<WindObservation>> {
        let json: Option<String> = self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    "SELECT observations FROM wind_histories WHERE owner_id = ?1",
                    params![owner_id],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match json {
            Some(json) => serde_json::from_str(&json)
                .with_context(|| format!("Corrupt wind history for owner {}", owner_id)),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, owner_id: &str, observations: &[WindObservation]) -> Result<()> {
        let json = serde_json::to_string(observations)?;
        let now = chrono::Utc::now().timestamp_millis();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO wind_histories (owner_id, observations, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(owner_id) DO UPDATE SET observations=excluded.observations, updated_at=excluded.updated_at",
                params![owner_id, json, now],
            )?;
            Ok(())
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn obs(owner_id: &str, timestamp_millis: i64) -> WindObservation {
        WindObservation {
            id: format!("wind_{}", timestamp_millis),
            timestamp_millis,
            date: "17/07/2025".to_string(),
            time: "11:27".to_string(),
            min_speed_knots: 6,
            avg_speed_knots: 7,
            gust_speed_knots: 9,
            direction: "ENE".to_string(),
            degrees: 67,
            temperature_celsius: 30,
            owner_id: owner_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_missing_owner_is_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_replaces_history() {
        let store = SqliteStore::open_in_memory().unwrap();

        store
            .save("alice", &[obs("alice", 2), obs("alice", 1)])
            .await
            .unwrap();
        store.save("alice", &[obs("alice", 3)]).await.unwrap();

        let loaded = store.load("alice").await.unwrap();
        assert_eq!(loaded, vec![obs("alice", 3)]);
    }

    #[tokio::test]
    async fn test_histories_are_partitioned_by_owner() {
        let store = SqliteStore::open_in_memory().unwrap();

        store.save("alice", &[obs("alice", 1)]).await.unwrap();
        store.save("bob", &[obs("bob", 2), obs("bob", 1)]).await.unwrap();

        assert_eq!(store.load("alice").await.unwrap().len(), 1);
        let bob = store.load("bob").await.unwrap();
        assert_eq!(bob.len(), 2);
        assert!(bob.iter().all(|o| o.owner_id == "bob"));
    }

    #[tokio::test]
    async fn test_history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windlog.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save("alice", &[obs("alice", 1)]).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load("alice").await.unwrap(), vec![obs("alice", 1)]);
    }

    #[tokio::test]
    async fn test_corrupt_history_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO wind_histories (owner_id, observations) VALUES ('alice', 'not json')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        assert!(store.load("alice").await.is_err());
    }
}
