//! SQLite-backed counter store.
//!
//! One row per `(owner_id, name)`. Conditional writes are single statements
//! whose `rows_affected` tells a commit from a conflict, so the version check
//! and the write happen atomically inside SQLite.

use crate::modules::counters::adapters::outbound::counter_store::{
    CounterStore, CounterStoreError,
};
use crate::modules::counters::core::counter_key::CounterKey;
use crate::modules::counters::core::counter_record::{CounterRecord, Version};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TABLE_NAME: &str = "named_counters";

impl From<sqlx::Error> for CounterStoreError {
    fn from(error: sqlx::Error) -> Self {
        CounterStoreError::Unavailable(error.to_string())
    }
}

pub struct SqliteCounterStore {
    pool: Pool<Sqlite>,
    table: String,
}

impl SqliteCounterStore {
    /// Opens (creating if missing) the database at `url`.
    ///
    /// The table itself is only created by [`CounterStore::ensure_container_exists`].
    pub async fn connect(
        url: &str,
        table: &str,
        max_connections: u32,
    ) -> Result<Self, CounterStoreError> {
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Concurrent writers wait on the lock instead of failing outright.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(opts)
            .await?;

        tracing::info!(url, table, max_connections, "Connected to SQLite counter store");
        Self::from_pool(pool, table)
    }

    pub fn from_pool(pool: Pool<Sqlite>, table: &str) -> Result<Self, CounterStoreError> {
        if !is_valid_table_name(table) {
            return Err(CounterStoreError::Unavailable(format!(
                "invalid table name: {table:?}"
            )));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }
}

// The table name is interpolated into SQL, so only plain identifiers pass.
fn is_valid_table_name(table: &str) -> bool {
    let mut chars = table.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    async fn ensure_container_exists(&self) -> Result<bool, CounterStoreError> {
        let existed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(&self.table)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                value INTEGER NOT NULL,
                version TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (owner_id, name)
            )",
            self.table
        ))
        .execute(&self.pool)
        .await?;

        Ok(!existed)
    }

    async fn get(&self, key: &CounterKey) -> Result<Option<CounterRecord>, CounterStoreError> {
        let row: Option<(i64, String)> = sqlx::query_as(&format!(
            "SELECT value, version FROM {} WHERE owner_id = ? AND name = ?",
            self.table
        ))
        .bind(key.owner_id())
        .bind(key.name())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(value, version)| {
            CounterRecord::new(key.clone(), value, Version::from(version))
        }))
    }

    async fn insert_if_absent(&self, record: &CounterRecord) -> Result<(), CounterStoreError> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (owner_id, name, value, version, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (owner_id, name) DO NOTHING",
            self.table
        ))
        .bind(record.key.owner_id())
        .bind(record.key.name())
        .bind(record.value)
        .bind(record.version.as_str())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CounterStoreError::Conflict);
        }
        Ok(())
    }

    async fn replace_if_version_matches(
        &self,
        record: &CounterRecord,
        expected_version: &Version,
    ) -> Result<(), CounterStoreError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET value = ?, version = ?, updated_at = ?
             WHERE owner_id = ? AND name = ? AND version = ?",
            self.table
        ))
        .bind(record.value)
        .bind(record.version.as_str())
        .bind(Utc::now().timestamp_millis())
        .bind(record.key.owner_id())
        .bind(record.key.name())
        .bind(expected_version.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CounterStoreError::Conflict);
        }
        Ok(())
    }
}
