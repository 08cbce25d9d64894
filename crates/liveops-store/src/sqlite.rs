//! Embedded SQLite metadata store.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OptionalExtension;

use liveops_core::{metadata_id, ChannelIdentity, ChannelMetadata, Error, Result};

use crate::migrations;
use crate::MetadataStore;

type DbPool = Pool<SqliteConnectionManager>;

/// Metadata store keeping one JSON document per channel in SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and run pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_manager(SqliteConnectionManager::file(path), 4)
    }

    /// In-memory database. A single pooled connection keeps the data alive
    /// for the lifetime of the store.
    pub fn in_memory() -> Result<Self> {
        Self::with_manager(SqliteConnectionManager::memory(), 1)
    }

    fn with_manager(manager: SqliteConnectionManager, max_size: u32) -> Result<Self> {
        let pool = Pool::builder()
            .max_size(max_size)
            .build(manager)
            .map_err(|e| Error::store(format!("failed to create connection pool: {e}")))?;

        let conn = pool
            .get()
            .map_err(|e| Error::store(format!("failed to get connection for migrations: {e}")))?;
        let applied = migrations::run_migrations(&conn)
            .map_err(|e| Error::store(format!("failed to run migrations: {e}")))?;
        if applied > 0 {
            tracing::info!(applied, "Applied metadata store migrations");
        }
        drop(conn);

        Ok(Self { pool })
    }

    /// Run a closure on a pooled connection off the async runtime.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| Error::store(format!("failed to get connection from pool: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("store task failed: {e}")))?
    }
}

#[async_trait::async_trait]
impl MetadataStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn upsert(&self, record: &ChannelMetadata) -> Result<bool> {
        let document = serde_json::to_string(record)
            .map_err(|e| Error::Internal(format!("failed to encode metadata: {e}")))?;
        let id = record.id.clone();
        let live_event_name = record.live_event_name.clone();
        let account_name = record.ams_account_name.clone();
        let updated_at = record.last_updated.to_rfc3339();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO channel_metadata (id, live_event_name, account_name, document, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    live_event_name = excluded.live_event_name,
                    account_name = excluded.account_name,
                    document = excluded.document,
                    updated_at = excluded.updated_at",
                rusqlite::params![id, live_event_name, account_name, document, updated_at],
            )
            .map_err(Error::store)?;
            Ok(true)
        })
        .await
    }

    async fn delete(&self, identity: &ChannelIdentity) -> Result<bool> {
        let id = metadata_id(identity);
        self.with_conn(move |conn| {
            let removed = conn
                .execute("DELETE FROM channel_metadata WHERE id = ?1", [&id])
                .map_err(Error::store)?;
            if removed == 0 {
                tracing::debug!(id = %id, "Metadata record already absent");
            }
            Ok(true)
        })
        .await
    }

    async fn get(&self, identity: &ChannelIdentity) -> Result<Option<ChannelMetadata>> {
        let id = metadata_id(identity);
        self.with_conn(move |conn| {
            let document: Option<String> = conn
                .query_row(
                    "SELECT document FROM channel_metadata WHERE id = ?1",
                    [&id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(Error::store)?;

            document
                .map(|doc| {
                    serde_json::from_str(&doc)
                        .map_err(|e| Error::store(format!("corrupt metadata document {id}: {e}")))
                })
                .transpose()
        })
        .await
    }
}
