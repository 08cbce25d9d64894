//! liveops-store: persistence of per-channel metadata documents.
//!
//! The teardown flow only needs to drop a channel's record once the channel
//! itself is gone, but the store also supports upserting and reading the
//! record. Three backends are provided:
//!
//! - [`CosmosStore`]: Cosmos DB SQL API over REST (master-key auth).
//! - [`SqliteStore`]: embedded SQLite database with migrations.
//! - [`DisabledStore`]: no store configured; every call reports `false`.

mod cosmos;
pub mod migrations;
mod sqlite;

pub use cosmos::CosmosStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use liveops_core::config::{StoreBackend, StoreConfig};
use liveops_core::{ChannelIdentity, ChannelMetadata, Result};

/// Channel metadata persistence.
///
/// `upsert` and `delete` return `Ok(false)` (not an error) when the store is
/// not configured; callers decide whether that deserves a warning.
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    /// Backend name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Create or replace a channel's record.
    async fn upsert(&self, record: &ChannelMetadata) -> Result<bool>;

    /// Remove a channel's record. A record that is already absent counts as
    /// removed.
    async fn delete(&self, identity: &ChannelIdentity) -> Result<bool>;

    async fn get(&self, identity: &ChannelIdentity) -> Result<Option<ChannelMetadata>>;
}

/// Store used when no backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStore;

#[async_trait::async_trait]
impl MetadataStore for DisabledStore {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn upsert(&self, _record: &ChannelMetadata) -> Result<bool> {
        Ok(false)
    }

    async fn delete(&self, _identity: &ChannelIdentity) -> Result<bool> {
        Ok(false)
    }

    async fn get(&self, _identity: &ChannelIdentity) -> Result<Option<ChannelMetadata>> {
        Ok(None)
    }
}

/// Build the configured metadata store.
///
/// A Cosmos backend without endpoint or key falls back to [`DisabledStore`]
/// so that teardown still runs and reports the missing store as a warning.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn MetadataStore>> {
    match config.backend {
        StoreBackend::Disabled => Ok(Arc::new(DisabledStore)),
        StoreBackend::Cosmos => match CosmosStore::from_config(&config.cosmos)? {
            Some(store) => Ok(Arc::new(store)),
            None => {
                tracing::warn!("Cosmos store selected but endpoint or key is missing");
                Ok(Arc::new(DisabledStore))
            }
        },
        StoreBackend::Sqlite => {
            let store = SqliteStore::open(&config.sqlite.path)?;
            tracing::info!("SQLite metadata store at {}", config.sqlite.path.display());
            Ok(Arc::new(store))
        }
    }
}
