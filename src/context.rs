//! Shared application context.
//!
//! Holds the configured media client and metadata store and runs teardowns
//! on behalf of both the CLI and the HTTP server.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use liveops_core::{ChannelIdentity, ChannelMetadata, Error, Result};
use liveops_media::MediaClient;
use liveops_store::MetadataStore;
use liveops_teardown::{TeardownOrchestrator, TeardownReport, TeardownRequest, TeardownSettings};

use crate::config::Config;

/// Version reported as `operationsVersion`.
pub const OPERATIONS_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub media: Arc<dyn MediaClient>,
    pub store: Arc<dyn MetadataStore>,
    /// Cancelled on shutdown; aborts in-flight stop waits.
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(
        config: Config,
        media: Arc<dyn MediaClient>,
        store: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            media,
            store,
            shutdown: CancellationToken::new(),
        }
    }

    /// Build the media client and metadata store described by `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let media = liveops_media::create_client(&config.media);
        let store = liveops_store::create_store(&config.store)?;
        Ok(Self::new(config, media, store))
    }

    pub fn identity(&self, channel: &str, region: Option<&str>) -> ChannelIdentity {
        ChannelIdentity::new(self.config.media.scope_for(region), channel)
    }

    pub fn orchestrator(&self) -> TeardownOrchestrator {
        TeardownOrchestrator::new(
            self.media.clone(),
            self.store.clone(),
            TeardownSettings::from(&self.config.teardown),
        )
        .with_cancellation(self.shutdown.child_token())
    }

    /// Run a validated teardown request and shape the result for callers.
    pub async fn teardown(&self, request: &TeardownRequest) -> (u16, TeardownReport) {
        let identity = self.identity(&request.channel_name, request.region.as_deref());
        let outcome = self
            .orchestrator()
            .run(&identity, request.delete_asset)
            .await;
        TeardownReport::from_outcome(outcome, OPERATIONS_VERSION)
    }

    /// Write a channel's current state to the metadata store.
    ///
    /// Returns the record and whether the store accepted it (`false` when no
    /// store is configured).
    pub async fn record_metadata(
        &self,
        channel: &str,
        region: Option<&str>,
    ) -> Result<(ChannelMetadata, bool)> {
        let identity = self.identity(channel, region);
        let current = self
            .media
            .get_channel(&identity.scope, channel)
            .await?
            .ok_or_else(|| Error::not_found("live event", channel))?;

        let mut record = ChannelMetadata::new(&identity);
        record.azure_region = region
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        record.resource_state = Some(current.state.to_string());

        let stored = self.store.upsert(&record).await?;
        tracing::info!(id = %record.id, stored, state = %current.state, "Recorded channel metadata");
        Ok((record, stored))
    }

    pub async fn metadata(
        &self,
        channel: &str,
        region: Option<&str>,
    ) -> Result<Option<ChannelMetadata>> {
        self.store.get(&self.identity(channel, region)).await
    }
}
