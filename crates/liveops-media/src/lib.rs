//! liveops-media: the media-services resource client.
//!
//! [`MediaClient`] is the narrow capability set the teardown flow consumes:
//! read the channel and its dependents, and delete/stop them. The production
//! implementation is [`ArmMediaClient`], which talks to the ARM management
//! REST API and follows long-running operations to completion.

mod arm;
mod wire;

pub use arm::ArmMediaClient;

use std::sync::Arc;

use liveops_core::config::MediaConfig;
use liveops_core::{
    AccountScope, Asset, Channel, LiveOutputRecord, Result, StreamingLocatorRecord,
};

/// Operations on a media-services account.
///
/// Lookups return `Ok(None)` when the resource does not exist. Mutations fail
/// with [`liveops_core::Error::Remote`] on transport errors, non-success
/// responses, and missing resources.
#[async_trait::async_trait]
pub trait MediaClient: Send + Sync {
    /// Fetch a live event and its current resource state.
    async fn get_channel(&self, scope: &AccountScope, name: &str) -> Result<Option<Channel>>;

    /// List the live outputs attached to a live event.
    async fn list_outputs(
        &self,
        scope: &AccountScope,
        channel: &str,
    ) -> Result<Vec<LiveOutputRecord>>;

    async fn get_asset(&self, scope: &AccountScope, name: &str) -> Result<Option<Asset>>;

    /// Names of the streaming locators referencing an asset.
    async fn list_locators_for_asset(&self, scope: &AccountScope, asset: &str)
        -> Result<Vec<String>>;

    async fn get_locator(
        &self,
        scope: &AccountScope,
        name: &str,
    ) -> Result<Option<StreamingLocatorRecord>>;

    async fn delete_output(&self, scope: &AccountScope, channel: &str, output: &str)
        -> Result<()>;

    async fn delete_asset(&self, scope: &AccountScope, name: &str) -> Result<()>;

    async fn delete_policy(&self, scope: &AccountScope, name: &str) -> Result<()>;

    /// Request a stop; returns once the service reports the request complete.
    async fn stop_channel(&self, scope: &AccountScope, name: &str) -> Result<()>;

    async fn delete_channel(&self, scope: &AccountScope, name: &str) -> Result<()>;
}

/// Create the media client for a configuration.
pub fn create_client(config: &MediaConfig) -> Arc<dyn MediaClient> {
    Arc::new(ArmMediaClient::new(config))
}
